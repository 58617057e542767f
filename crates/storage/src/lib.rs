#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    CheckInRepository, InMemoryRepository, Storage, StorageError, SubmissionRepository,
    TaskRepository, WeekProgressRepository,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
