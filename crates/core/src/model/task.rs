use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{TaskId, UserId, WeekNumber};

/// Completion flag for one curriculum task. Created on first toggle, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub user_id: UserId,
    pub week: WeekNumber,
    pub task_id: TaskId,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}
