use tracker_core::model::{
    IdError, QuestionId, Section, TaskId, UserId, WeekNumber,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn id_err(e: IdError) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn user_id(raw: String) -> Result<UserId, StorageError> {
    UserId::new(raw).map_err(id_err)
}

pub(crate) fn task_id(raw: String) -> Result<TaskId, StorageError> {
    TaskId::new(raw).map_err(id_err)
}

pub(crate) fn question_id(raw: String) -> Result<QuestionId, StorageError> {
    QuestionId::new(raw).map_err(id_err)
}

pub(crate) fn week_from_i64(v: i64) -> Result<WeekNumber, StorageError> {
    let raw = u32::try_from(v).map_err(|_| ser(format!("invalid week: {v}")))?;
    WeekNumber::new(raw).map_err(id_err)
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn parse_section(s: &str) -> Result<Section, StorageError> {
    Section::parse(s).ok_or_else(|| StorageError::Serialization(format!("invalid section: {s}")))
}
