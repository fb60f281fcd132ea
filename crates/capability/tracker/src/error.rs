//! 在线状态追踪错误类型。

use presence_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("window index cell holds a non-integer value: {0}")]
    CorruptIndex(String),
    #[error("clear incomplete: {failed} of {attempted} deletes failed")]
    PartialClear { failed: usize, attempted: usize },
    #[error("rotation lease lost on {key}")]
    LeaseLost { key: String },
}
