/// Failures of the local store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("local store is corrupt or not a warden store")]
    Corrupt,
    #[error("local store was written by a newer warden (schema {found}, this build reads up to {supported})")]
    NewerSchema { found: u32, supported: u32 },
    #[error("local store is already open in this process")]
    DatabaseAlreadyOpen,
    #[error("{0:?} cannot be used in a row key")]
    InvalidKey(String),
    #[error("store file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("row could not be encoded or decoded: {0}")]
    Serde(#[from] serde_json::Error),
    /// Anything redb reports that has no variant of its own.
    #[error("redb: {0}")]
    Backend(Box<redb::Error>),
}

/// Coarse grouping of [`StorageError`] for callers that only branch on the
/// kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    Corrupt,
    NewerSchema,
    Busy,
    InvalidKey,
    Io,
    Codec,
    Backend,
}

impl StorageError {
    pub fn kind(&self) -> StorageErrorKind {
        match self {
            StorageError::Corrupt => StorageErrorKind::Corrupt,
            StorageError::NewerSchema { .. } => StorageErrorKind::NewerSchema,
            StorageError::DatabaseAlreadyOpen => StorageErrorKind::Busy,
            StorageError::InvalidKey(_) => StorageErrorKind::InvalidKey,
            StorageError::Io(_) => StorageErrorKind::Io,
            StorageError::Serde(_) => StorageErrorKind::Codec,
            StorageError::Backend(_) => StorageErrorKind::Backend,
        }
    }
}

impl From<redb::Error> for StorageError {
    fn from(value: redb::Error) -> Self {
        match value {
            redb::Error::DatabaseAlreadyOpen => Self::DatabaseAlreadyOpen,
            other => Self::Backend(Box::new(other)),
        }
    }
}

// redb splits its errors by call site; all of them widen into `redb::Error`.
macro_rules! from_redb {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for StorageError {
                fn from(value: $source) -> Self {
                    redb::Error::from(value).into()
                }
            }
        )+
    };
}

from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
