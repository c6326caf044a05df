use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate {table} id: {id}")]
    Duplicate { table: &'static str, id: String },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Turn a primary-key violation on insert into [`StoreError::Duplicate`].
    pub(crate) fn from_insert(table: &'static str, id: &str, err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                StoreError::Duplicate {
                    table,
                    id: id.to_string(),
                }
            }
            other => StoreError::Sqlite(other),
        }
    }
}
