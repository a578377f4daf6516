use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot open database")]
    Connection(#[from] diesel::ConnectionError),
    #[error("failed to apply migrations: {0}")]
    Migration(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },
    #[error("error while executing database query")]
    Database(#[from] diesel::result::Error),
}
