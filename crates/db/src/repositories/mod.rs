pub mod appointment;
pub mod business;

use thiserror::Error;

pub use appointment::SqlAppointmentStore;
pub use business::{NewBusiness, SqlBusinessDirectory};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}
