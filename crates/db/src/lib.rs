pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use fixtures::{seed_demo_business, DEMO_SLUG};
pub use repositories::{NewBusiness, RepositoryError, SqlAppointmentStore, SqlBusinessDirectory};
