//! Deterministic demo fixture used by `bookline seed` and the tests.

use bookline_core::domain::{BusinessContext, Service, StaffMember};

use crate::repositories::{NewBusiness, RepositoryError, SqlBusinessDirectory};

pub const DEMO_SLUG: &str = "demo-salon";

/// Seed the demo business. Idempotent: an existing row is returned as-is.
pub async fn seed_demo_business(
    directory: &SqlBusinessDirectory,
) -> Result<BusinessContext, RepositoryError> {
    if let Some(existing) = directory.fetch(DEMO_SLUG).await? {
        return Ok(existing);
    }

    directory
        .create(NewBusiness {
            name: "Demo Salon".to_string(),
            agent_name: Some("Mia".to_string()),
            sector: "Beauty".to_string(),
            address: "1 Example Street".to_string(),
            working_hours: "Mon-Fri 09:00-18:00".to_string(),
            services: vec![
                Service { name: "Haircut".to_string(), duration_minutes: 30, price_minor: 200 },
                Service { name: "Beard Trim".to_string(), duration_minutes: 15, price_minor: 100 },
            ],
            staff: vec![
                StaffMember { name: "Sarah".to_string() },
                StaffMember { name: "Alex".to_string() },
            ],
            calendar_id: None,
        })
        .await
}

#[cfg(test)]
mod tests {
    use crate::repositories::SqlBusinessDirectory;
    use crate::{connect_with_settings, migrations};

    use super::{seed_demo_business, DEMO_SLUG};

    #[tokio::test]
    async fn seeding_twice_keeps_one_row() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let directory = SqlBusinessDirectory::new(pool);

        let first = seed_demo_business(&directory).await.expect("seed");
        let second = seed_demo_business(&directory).await.expect("seed again");

        assert_eq!(first.id.0, DEMO_SLUG);
        assert_eq!(second.id.0, DEMO_SLUG);
        assert_eq!(directory.list().await.expect("list").len(), 1);
    }
}
