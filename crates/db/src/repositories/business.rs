use chrono::Utc;
use serde::Deserialize;
use sqlx::Row;

use bookline_core::domain::{BusinessContext, BusinessId, Service, StaffMember};

use super::RepositoryError;
use crate::DbPool;

/// Input for creating a directory entry. Catalogs arrive as plain lists
/// and are stored as JSON text columns.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewBusiness {
    pub name: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub working_hours: String,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub calendar_id: Option<String>,
}

/// Read-mostly business directory. Rows feed the per-turn
/// `BusinessContext`; deletion is a soft `is_active = 0`.
#[derive(Clone)]
pub struct SqlBusinessDirectory {
    pool: DbPool,
    default_calendar_id: Option<String>,
}

impl SqlBusinessDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, default_calendar_id: None }
    }

    /// Fallback calendar id applied to rows whose own column is empty.
    pub fn with_default_calendar(mut self, default_calendar_id: Option<String>) -> Self {
        self.default_calendar_id =
            default_calendar_id.filter(|calendar_id| !calendar_id.trim().is_empty());
        self
    }

    pub async fn create(&self, input: NewBusiness) -> Result<BusinessContext, RepositoryError> {
        let mut slug = slugify(&input.name);
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM businesses WHERE slug = ?",
        )
        .bind(&slug)
        .fetch_one(&self.pool)
        .await?;
        if exists > 0 {
            slug = format!("{slug}-{}", Utc::now().timestamp() % 10_000);
        }

        let services = serde_json::to_string(&input.services)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let staff = serde_json::to_string(&input.staff)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO businesses (
                slug, name, agent_name, sector, address, working_hours,
                services, staff, calendar_id
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&slug)
        .bind(&input.name)
        .bind(input.agent_name.as_deref().unwrap_or("Assistant"))
        .bind(&input.sector)
        .bind(&input.address)
        .bind(&input.working_hours)
        .bind(&services)
        .bind(&staff)
        .bind(input.calendar_id.as_deref().unwrap_or("").trim())
        .execute(&self.pool)
        .await?;

        self.fetch(&slug).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("freshly created business `{slug}` not found"))
        })
    }

    pub async fn fetch(&self, slug: &str) -> Result<Option<BusinessContext>, RepositoryError> {
        let row = sqlx::query(
            "SELECT slug, name, agent_name, sector, address, working_hours,
                    services, staff, calendar_id
             FROM businesses WHERE slug = ? AND is_active = 1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.context_from_row(&row)).transpose()
    }

    pub async fn list(&self) -> Result<Vec<BusinessContext>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT slug, name, agent_name, sector, address, working_hours,
                    services, staff, calendar_id
             FROM businesses WHERE is_active = 1
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| self.context_from_row(row)).collect()
    }

    pub async fn deactivate(&self, slug: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE businesses SET is_active = 0 WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn context_from_row(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<BusinessContext, RepositoryError> {
        let services_raw: String = row.get("services");
        let staff_raw: String = row.get("staff");

        let services: Vec<Service> = serde_json::from_str(&services_raw)
            .map_err(|error| RepositoryError::Decode(format!("services column: {error}")))?;
        let staff: Vec<StaffMember> = serde_json::from_str(&staff_raw)
            .map_err(|error| RepositoryError::Decode(format!("staff column: {error}")))?;

        let own_calendar: String = row.get("calendar_id");
        let calendar_id = if own_calendar.trim().is_empty() {
            self.default_calendar_id.clone()
        } else {
            Some(own_calendar)
        };

        Ok(BusinessContext {
            id: BusinessId(row.get("slug")),
            name: row.get("name"),
            agent_name: row.get("agent_name"),
            sector: row.get("sector"),
            address: row.get("address"),
            working_hours: row.get("working_hours"),
            services,
            staff,
            calendar_id,
        })
    }
}

/// Lowercase ASCII slug: alphanumerics kept, runs of anything else become
/// single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "business".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use bookline_core::domain::{Service, StaffMember};

    use crate::{connect_with_settings, migrations};

    use super::{slugify, NewBusiness, SqlBusinessDirectory};

    async fn directory() -> SqlBusinessDirectory {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlBusinessDirectory::new(pool)
    }

    fn demo_input() -> NewBusiness {
        NewBusiness {
            name: "Demo Salon".to_string(),
            agent_name: Some("Mia".to_string()),
            working_hours: "Mon-Fri 09:00-18:00".to_string(),
            services: vec![Service {
                name: "Haircut".to_string(),
                duration_minutes: 30,
                price_minor: 200,
            }],
            staff: vec![StaffMember { name: "Sarah".to_string() }],
            ..NewBusiness::default()
        }
    }

    #[test]
    fn slugs_are_ascii_lowercase_hyphenated() {
        assert_eq!(slugify("Demo Salon"), "demo-salon");
        assert_eq!(slugify("  A & B  Barbers! "), "a-b-barbers");
        assert_eq!(slugify("!!!"), "business");
    }

    #[tokio::test]
    async fn create_fetch_round_trips_catalogs() {
        let directory = directory().await;
        let created = directory.create(demo_input()).await.expect("create");
        assert_eq!(created.id.0, "demo-salon");

        let fetched = directory.fetch("demo-salon").await.expect("fetch").expect("present");
        assert_eq!(fetched.services.len(), 1);
        assert_eq!(fetched.services[0].name, "Haircut");
        assert_eq!(fetched.staff[0].name, "Sarah");
        assert_eq!(fetched.agent_name, "Mia");
        assert_eq!(fetched.calendar_id, None);
    }

    #[tokio::test]
    async fn slug_collisions_get_a_suffix() {
        let directory = directory().await;
        let first = directory.create(demo_input()).await.expect("create");
        let second = directory.create(demo_input()).await.expect("create");

        assert_eq!(first.id.0, "demo-salon");
        assert_ne!(second.id.0, first.id.0);
        assert!(second.id.0.starts_with("demo-salon-"));
        assert_eq!(directory.list().await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn deactivated_businesses_disappear_from_reads() {
        let directory = directory().await;
        directory.create(demo_input()).await.expect("create");

        directory.deactivate("demo-salon").await.expect("deactivate");
        assert!(directory.fetch("demo-salon").await.expect("fetch").is_none());
        assert!(directory.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn default_calendar_backfills_empty_columns() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let directory = SqlBusinessDirectory::new(pool)
            .with_default_calendar(Some("office-wide".to_string()));

        directory.create(demo_input()).await.expect("create");
        let fetched = directory.fetch("demo-salon").await.expect("fetch").expect("present");
        assert_eq!(fetched.calendar_id.as_deref(), Some("office-wide"));
    }
}
