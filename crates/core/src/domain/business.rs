use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessId(pub String);

impl std::fmt::Display for BusinessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bookable service offered by a business. Prices are integer minor
/// units; zero means "no price quoted".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub price_minor: i64,
}

fn default_duration_minutes() -> u32 {
    30
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub name: String,
}

/// Read-only snapshot of a business for the duration of one conversation
/// turn. Reloaded fresh from the directory each turn, so edits made in the
/// admin surface apply on the next utterance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub id: BusinessId,
    pub name: String,
    pub agent_name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub address: String,
    /// Free-text working-hours spec, e.g. "Mon-Fri 09:00-18:00".
    #[serde(default)]
    pub working_hours: String,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    /// External calendar identifier; `None` disables free/busy lookups and
    /// event creation for this business.
    #[serde(default)]
    pub calendar_id: Option<String>,
}

impl BusinessContext {
    /// Services with a non-empty name; blank catalog rows are ignored the
    /// same way blank directory entries are.
    pub fn named_services(&self) -> impl Iterator<Item = &Service> {
        self.services.iter().filter(|service| !service.name.trim().is_empty())
    }

    pub fn named_staff(&self) -> impl Iterator<Item = &StaffMember> {
        self.staff.iter().filter(|member| !member.name.trim().is_empty())
    }

    pub fn has_services(&self) -> bool {
        self.named_services().next().is_some()
    }

    pub fn has_staff(&self) -> bool {
        self.named_staff().next().is_some()
    }

    pub fn calendar_id(&self) -> Option<&str> {
        self.calendar_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{BusinessContext, BusinessId, Service, StaffMember};

    fn business() -> BusinessContext {
        BusinessContext {
            id: BusinessId("demo-salon".to_string()),
            name: "Demo Salon".to_string(),
            agent_name: "Mia".to_string(),
            sector: String::new(),
            address: String::new(),
            working_hours: "Mon-Fri 09:00-18:00".to_string(),
            services: vec![
                Service { name: "Haircut".to_string(), duration_minutes: 30, price_minor: 20_000 },
                Service { name: "   ".to_string(), duration_minutes: 30, price_minor: 0 },
            ],
            staff: vec![StaffMember { name: String::new() }],
            calendar_id: Some("  ".to_string()),
        }
    }

    #[test]
    fn blank_catalog_entries_are_ignored() {
        let business = business();
        assert_eq!(business.named_services().count(), 1);
        assert!(business.has_services());
        assert!(!business.has_staff());
    }

    #[test]
    fn whitespace_calendar_id_counts_as_unconfigured() {
        assert_eq!(business().calendar_id(), None);
    }
}
