use anyhow::Context;

use crate::models::{Provider, ServiceCategory, WorkingHours, WorkingWindow};

/// Read-only list of service providers, in a fixed order.
#[derive(Debug, Clone)]
pub struct ProviderDirectory {
    providers: Vec<Provider>,
}

impl ProviderDirectory {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let providers: Vec<Provider> =
            serde_json::from_str(s).context("invalid provider directory JSON")?;
        for provider in &providers {
            provider
                .working_hours
                .validate()
                .with_context(|| format!("invalid working hours for provider {}", provider.id))?;
        }
        Ok(Self::new(providers))
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read provider directory: {path}"))?;
        Self::from_json(&contents)
    }

    pub fn builtin() -> Self {
        let mut garcia_hours = weekly(&["mon", "wed", "fri"], "10:00", "16:00");
        garcia_hours
            .slots
            .extend(weekly(&["sat"], "09:00", "12:00").slots);

        Self::new(vec![
            Provider {
                id: "550e8400-e29b-41d4-a716-446655440001".to_string(),
                name: "Dr. Alex Smith".to_string(),
                service_type: ServiceCategory::Doctor,
                location: "Downtown Medical Center, 123 Main St".to_string(),
                working_hours: weekly(&["mon", "tue", "wed", "thu", "fri"], "09:00", "17:00"),
            },
            Provider {
                id: "550e8400-e29b-41d4-a716-446655440002".to_string(),
                name: "Dr. Maria Garcia".to_string(),
                service_type: ServiceCategory::Doctor,
                location: "City Health Clinic, 456 Oak Ave".to_string(),
                working_hours: garcia_hours,
            },
            Provider {
                id: "550e8400-e29b-41d4-a716-446655440003".to_string(),
                name: "Dr. Priya Patel".to_string(),
                service_type: ServiceCategory::Dentist,
                location: "Bright Smile Dental, 789 Pine Rd".to_string(),
                working_hours: weekly(&["tue", "wed", "thu"], "08:00", "15:00"),
            },
            Provider {
                id: "550e8400-e29b-41d4-a716-446655440004".to_string(),
                name: "Jamie Lee".to_string(),
                service_type: ServiceCategory::BeautySalon,
                location: "Studio Luxe, 22 Elm St".to_string(),
                working_hours: weekly(&["tue", "wed", "thu", "fri", "sat"], "10:00", "18:00"),
            },
        ])
    }

    pub fn all(&self) -> &[Provider] {
        &self.providers
    }

    pub fn find(&self, id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn for_category(&self, category: ServiceCategory) -> Vec<&Provider> {
        self.providers
            .iter()
            .filter(|p| p.service_type == category)
            .collect()
    }
}

fn weekly(days: &[&str], start: &str, end: &str) -> WorkingHours {
    WorkingHours {
        slots: days
            .iter()
            .map(|day| WorkingWindow {
                day: day.to_string(),
                start: start.to_string(),
                end: end.to_string(),
            })
            .collect(),
    }
}
