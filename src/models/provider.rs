use serde::{Deserialize, Serialize};

use super::availability::WorkingHours;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Doctor,
    Dentist,
    BeautySalon,
    Consultant,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Doctor => "doctor",
            ServiceCategory::Dentist => "dentist",
            ServiceCategory::BeautySalon => "beauty_salon",
            ServiceCategory::Consultant => "consultant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "doctor" => Some(ServiceCategory::Doctor),
            "dentist" => Some(ServiceCategory::Dentist),
            "beauty_salon" => Some(ServiceCategory::BeautySalon),
            "consultant" => Some(ServiceCategory::Consultant),
            _ => None,
        }
    }

    /// Spoken form, e.g. "beauty salon".
    pub fn display_name(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub service_type: ServiceCategory,
    pub location: String,
    pub working_hours: WorkingHours,
}

impl Provider {
    pub fn summary(&self) -> ProviderSummary {
        ProviderSummary {
            name: self.name.clone(),
            location: self.location.clone(),
        }
    }
}

/// Denormalized provider details carried on an appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSummary {
    pub name: String,
    pub location: String,
}
