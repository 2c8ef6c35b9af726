use serde::{Deserialize, Serialize};

use super::provider::ServiceCategory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Normal,
    High,
    Emergency,
}

impl Urgency {
    pub fn weight(&self) -> f64 {
        match self {
            Urgency::Low => 1.0,
            Urgency::Normal => 2.0,
            Urgency::High => 3.0,
            Urgency::Emergency => 5.0,
        }
    }
}

/// What the classifier made of a transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingInfo {
    pub service_type: ServiceCategory,
    pub urgency: Urgency,
    pub notes: String,
}
