use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::provider::ServiceCategory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    TimePreference,
    ServicePreference,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::TimePreference => "time_preference",
            PatternKind::ServicePreference => "service_preference",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "time_preference" => Some(PatternKind::TimePreference),
            "service_preference" => Some(PatternKind::ServicePreference),
            _ => None,
        }
    }
}

/// A learned preference used to bias classification and slot ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPattern {
    pub user_id: String,
    pub pattern_type: PatternKind,
    pub pattern_data: serde_json::Value,
    pub confidence_score: f64,
    pub usage_count: i64,
    pub last_used: NaiveDateTime,
}

impl UserPattern {
    /// Hours of day (0-23) listed under `preferred_hours`.
    pub fn preferred_hours(&self) -> Vec<u32> {
        self.pattern_data
            .get("preferred_hours")
            .and_then(|v| v.as_array())
            .map(|hours| {
                hours
                    .iter()
                    .filter_map(|h| h.as_u64())
                    .filter_map(|h| u32::try_from(h).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn preferred_service(&self) -> Option<ServiceCategory> {
        self.pattern_data
            .get("preferred_service")
            .and_then(|v| v.as_str())
            .and_then(ServiceCategory::parse)
    }
}
