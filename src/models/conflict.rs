use chrono::{DateTime, Utc};
use serde::Serialize;

use super::intent::Urgency;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    HighPriorityBooking,
    SchedulingConflict,
}

impl ConflictKind {
    /// An urgent request that lost its slot is escalated.
    pub fn for_urgency(urgency: Urgency) -> Self {
        match urgency {
            Urgency::High | Urgency::Emergency => ConflictKind::HighPriorityBooking,
            _ => ConflictKind::SchedulingConflict,
        }
    }

    pub fn suggested_actions(self) -> &'static [&'static str] {
        match self {
            ConflictKind::HighPriorityBooking => &[
                "Notify provider of urgent appointment request",
                "Check for emergency time slots",
                "Offer expedited booking process",
            ],
            ConflictKind::SchedulingConflict => &[
                "Suggest alternative time slots",
                "Check provider availability",
                "Offer rescheduling options",
            ],
        }
    }
}

/// Attached to a 409 when a confirmed slot was taken by someone else.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub appointment_id: String,
    pub conflict_type: ConflictKind,
    pub timestamp: DateTime<Utc>,
    pub suggested_actions: Vec<String>,
}

impl ConflictReport {
    pub fn new(appointment_id: &str, conflict_type: ConflictKind) -> Self {
        Self {
            kind: "conflict_detected",
            appointment_id: appointment_id.to_string(),
            conflict_type,
            timestamp: Utc::now(),
            suggested_actions: conflict_type
                .suggested_actions()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
