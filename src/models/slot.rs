use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::appointment::{hour_minute, SlotKey};

/// A bookable hour offered to the caller. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateSlot {
    pub provider_id: String,
    pub provider_name: String,
    pub provider_location: String,
    pub date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub start_time: NaiveTime,
    #[serde(with = "hour_minute")]
    pub end_time: NaiveTime,
    pub availability_score: f64,
}

impl CandidateSlot {
    pub fn key(&self) -> SlotKey {
        SlotKey {
            provider_id: self.provider_id.clone(),
            date: self.date,
            start_time: self.start_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrioritizedSlot {
    #[serde(flatten)]
    pub slot: CandidateSlot,
    pub priority: f64,
}
