use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::provider::ProviderSummary;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub user_id: String,
    pub provider_id: String,
    pub appointment_date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub start_time: NaiveTime,
    #[serde(with = "hour_minute")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub service_type: String,
    pub notes: String,
    pub booking_method: BookingMethod,
    pub created_at: NaiveDateTime,
    pub provider: ProviderSummary,
}

impl Appointment {
    pub fn new_id() -> String {
        format!("apt-{}", uuid::Uuid::new_v4())
    }

    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            provider_id: self.provider_id.clone(),
            date: self.appointment_date,
            start_time: self.start_time,
        }
    }
}

/// Identity of a bookable hour: one provider, one date, one start time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub provider_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BookingMethod {
    Voice,
    Direct,
}

impl BookingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingMethod::Voice => "voice",
            BookingMethod::Direct => "direct",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "voice" => Some(BookingMethod::Voice),
            "direct" => Some(BookingMethod::Direct),
            _ => None,
        }
    }
}

/// `HH:MM` wire format for times of day.
pub mod hour_minute {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
