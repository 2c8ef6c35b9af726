use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// One working window on a given weekday, e.g. `mon 09:00-17:00`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingWindow {
    pub day: String,
    pub start: String,
    pub end: String,
}

/// Weekly working-hours table for a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkingHours {
    pub slots: Vec<WorkingWindow>,
}

const DAY_ORDER: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

impl WorkingHours {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let hours: WorkingHours = serde_json::from_str(s)?;
        hours.validate()?;
        Ok(hours)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for slot in &self.slots {
            parse_weekday(&slot.day)?;
            let start = parse_time(&slot.start)?;
            let end = parse_time(&slot.end)?;
            if start >= end {
                return Err(anyhow::anyhow!(
                    "window start must be before end: {}-{}",
                    slot.start,
                    slot.end
                ));
            }
        }
        Ok(())
    }

    /// Every working window configured for `weekday`, in table order.
    pub fn windows_for(&self, weekday: Weekday) -> Vec<(NaiveTime, NaiveTime)> {
        let key = weekday_key(weekday);
        self.slots
            .iter()
            .filter(|slot| slot.day.to_lowercase() == key)
            .filter_map(|slot| Some((parse_time(&slot.start).ok()?, parse_time(&slot.end).ok()?)))
            .collect()
    }

    /// True when `[start, end)` sits entirely inside one window on `weekday`.
    pub fn covers(&self, weekday: Weekday, start: NaiveTime, end: NaiveTime) -> bool {
        self.windows_for(weekday)
            .iter()
            .any(|(w_start, w_end)| start >= *w_start && end <= *w_end)
    }

    pub fn to_human_readable(&self) -> String {
        if self.slots.is_empty() {
            return String::new();
        }

        let mut sorted_slots = self.slots.clone();
        sorted_slots.sort_by_key(|s| {
            DAY_ORDER
                .iter()
                .position(|d| *d == s.day.to_lowercase())
                .unwrap_or(DAY_ORDER.len())
        });

        sorted_slots
            .iter()
            .map(|s| {
                let day = capitalize(&s.day);
                format!("{day}: {}-{}", s.start, s.end)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}

fn parse_weekday(s: &str) -> anyhow::Result<()> {
    if DAY_ORDER.contains(&s.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(anyhow::anyhow!("invalid weekday: {s}"))
    }
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| anyhow::anyhow!("invalid time: {s}"))
}
