use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate, NaiveTime, Timelike};

use crate::models::{CandidateSlot, Provider, ServiceCategory, SlotKey};

const SECS_PER_HOUR: u32 = 3600;

/// Hourly candidate slots for `category` over days `1..=horizon_days` after
/// `today`. Days form the outer loop and providers the inner one, so the
/// output is ordered by date, then directory order, then start time.
pub fn generate_slots(
    providers: &[&Provider],
    category: ServiceCategory,
    today: NaiveDate,
    horizon_days: u32,
    booked: &HashSet<SlotKey>,
) -> Vec<CandidateSlot> {
    let mut slots = Vec::new();

    for offset in 1..=u64::from(horizon_days) {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };

        for provider in providers.iter().filter(|p| p.service_type == category) {
            let hours: Vec<(NaiveTime, NaiveTime)> = provider
                .working_hours
                .windows_for(date.weekday())
                .into_iter()
                .flat_map(|(start, end)| hourly(start, end))
                .collect();
            if hours.is_empty() {
                continue;
            }

            let free: Vec<(NaiveTime, NaiveTime)> = hours
                .iter()
                .copied()
                .filter(|(start, _)| {
                    !booked.contains(&SlotKey {
                        provider_id: provider.id.clone(),
                        date,
                        start_time: *start,
                    })
                })
                .collect();

            let taken = hours.len() - free.len();
            let availability_score = 1.0 - 0.5 * taken as f64 / hours.len() as f64;

            slots.extend(free.into_iter().map(|(start_time, end_time)| CandidateSlot {
                provider_id: provider.id.clone(),
                provider_name: provider.name.clone(),
                provider_location: provider.location.clone(),
                date,
                start_time,
                end_time,
                availability_score,
            }));
        }
    }

    slots
}

/// Whole-hour slots that fit entirely inside `[start, end)`. A window that
/// starts off the hour begins at the next full hour.
fn hourly(start: NaiveTime, end: NaiveTime) -> Vec<(NaiveTime, NaiveTime)> {
    let mut hour = start.hour();
    if start.minute() > 0 || start.second() > 0 {
        hour += 1;
    }

    let limit = end.num_seconds_from_midnight();
    let mut out = Vec::new();
    while (hour + 1) * SECS_PER_HOUR <= limit {
        if let (Some(s), Some(e)) = (
            NaiveTime::from_hms_opt(hour, 0, 0),
            NaiveTime::from_hms_opt(hour + 1, 0, 0),
        ) {
            out.push((s, e));
        }
        hour += 1;
    }
    out
}
