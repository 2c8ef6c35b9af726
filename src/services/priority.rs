use chrono::Timelike;

use crate::models::{CandidateSlot, PatternKind, PrioritizedSlot, Urgency, UserPattern};

const URGENCY_WEIGHT: f64 = 0.4;
const PREFERENCE_WEIGHT: f64 = 0.3;
const AVAILABILITY_WEIGHT: f64 = 0.2;
const HISTORY_WEIGHT: f64 = 0.1;

const BASE_PREFERENCE: f64 = 0.5;
const PREFERENCE_BOOST: f64 = 0.2;
const HISTORICAL_SUCCESS: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct PriorityFactors {
    pub urgency: Urgency,
    pub user_preference: f64,
    pub availability_score: f64,
    pub historical_success: f64,
}

pub fn calculate_priority(factors: &PriorityFactors) -> f64 {
    factors.urgency.weight() * URGENCY_WEIGHT
        + factors.user_preference * PREFERENCE_WEIGHT
        + factors.availability_score * AVAILABILITY_WEIGHT
        + factors.historical_success * HISTORY_WEIGHT
}

/// 0.5, raised by `0.2 * confidence` for every time preference that lists
/// the slot's start hour. Never above 1.0.
pub fn user_preference(slot: &CandidateSlot, patterns: &[UserPattern]) -> f64 {
    let hour = slot.start_time.hour();
    let boost: f64 = patterns
        .iter()
        .filter(|p| p.pattern_type == PatternKind::TimePreference)
        .filter(|p| p.preferred_hours().contains(&hour))
        .map(|p| PREFERENCE_BOOST * p.confidence_score)
        .sum();
    (BASE_PREFERENCE + boost).min(1.0)
}

/// Scores every candidate and sorts highest priority first. Ties keep
/// generation order.
pub fn prioritize(
    candidates: Vec<CandidateSlot>,
    urgency: Urgency,
    patterns: &[UserPattern],
) -> Vec<PrioritizedSlot> {
    let mut ranked: Vec<PrioritizedSlot> = candidates
        .into_iter()
        .map(|slot| {
            let priority = calculate_priority(&PriorityFactors {
                urgency,
                user_preference: user_preference(&slot, patterns),
                availability_score: slot.availability_score,
                historical_success: HISTORICAL_SUCCESS,
            });
            PrioritizedSlot { slot, priority }
        })
        .collect();

    ranked.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    fn slot(provider: &str, hour: u32, availability: f64) -> CandidateSlot {
        CandidateSlot {
            provider_id: provider.to_string(),
            provider_name: provider.to_string(),
            provider_location: "Here".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
            availability_score: availability,
        }
    }

    fn time_pattern(hours: &[u32], confidence: f64) -> UserPattern {
        UserPattern {
            user_id: "u1".to_string(),
            pattern_type: PatternKind::TimePreference,
            pattern_data: json!({ "preferred_hours": hours }),
            confidence_score: confidence,
            usage_count: 1,
            last_used: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_priority_formula() {
        let p = calculate_priority(&PriorityFactors {
            urgency: Urgency::Normal,
            user_preference: 0.5,
            availability_score: 1.0,
            historical_success: 0.5,
        });
        // 2*0.4 + 0.5*0.3 + 1.0*0.2 + 0.5*0.1
        assert!((p - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_priority_monotonic_in_urgency() {
        let at = |urgency| {
            calculate_priority(&PriorityFactors {
                urgency,
                user_preference: 0.5,
                availability_score: 0.8,
                historical_success: 0.5,
            })
        };
        assert!(at(Urgency::Low) < at(Urgency::Normal));
        assert!(at(Urgency::Normal) < at(Urgency::High));
        assert!(at(Urgency::High) < at(Urgency::Emergency));
    }

    #[test]
    fn test_user_preference_boost_and_cap() {
        let s = slot("p", 9, 1.0);
        assert_eq!(user_preference(&s, &[]), 0.5);

        let one = [time_pattern(&[9, 14], 0.7)];
        assert!((user_preference(&s, &one) - 0.64).abs() < 1e-9);

        let many = [
            time_pattern(&[9], 0.99),
            time_pattern(&[9], 0.99),
            time_pattern(&[9], 0.99),
        ];
        assert_eq!(user_preference(&s, &many), 1.0);

        let other_hour = [time_pattern(&[15], 0.9)];
        assert_eq!(user_preference(&s, &other_hour), 0.5);
    }

    #[test]
    fn test_prioritize_sorts_descending() {
        let ranked = prioritize(
            vec![slot("a", 9, 0.5), slot("b", 10, 1.0), slot("c", 11, 0.75)],
            Urgency::Normal,
            &[],
        );
        let order: Vec<_> = ranked.iter().map(|r| r.slot.provider_id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert!(ranked.windows(2).all(|w| w[0].priority >= w[1].priority));
    }

    #[test]
    fn test_prioritize_is_stable_for_ties() {
        let ranked = prioritize(
            vec![slot("a", 9, 1.0), slot("b", 10, 1.0), slot("c", 11, 1.0)],
            Urgency::High,
            &[],
        );
        let order: Vec<_> = ranked.iter().map(|r| r.slot.provider_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_preferred_hour_ranks_first() {
        let patterns = [time_pattern(&[14], 0.8)];
        let ranked = prioritize(
            vec![slot("a", 9, 1.0), slot("b", 14, 1.0)],
            Urgency::Normal,
            &patterns,
        );
        assert_eq!(ranked[0].slot.provider_id, "b");
    }
}
