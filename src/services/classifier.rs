//! Keyword-based transcript classification.
//!
//! This is substring matching over a lowercased transcript, not language
//! understanding. Unmatched input falls through to the defaults.

use crate::models::{BookingInfo, PatternKind, ServiceCategory, Urgency, UserPattern};

const DEFAULT_CATEGORY: ServiceCategory = ServiceCategory::Doctor;

/// A learned service preference only replaces the default above this.
const SERVICE_PREFERENCE_THRESHOLD: f64 = 0.8;

/// Checked in order; the first category with a matching keyword wins.
const CATEGORY_KEYWORDS: &[(ServiceCategory, &[&str])] = &[
    (ServiceCategory::Dentist, &["dentist", "dental"]),
    (ServiceCategory::BeautySalon, &["hair", "beauty"]),
    (ServiceCategory::Consultant, &["business", "consultant"]),
    (ServiceCategory::Doctor, &["doctor", "physician"]),
];

const URGENT_KEYWORDS: &[&str] = &["emergency", "urgent"];

pub fn classify(transcript: &str) -> BookingInfo {
    classify_with_patterns(transcript, &[])
}

pub fn classify_with_patterns(transcript: &str, patterns: &[UserPattern]) -> BookingInfo {
    let lower = transcript.to_lowercase();

    let learned = patterns
        .iter()
        .find(|p| p.pattern_type == PatternKind::ServicePreference)
        .filter(|p| p.confidence_score > SERVICE_PREFERENCE_THRESHOLD)
        .and_then(|p| p.preferred_service());

    let service_type = CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .or(learned)
        .unwrap_or(DEFAULT_CATEGORY);

    let urgency = if URGENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Urgency::High
    } else {
        Urgency::Normal
    };

    BookingInfo {
        service_type,
        urgency,
        notes: transcript.to_string(),
    }
}
