use std::collections::HashSet;

use chrono::{Days, NaiveDate, NaiveTime, Utc};

use crate::errors::AppError;
use crate::models::{
    Appointment, AppointmentStatus, BookingInfo, BookingMethod, BookingState, ConflictKind,
    ConflictReport, PrioritizedSlot, ProviderSummary, SessionFailure, SlotKey, Urgency,
    UserPattern,
};
use crate::services::ledger::UserGuard;
use crate::services::{classifier, patterns, priority, slots};
use crate::state::AppState;
use crate::store::{bounded, retry_read, StoreError};

const OPTIMAL_SLOT_LIMIT: usize = 5;
const PRESENTED_SLOT_LIMIT: usize = 3;

const DEFAULT_SERVICE_TYPE: &str = "consultation";
const DEFAULT_NOTES: &str = "Voice booking";

#[derive(Debug, Clone)]
pub struct VoiceBookingOutcome {
    pub booking_info: BookingInfo,
    pub available_slots: Vec<PrioritizedSlot>,
    pub ai_response: String,
    pub remaining_credits: i64,
    /// Set when no provider offers the requested category.
    pub notice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConfirmOutcome {
    pub appointment: Appointment,
    pub ai_response: String,
    pub remaining_credits: i64,
    /// True when an earlier confirmation with the same key was returned.
    pub replayed: bool,
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: &'static str,
    pub presented_slots: Vec<PrioritizedSlot>,
    pub booking_info: Option<BookingInfo>,
    pub appointment: Option<Appointment>,
    pub error: Option<String>,
}

/// Fields for a direct booking, already parsed.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: String,
    pub provider_id: String,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub service_type: Option<String>,
    pub notes: Option<String>,
}

/// Classifies a transcript and offers ranked slots. Checks the balance but
/// never debits.
pub async fn process_transcript(
    state: &AppState,
    user_id: &str,
    transcript: &str,
) -> Result<VoiceBookingOutcome, AppError> {
    let balance = state.ledger.get_balance(user_id).await?;

    {
        let mut sessions = state.sessions();
        let session = sessions.entry(user_id.to_string()).or_default();
        if session.is_finished() {
            session.reset();
        }
        if let Err(e) = session.start_listening(balance) {
            tracing::info!(user_id, balance, error = %e, "voice booking refused");
            return Err(e.into());
        }
        session.transcript_ready(transcript)?;
    }
    let _in_flight = InFlight { state, user_id };

    let (booking_info, optimal, notice) = match find_optimal_slots(state, user_id, transcript).await
    {
        Ok(found) => found,
        Err(e) => {
            fail_session(state, user_id, SessionFailure::Processing(e.to_string()));
            return Err(e);
        }
    };

    let ai_response = conversational_response(&booking_info, optimal.len());
    let presented: Vec<PrioritizedSlot> = optimal
        .into_iter()
        .take(PRESENTED_SLOT_LIMIT)
        .collect();

    state
        .sessions()
        .entry(user_id.to_string())
        .or_default()
        .offer(booking_info.clone(), presented.clone())?;

    tracing::info!(
        user_id,
        service = booking_info.service_type.as_str(),
        urgency = ?booking_info.urgency,
        presented = presented.len(),
        "slots offered"
    );

    Ok(VoiceBookingOutcome {
        booking_info,
        available_slots: presented,
        ai_response,
        remaining_credits: balance,
        notice,
    })
}

async fn find_optimal_slots(
    state: &AppState,
    user_id: &str,
    transcript: &str,
) -> Result<(BookingInfo, Vec<PrioritizedSlot>, Option<String>), AppError> {
    let timeout = state.config.store_timeout;
    let retries = state.config.read_retries;

    let learned: Vec<UserPattern> =
        match patterns::patterns_for(state.patterns.as_ref(), timeout, retries, user_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "pattern lookup failed, ranking without history");
                Vec::new()
            }
        };

    let booking_info = classifier::classify_with_patterns(transcript, &learned);
    let providers = state.directory.for_category(booking_info.service_type);
    if providers.is_empty() {
        let notice = format!("No providers found for {}", booking_info.service_type.as_str());
        return Ok((booking_info, Vec::new(), Some(notice)));
    }

    let horizon = state.config.slot_horizon_days;
    let today = Utc::now().date_naive();
    let from = today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    let to = today
        .checked_add_days(Days::new(u64::from(horizon)))
        .unwrap_or(NaiveDate::MAX);

    let provider_ids: Vec<String> = providers.iter().map(|p| p.id.clone()).collect();
    let booked: HashSet<SlotKey> = retry_read(retries, timeout, || {
        state.appointments.booked_slots(&provider_ids, from, to)
    })
    .await?
    .into_iter()
    .collect();

    let candidates = slots::generate_slots(
        &providers,
        booking_info.service_type,
        today,
        horizon,
        &booked,
    );
    let mut ranked = priority::prioritize(candidates, booking_info.urgency, &learned);
    ranked.truncate(OPTIMAL_SLOT_LIMIT);

    Ok((booking_info, ranked, None))
}

/// Books the presented slot at `slot_index` and debits one credit.
///
/// Runs under the user's lock. With an idempotency key, a repeat of an
/// already completed confirmation returns the original appointment and
/// charges nothing.
pub async fn confirm_selection(
    state: &AppState,
    user_id: &str,
    slot_index: usize,
    idempotency_key: Option<&str>,
) -> Result<ConfirmOutcome, AppError> {
    let guard = state.user_locks().lock(user_id).await;
    let timeout = state.config.store_timeout;
    let retries = state.config.read_retries;

    if let Some(key) = idempotency_key {
        let existing = retry_read(retries, timeout, || {
            state.appointments.find_by_idempotency_key(user_id, key)
        })
        .await?;
        if let Some(appointment) = existing {
            let remaining_credits = state.ledger.balance_held(&guard).await?;
            tracing::info!(user_id, appointment_id = %appointment.id, "confirmation replayed");
            return Ok(ConfirmOutcome {
                ai_response: booked_response(&appointment.provider.name),
                appointment,
                remaining_credits,
                replayed: true,
            });
        }
    }

    let balance = state.ledger.balance_held(&guard).await?;

    let (booking_info, chosen) = {
        let mut sessions = state.sessions();
        let session = sessions.entry(user_id.to_string()).or_default();
        let selected = session.select(slot_index)?;
        if balance <= 0 {
            session.fail(SessionFailure::InsufficientCredits);
            return Err(AppError::InsufficientCredits);
        }
        selected
    };
    let _in_flight = InFlight { state, user_id };

    let slot = chosen.slot;
    let notes = if booking_info.notes.trim().is_empty() {
        DEFAULT_NOTES.to_string()
    } else {
        booking_info.notes.clone()
    };
    let appointment = Appointment {
        id: Appointment::new_id(),
        user_id: user_id.to_string(),
        provider_id: slot.provider_id,
        appointment_date: slot.date,
        start_time: slot.start_time,
        end_time: slot.end_time,
        status: AppointmentStatus::Scheduled,
        service_type: booking_info.service_type.as_str().to_string(),
        notes,
        booking_method: BookingMethod::Voice,
        created_at: Utc::now().naive_utc(),
        provider: ProviderSummary {
            name: slot.provider_name,
            location: slot.provider_location,
        },
    };

    let remaining_credits =
        match persist_and_debit(state, &guard, &appointment, idempotency_key, booking_info.urgency)
            .await
        {
            Ok(remaining) => remaining,
            Err(e) => {
                fail_session(state, user_id, SessionFailure::Booking(e.to_string()));
                return Err(e);
            }
        };

    {
        let mut sessions = state.sessions();
        if let Some(session) = sessions.get_mut(user_id) {
            if let Err(e) = session.complete(appointment.clone()) {
                tracing::warn!(user_id, error = %e, "session moved on during booking");
            }
        }
    }

    if let Err(e) = patterns::record_booking(
        state.patterns.as_ref(),
        timeout,
        &appointment,
        booking_info.service_type,
    )
    .await
    {
        tracing::warn!(user_id, error = %e, "failed to record booking patterns");
    }
    drop(guard);

    tracing::info!(
        user_id,
        appointment_id = %appointment.id,
        provider_id = %appointment.provider_id,
        remaining_credits,
        "voice booking confirmed"
    );

    Ok(ConfirmOutcome {
        ai_response: booked_response(&appointment.provider.name),
        appointment,
        remaining_credits,
        replayed: false,
    })
}

/// Inserts the appointment, then debits one credit. A slot taken in the
/// meantime comes back as a conflict report. A failed debit removes the
/// appointment again.
async fn persist_and_debit(
    state: &AppState,
    guard: &UserGuard,
    appointment: &Appointment,
    idempotency_key: Option<&str>,
    urgency: Urgency,
) -> Result<i64, AppError> {
    let timeout = state.config.store_timeout;
    match bounded(timeout, state.appointments.insert(appointment, idempotency_key)).await {
        Ok(()) => {}
        Err(StoreError::SlotTaken) => {
            let report = ConflictReport::new(&appointment.id, ConflictKind::for_urgency(urgency));
            tracing::warn!(
                appointment_id = %appointment.id,
                provider_id = %appointment.provider_id,
                conflict_type = ?report.conflict_type,
                "slot taken before confirmation"
            );
            return Err(AppError::SlotConflict(report));
        }
        Err(e) => return Err(e.into()),
    }

    match state.ledger.adjust_held(guard, -1).await {
        Ok(remaining) => Ok(remaining),
        Err(e) => {
            tracing::error!(appointment_id = %appointment.id, error = %e, "debit failed, removing appointment");
            if let Err(undo) = bounded(timeout, state.appointments.remove(&appointment.id)).await {
                tracing::error!(
                    appointment_id = %appointment.id,
                    error = %undo,
                    "failed to remove appointment after debit failure"
                );
            }
            Err(e.into())
        }
    }
}

pub fn reset_session(state: &AppState, user_id: &str) -> &'static str {
    let mut sessions = state.sessions();
    let session = sessions.entry(user_id.to_string()).or_default();
    session.reset();
    session.state().as_str()
}

pub fn session_snapshot(state: &AppState, user_id: &str) -> SessionSnapshot {
    let sessions = state.sessions();
    let Some(session) = sessions.get(user_id) else {
        return SessionSnapshot {
            state: BookingState::Idle.as_str(),
            presented_slots: Vec::new(),
            booking_info: None,
            appointment: None,
            error: None,
        };
    };

    let (booking_info, appointment, error) = match session.state() {
        BookingState::Confirming { booking_info, .. } | BookingState::Booking { booking_info, .. } => {
            (Some(booking_info.clone()), None, None)
        }
        BookingState::Success { appointment } => (None, Some(appointment.clone()), None),
        BookingState::Error { failure } => (None, None, Some(failure_message(failure))),
        _ => (None, None, None),
    };

    SessionSnapshot {
        state: session.state().as_str(),
        presented_slots: session.presented_slots().to_vec(),
        booking_info,
        appointment,
        error,
    }
}

/// Books a slot directly without touching credits.
pub async fn create_appointment(
    state: &AppState,
    request: NewAppointment,
) -> Result<Appointment, AppError> {
    let provider = state
        .directory
        .find(&request.provider_id)
        .ok_or_else(|| AppError::NotFound("Provider not found".to_string()))?;

    if request.start_time >= request.end_time {
        return Err(AppError::Validation(
            "start_time must be before end_time".to_string(),
        ));
    }

    let appointment = Appointment {
        id: Appointment::new_id(),
        user_id: request.user_id,
        provider_id: provider.id.clone(),
        appointment_date: request.appointment_date,
        start_time: request.start_time,
        end_time: request.end_time,
        status: AppointmentStatus::Scheduled,
        service_type: request
            .service_type
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_TYPE.to_string()),
        notes: request
            .notes
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_NOTES.to_string()),
        booking_method: BookingMethod::Direct,
        created_at: Utc::now().naive_utc(),
        provider: provider.summary(),
    };

    bounded(
        state.config.store_timeout,
        state.appointments.insert(&appointment, None),
    )
    .await?;

    tracing::info!(
        user_id = %appointment.user_id,
        appointment_id = %appointment.id,
        "appointment created"
    );
    Ok(appointment)
}

pub async fn list_appointments(
    state: &AppState,
    user_id: &str,
) -> Result<Vec<Appointment>, AppError> {
    let appointments = retry_read(
        state.config.read_retries,
        state.config.store_timeout,
        || state.appointments.list_for_user(user_id),
    )
    .await?;
    Ok(appointments)
}

fn fail_session(state: &AppState, user_id: &str, failure: SessionFailure) {
    state
        .sessions()
        .entry(user_id.to_string())
        .or_default()
        .fail(failure);
}

fn failure_message(failure: &SessionFailure) -> String {
    match failure {
        SessionFailure::InsufficientCredits => "Insufficient credits".to_string(),
        SessionFailure::Processing(detail) | SessionFailure::Booking(detail) => detail.clone(),
        SessionFailure::Abandoned => "Request abandoned before completion".to_string(),
    }
}

/// Fails a session still processing or booking when the request future is
/// dropped before it gets there itself.
struct InFlight<'a> {
    state: &'a AppState,
    user_id: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut sessions = self.state.sessions();
        if let Some(session) = sessions.get_mut(self.user_id) {
            if session.is_in_flight() {
                tracing::warn!(
                    user_id = self.user_id,
                    state = session.state().as_str(),
                    "request abandoned mid-flight"
                );
                session.fail(SessionFailure::Abandoned);
            }
        }
    }
}

fn conversational_response(info: &BookingInfo, slot_count: usize) -> String {
    let service = info.service_type.display_name();

    if slot_count == 0 {
        return format!(
            "I'm sorry, but I couldn't find any available {service} appointments at the moment. Would you like to try a different service or time?"
        );
    }

    match slot_count % 3 {
        0 => format!(
            "Wonderful! I found {slot_count} available {service} appointments. Here are your best options."
        ),
        1 => format!(
            "Great news! There are {slot_count} {service} slots available. Let me show you the top choices."
        ),
        _ => format!("Perfect! I've found {slot_count} {service} appointments that work for you."),
    }
}

fn booked_response(provider_name: &str) -> String {
    format!("Appointment booked successfully with {provider_name}!")
}
