use super::appointment::Appointment;
use super::intent::BookingInfo;
use super::slot::PrioritizedSlot;

/// Why a session ended up in the error state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionFailure {
    InsufficientCredits,
    Processing(String),
    Booking(String),
    /// The request driving the session went away mid-flight.
    Abandoned,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingState {
    Idle,
    Listening,
    Processing {
        transcript: String,
    },
    Confirming {
        booking_info: BookingInfo,
        slots: Vec<PrioritizedSlot>,
    },
    Booking {
        booking_info: BookingInfo,
        slot: PrioritizedSlot,
    },
    Success {
        appointment: Appointment,
    },
    Error {
        failure: SessionFailure,
    },
}

impl BookingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingState::Idle => "idle",
            BookingState::Listening => "listening",
            BookingState::Processing { .. } => "processing",
            BookingState::Confirming { .. } => "confirming",
            BookingState::Booking { .. } => "booking",
            BookingState::Success { .. } => "success",
            BookingState::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("insufficient credits")]
    InsufficientCredits,

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("slot index {index} is out of range ({available} presented)")]
    IndexOutOfRange { index: usize, available: usize },
}

/// One caller's pass through the voice booking flow.
///
/// The session is re-entrant: `success` and `error` go back to `idle` via
/// [`BookingSession::reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct BookingSession {
    state: BookingState,
}

impl Default for BookingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingSession {
    pub fn new() -> Self {
        Self {
            state: BookingState::Idle,
        }
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            BookingState::Success { .. } | BookingState::Error { .. }
        )
    }

    /// Processing or booking, with a request still working on it.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.state,
            BookingState::Processing { .. } | BookingState::Booking { .. }
        )
    }

    pub fn presented_slots(&self) -> &[PrioritizedSlot] {
        match &self.state {
            BookingState::Confirming { slots, .. } => slots,
            _ => &[],
        }
    }

    /// A capture request. Re-capturing while confirming abandons the offer.
    pub fn start_listening(&mut self, balance: i64) -> Result<(), SessionError> {
        match self.state {
            BookingState::Idle | BookingState::Listening | BookingState::Confirming { .. } => {}
            _ => return Err(self.invalid("start listening")),
        }

        if balance <= 0 {
            self.state = BookingState::Error {
                failure: SessionFailure::InsufficientCredits,
            };
            return Err(SessionError::InsufficientCredits);
        }

        self.state = BookingState::Listening;
        Ok(())
    }

    pub fn transcript_ready(&mut self, transcript: &str) -> Result<(), SessionError> {
        if self.state != BookingState::Listening {
            return Err(self.invalid("accept a transcript"));
        }
        self.state = BookingState::Processing {
            transcript: transcript.to_string(),
        };
        Ok(())
    }

    /// Processing finished. An empty `slots` is a valid "no results" offer.
    pub fn offer(
        &mut self,
        booking_info: BookingInfo,
        slots: Vec<PrioritizedSlot>,
    ) -> Result<(), SessionError> {
        if !matches!(self.state, BookingState::Processing { .. }) {
            return Err(self.invalid("present slots"));
        }
        self.state = BookingState::Confirming {
            booking_info,
            slots,
        };
        Ok(())
    }

    /// Picks a presented slot by index. Out-of-range leaves the session in
    /// `confirming`.
    pub fn select(&mut self, index: usize) -> Result<(BookingInfo, PrioritizedSlot), SessionError> {
        let BookingState::Confirming {
            booking_info,
            slots,
        } = &self.state
        else {
            return Err(self.invalid("select a slot"));
        };

        let Some(slot) = slots.get(index).cloned() else {
            return Err(SessionError::IndexOutOfRange {
                index,
                available: slots.len(),
            });
        };
        let booking_info = booking_info.clone();

        self.state = BookingState::Booking {
            booking_info: booking_info.clone(),
            slot: slot.clone(),
        };
        Ok((booking_info, slot))
    }

    pub fn complete(&mut self, appointment: Appointment) -> Result<(), SessionError> {
        if !matches!(self.state, BookingState::Booking { .. }) {
            return Err(self.invalid("complete a booking"));
        }
        self.state = BookingState::Success { appointment };
        Ok(())
    }

    pub fn fail(&mut self, failure: SessionFailure) {
        self.state = BookingState::Error { failure };
    }

    pub fn reset(&mut self) {
        self.state = BookingState::Idle;
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.state.as_str(),
        }
    }
}
