pub mod appointment;
pub mod availability;
pub mod conflict;
pub mod credit;
pub mod intent;
pub mod pattern;
pub mod provider;
pub mod session;
pub mod slot;

pub use appointment::{Appointment, AppointmentStatus, BookingMethod, SlotKey};
pub use availability::{WorkingHours, WorkingWindow};
pub use conflict::{ConflictKind, ConflictReport};
pub use credit::{find_plan, CreditPlan, CREDIT_PLANS};
pub use intent::{BookingInfo, Urgency};
pub use pattern::{PatternKind, UserPattern};
pub use provider::{Provider, ProviderSummary, ServiceCategory};
pub use session::{BookingSession, BookingState, SessionError, SessionFailure};
pub use slot::{CandidateSlot, PrioritizedSlot};
