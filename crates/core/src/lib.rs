pub mod booking;
pub mod config;
pub mod dialog;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod schedule;
pub mod session;

pub use booking::{memory::InMemoryAppointmentStore, BookingLedger};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use dialog::{
    is_closing_reply, parse_booking_directive, strip_directive_lines, BookingDirective,
    DialogEngine, ReplyError, ReplyGenerator, BOOKING_MARKER,
};
pub use domain::{
    format_slot, parse_slot, Appointment, BookingRequest, BusinessContext, BusinessId, Service,
    SlotKey, StaffMember, SLOT_FORMAT,
};
pub use errors::{AvailabilityError, BookingError, CalendarError, StoreError};
pub use extract::ResolvedDate;
pub use schedule::{
    AppointmentStore, AvailabilityEngine, BusyInterval, FreeBusySource, InsertOutcome,
    SlotCandidate, DEFAULT_SLOT_MINUTES,
};
pub use session::{ConversationState, Session, SessionStore, DEFAULT_SESSION_TTL};
