pub mod appointment;
pub mod business;

pub use appointment::{format_slot, parse_slot, Appointment, BookingRequest, SlotKey, SLOT_FORMAT};
pub use business::{BusinessContext, BusinessId, Service, StaffMember};
