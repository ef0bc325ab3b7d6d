pub mod appointment;
pub mod change_request;

pub use appointment::{Appointment, AppointmentStatus};
pub use change_request::{ChangeRequestStatus, DataChangeRequest};
