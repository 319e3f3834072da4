//! Domain types shared by the engine components.
//!
//! - `RsvpError` / `ErrorKind`: the four-way error taxonomy
//! - `RegistrationRequest` / `EventRequest`: inbound payloads and validation

pub mod error;
pub mod request;

pub use error::{ErrorKind, Result, RsvpError, ValidationError};
pub use request::{EventRequest, RegistrationRequest, ValidRegistration, MIN_NAME_LEN};
