//! RSVP-State: Registration Store for the RSVP Engine
//!
//! This crate owns every byte of persistence the attendance engine touches.
//! The engine itself only sees the [`RegistrationStore`] trait; this crate
//! supplies two implementations of it.
//!
//! ## Key Components
//!
//! - `RegistrationStore`: async store contract (lookups, conditional
//!   check-in, constrained inserts, event reads)
//! - `MemoryRegistrationStore`: in-memory fake with fault injection
//! - `SurrealHandle`: SurrealDB connection and queries
//! - `SurrealRegistrationStore`: the trait over a `SurrealHandle`

mod error;
pub mod fakes;
mod handle;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError, UniqueConstraint};
pub use fakes::MemoryRegistrationStore;
pub use handle::{CloudConfig, SurrealHandle};
pub use storage_traits::{
    Attendance, CheckInOutcome, EventRecord, ParseAttendanceError, QrToken, Registration,
    RegistrationId, RegistrationStore, StorageResult,
};
pub use surreal_store::SurrealRegistrationStore;

/// Result type for connection and schema setup
pub type Result<T> = std::result::Result<T, StateError>;
