//! RSVP Core Library
//!
//! Attendance-reliability engine for campus events: commitment scoring,
//! turnout prediction, QR check-in, registration intake and organizer
//! analytics. Persistence is behind [`rsvp_state::RegistrationStore`].

pub mod analytics;
pub mod checkin;
pub mod domain;
pub mod engine;
pub mod obs;
pub mod prediction;
pub mod registration;
pub mod scoring;
pub mod telemetry;
pub mod token;

pub use analytics::{
    EventAnalytics, EventShowRate, EventStats, HourlyCheckIns, RsvpBreakdown, TeamPerformance,
    TeamProgress, TeamRoster, DEFAULT_SEARCH_LIMIT,
};
pub use checkin::{BatchCheckIn, CheckInDesk, CheckInReceipt};
pub use domain::{
    ErrorKind, EventRequest, RegistrationRequest, Result, RsvpError, ValidRegistration,
    ValidationError, MIN_NAME_LEN,
};
pub use engine::AttendanceEngine;
pub use prediction::{
    attendance_weight, tally_snapshot, Confidence, TurnoutBreakdown, TurnoutPrediction,
    TurnoutPredictor, TurnoutTally,
};
pub use registration::RegistrationDesk;
pub use scoring::{CommitmentScore, CommitmentScorer, Tier, NEW_GUEST_SCORE};
pub use token::{TokenIssuer, TokenPolicy};

pub use rsvp_state::{
    Attendance, CheckInOutcome, EventRecord, MemoryRegistrationStore, QrToken, Registration,
    RegistrationId, RegistrationStore, SurrealHandle, SurrealRegistrationStore,
};

pub use obs::scan_span;
pub use telemetry::init_tracing;

/// RSVP engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
