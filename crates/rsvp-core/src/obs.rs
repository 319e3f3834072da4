//! Structured observability hooks for RSVP lifecycle events.
//!
//! Each function emits one `tracing` event with a stable `event = "..."`
//! field so log pipelines can filter on it:
//! - registration.created / registration.token_collision
//! - checkin.recorded / checkin.repeat_scan / checkin.batch
//! - prediction.computed
//!
//! Events are emitted at `info!` (collisions at `warn!`). Output format is
//! chosen by [`crate::telemetry::init_tracing`].

use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Span that tags everything logged while handling one door scan.
///
/// Attach it to the scan future with `tracing::Instrument` so the span
/// follows the task across await points:
///
/// ```ignore
/// handle_scan(token).instrument(scan_span("QR_8fK2...")).await
/// ```
pub fn scan_span(token: &str) -> tracing::Span {
    tracing::info_span!("rsvp.scan", token = %token)
}

/// Emit event: a registration row was created.
pub fn emit_registration_created(event_id: &str, registration_id: &str, attendance: &str) {
    info!(
        event = "registration.created",
        event_id = %event_id,
        registration_id = %registration_id,
        attendance = %attendance,
    );
}

/// Emit event: a minted token collided with an existing one.
pub fn emit_token_collision(attempt: u32, max_attempts: u32) {
    warn!(
        event = "registration.token_collision",
        attempt = attempt,
        max_attempts = max_attempts,
    );
}

/// Emit event: a guest transitioned to checked-in.
pub fn emit_checked_in(event_id: &str, registration_id: &str) {
    info!(event = "checkin.recorded", event_id = %event_id, registration_id = %registration_id);
}

/// Emit event: a guest who was already checked in was scanned again.
pub fn emit_repeat_scan(registration_id: &str, first_checked_in_at: Option<DateTime<Utc>>) {
    info!(
        event = "checkin.repeat_scan",
        registration_id = %registration_id,
        first_checked_in_at = ?first_checked_in_at,
    );
}

/// Emit event: a team batch finished.
pub fn emit_batch_check_in(requested: usize, newly_checked_in: usize, already: usize, unknown: usize) {
    info!(
        event = "checkin.batch",
        requested = requested,
        newly_checked_in = newly_checked_in,
        already_checked_in = already,
        unknown = unknown,
    );
}

/// Emit event: a turnout forecast was produced.
pub fn emit_prediction(event_id: &str, registrations: usize, predicted: u32, confidence: &str) {
    info!(
        event = "prediction.computed",
        event_id = %event_id,
        registrations = registrations,
        predicted = predicted,
        confidence = %confidence,
    );
}
