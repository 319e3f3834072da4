//! Door check-in.
//!
//! A registration moves `Registered -> CheckedIn` exactly once. The only
//! write is the store's conditional check-in, so two scanners racing on the
//! same QR code both succeed but only one of them records the transition.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rsvp_state::{
    CheckInOutcome, QrToken, Registration, RegistrationId, RegistrationStore, StorageError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, Instrument};

use crate::domain::error::{Result, RsvpError};
use crate::domain::ValidationError;
use crate::obs;

/// Outcome of scanning one QR code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInReceipt {
    pub success: bool,
    pub already_checked_in: bool,
    pub registration: Registration,
    pub message: String,
}

impl CheckInReceipt {
    fn checked_in(registration: Registration) -> Self {
        Self {
            success: true,
            already_checked_in: false,
            message: format!("Successfully checked in {}", registration.name),
            registration,
        }
    }

    fn repeat(registration: Registration) -> Self {
        let message = match registration.checked_in_at {
            Some(at) => format!(
                "{} was already checked in at {}",
                registration.name,
                at.format("%H:%M:%S UTC")
            ),
            None => format!("{} was already checked in", registration.name),
        };
        Self {
            success: true,
            already_checked_in: true,
            registration,
            message,
        }
    }
}

/// Outcome of a team (multi-id) check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckIn {
    pub success: bool,
    /// Registrations this call transitioned.
    pub checked_in: Vec<Registration>,
    /// Number of registrations this call transitioned.
    pub count: usize,
    pub already_checked_in: Vec<Registration>,
    pub unknown_ids: Vec<String>,
}

/// Runs check-ins against the store.
pub struct CheckInDesk<S: ?Sized> {
    store: Arc<S>,
}

impl<S> CheckInDesk<S>
where
    S: RegistrationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Check in the guest holding `token`.
    ///
    /// A repeat scan is a success with `already_checked_in = true`; the
    /// stored row is left untouched.
    pub async fn check_in_by_token(&self, token: &str) -> Result<CheckInReceipt> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ValidationError::MissingField { field: "qrToken" }.into());
        }
        self.scan(QrToken::new(token))
            .instrument(obs::scan_span(token))
            .await
    }

    async fn scan(&self, token: QrToken) -> Result<CheckInReceipt> {
        let registration = self
            .store
            .find_by_token(&token)
            .await?
            .ok_or_else(|| RsvpError::NotFound("invalid QR code".to_string()))?;

        if registration.checked_in {
            obs::emit_repeat_scan(registration.id.as_str(), registration.checked_in_at);
            return Ok(CheckInReceipt::repeat(registration));
        }

        match self
            .store
            .conditional_check_in(&registration.id, Utc::now())
            .await?
        {
            CheckInOutcome::Transitioned(registration) => {
                obs::emit_checked_in(&registration.event_id, registration.id.as_str());
                Ok(CheckInReceipt::checked_in(registration))
            }
            CheckInOutcome::AlreadyCheckedIn(registration) => {
                // Lost a race with another scanner.
                obs::emit_repeat_scan(registration.id.as_str(), registration.checked_in_at);
                Ok(CheckInReceipt::repeat(registration))
            }
        }
    }

    /// Check in many registrations at once.
    ///
    /// Duplicate ids are folded together and every transition carries the
    /// same timestamp. Unknown ids are skipped. A store failure aborts the
    /// batch with `Internal`; rows already transitioned stay checked in.
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn check_in_batch(&self, ids: &[RegistrationId]) -> Result<BatchCheckIn> {
        let at = Utc::now();
        let mut seen = HashSet::with_capacity(ids.len());
        let mut result = BatchCheckIn {
            success: true,
            checked_in: Vec::new(),
            count: 0,
            already_checked_in: Vec::new(),
            unknown_ids: Vec::new(),
        };

        for id in ids.iter().filter(|id| seen.insert(*id)) {
            match self.store.conditional_check_in(id, at).await {
                Ok(CheckInOutcome::Transitioned(registration)) => {
                    obs::emit_checked_in(&registration.event_id, registration.id.as_str());
                    result.checked_in.push(registration);
                }
                Ok(CheckInOutcome::AlreadyCheckedIn(registration)) => {
                    debug!(registration_id = %registration.id, "Already checked in; skipped");
                    result.already_checked_in.push(registration);
                }
                Err(StorageError::RegistrationNotFound { .. }) => {
                    result.unknown_ids.push(id.to_string());
                }
                Err(err) => return Err(RsvpError::Internal(err.to_string())),
            }
        }

        result.count = result.checked_in.len();
        obs::emit_batch_check_in(
            seen.len(),
            result.count,
            result.already_checked_in.len(),
            result.unknown_ids.len(),
        );
        Ok(result)
    }

    /// Check in every member of `team_name` at `event_id`.
    #[instrument(skip(self))]
    pub async fn check_in_team(&self, event_id: &str, team_name: &str) -> Result<BatchCheckIn> {
        let team_name = team_name.trim();
        if team_name.is_empty() {
            return Err(ValidationError::MissingField { field: "teamName" }.into());
        }

        let ids: Vec<RegistrationId> = self
            .store
            .find_by_event(event_id)
            .await?
            .into_iter()
            .filter(|r| r.team_name.as_deref() == Some(team_name))
            .map(|r| r.id)
            .collect();

        if ids.is_empty() {
            return Err(RsvpError::NotFound(format!("team {team_name}")));
        }
        self.check_in_batch(&ids).await
    }
}
