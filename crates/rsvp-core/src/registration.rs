//! Registration intake and event creation.

use std::sync::Arc;

use rsvp_state::{EventRecord, Registration, RegistrationStore, StorageError, UniqueConstraint};
use tracing::{info, instrument};

use crate::domain::error::{Result, RsvpError};
use crate::domain::{EventRequest, RegistrationRequest};
use crate::obs;
use crate::token::TokenIssuer;

/// Creates registrations and mints their QR tokens.
pub struct RegistrationDesk<S: ?Sized> {
    store: Arc<S>,
    issuer: TokenIssuer,
}

impl<S> RegistrationDesk<S>
where
    S: RegistrationStore + ?Sized,
{
    pub fn new(store: Arc<S>, issuer: TokenIssuer) -> Self {
        Self { store, issuer }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Validate `request` and store a new registration for it.
    ///
    /// Errors:
    /// - `Validation` for malformed input
    /// - `NotFound` when the event does not exist
    /// - `Conflict` when the email already registered for the event, or
    ///   when every minted token collided
    #[instrument(skip(self, request), fields(event_id = %request.event_id))]
    pub async fn register(&self, request: RegistrationRequest) -> Result<Registration> {
        let valid = request.validate()?;

        if self.store.get_event(&valid.event_id).await?.is_none() {
            return Err(RsvpError::NotFound(format!("event {}", valid.event_id)));
        }

        let max_attempts = self.issuer.policy().max_attempts;
        for attempt in 1..=max_attempts {
            let mut registration = Registration::new(
                valid.event_id.clone(),
                valid.name.clone(),
                valid.email.clone(),
                valid.attendance,
                self.issuer.issue(),
            );
            registration.meal_preference = valid.meal_preference.clone();
            registration.dietary_restrictions = valid.dietary_restrictions.clone();
            registration.team_name = valid.team_name.clone();

            match self.store.insert(registration).await {
                Ok(stored) => {
                    obs::emit_registration_created(
                        &stored.event_id,
                        stored.id.as_str(),
                        stored.attendance.as_str(),
                    );
                    return Ok(stored);
                }
                Err(StorageError::UniqueViolation {
                    constraint: UniqueConstraint::QrToken,
                }) => obs::emit_token_collision(attempt, max_attempts),
                Err(StorageError::UniqueViolation {
                    constraint: UniqueConstraint::EventEmail,
                }) => {
                    return Err(RsvpError::Conflict(
                        "You have already registered for this event".to_string(),
                    ))
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(RsvpError::Conflict(format!(
            "could not mint a unique QR token after {max_attempts} attempts"
        )))
    }

    /// Validate and store a new event.
    #[instrument(skip(self, request), fields(slug = %request.slug))]
    pub async fn create_event(&self, request: EventRequest) -> Result<EventRecord> {
        let event = request.validate()?;
        let event = self.store.insert_event(event).await?;
        info!(event_id = %event.id, capacity = event.capacity, "Event created");
        Ok(event)
    }
}
