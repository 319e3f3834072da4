//! One handle over every engine component, all sharing the same store.

use std::sync::Arc;

use rsvp_state::RegistrationStore;

use crate::analytics::EventAnalytics;
use crate::checkin::CheckInDesk;
use crate::prediction::TurnoutPredictor;
use crate::registration::RegistrationDesk;
use crate::scoring::CommitmentScorer;
use crate::token::{TokenIssuer, TokenPolicy};

pub struct AttendanceEngine<S: ?Sized> {
    pub scorer: CommitmentScorer<S>,
    pub predictor: TurnoutPredictor<S>,
    pub check_in: CheckInDesk<S>,
    pub registrations: RegistrationDesk<S>,
    pub analytics: EventAnalytics<S>,
    store: Arc<S>,
}

impl<S> AttendanceEngine<S>
where
    S: RegistrationStore + ?Sized,
{
    /// Engine with the default token policy and an entropy-seeded issuer.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_issuer(store, TokenIssuer::default())
    }

    pub fn with_token_policy(store: Arc<S>, policy: TokenPolicy) -> Self {
        Self::with_issuer(store, TokenIssuer::new(policy))
    }

    pub fn with_issuer(store: Arc<S>, issuer: TokenIssuer) -> Self {
        Self {
            scorer: CommitmentScorer::new(Arc::clone(&store)),
            predictor: TurnoutPredictor::new(Arc::clone(&store)),
            check_in: CheckInDesk::new(Arc::clone(&store)),
            registrations: RegistrationDesk::new(Arc::clone(&store), issuer),
            analytics: EventAnalytics::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
