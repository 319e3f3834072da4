//! Commitment scoring.
//!
//! A guest's commitment score is the share of their confirmed "yes" RSVPs
//! they actually showed up to, as a rounded percentage. Guests with no
//! confirmed "yes" on record get the new-guest default of 50 and tier
//! [`Tier::New`], whatever else their history holds.

use std::sync::Arc;

use rsvp_state::{Attendance, Registration, RegistrationStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::Result;

/// Score assigned to guests without a confirmed "yes" on record.
pub const NEW_GUEST_SCORE: u8 = 50;

/// Lowest score in the moderate tier.
pub const MODERATE_THRESHOLD: u8 = 50;

/// Lowest score in the reliable tier.
pub const RELIABLE_THRESHOLD: u8 = 80;

/// Reliability band derived from a commitment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// No confirmed "yes" RSVPs to judge by.
    New,
    /// Score below 50.
    Risky,
    /// Score 50 to 79.
    Moderate,
    /// Score 80 and above.
    Reliable,
}

impl Tier {
    /// Tier for a guest who has at least one confirmed "yes".
    pub fn for_score(score: u8) -> Self {
        if score >= RELIABLE_THRESHOLD {
            Tier::Reliable
        } else if score >= MODERATE_THRESHOLD {
            Tier::Moderate
        } else {
            Tier::Risky
        }
    }

    /// Traffic-light colour used on badges; `None` for new guests.
    pub fn colour(&self) -> Option<&'static str> {
        match self {
            Tier::New => None,
            Tier::Risky => Some("red"),
            Tier::Moderate => Some("yellow"),
            Tier::Reliable => Some("green"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::New => "new",
            Tier::Risky => "risky",
            Tier::Moderate => "moderate",
            Tier::Reliable => "reliable",
        }
    }
}

/// Reliability summary for one guest email. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentScore {
    pub email: String,
    pub total_registered: u32,
    pub total_checked_in: u32,
    pub confirmed_yes: u32,
    pub score: u8,
    pub tier: Tier,
    pub show_rate: String,
}

impl CommitmentScore {
    /// Score a guest from their registration history.
    pub fn from_history(email: &str, history: &[Registration]) -> Self {
        let total_registered = history.len() as u32;
        let total_checked_in = history.iter().filter(|r| r.checked_in).count() as u32;
        let confirmed_yes = history
            .iter()
            .filter(|r| r.attendance == Attendance::Yes)
            .count() as u32;
        let attended_yes = history
            .iter()
            .filter(|r| r.attendance == Attendance::Yes && r.checked_in)
            .count() as u32;

        let (score, tier) = if confirmed_yes == 0 {
            (NEW_GUEST_SCORE, Tier::New)
        } else {
            let score = percentage(attended_yes, confirmed_yes);
            (score, Tier::for_score(score))
        };

        let show_rate = if confirmed_yes > 0 {
            format!("{score}%")
        } else {
            "N/A".to_string()
        };

        Self {
            email: email.to_string(),
            total_registered,
            total_checked_in,
            confirmed_yes,
            score,
            tier,
            show_rate,
        }
    }
}

/// `round(part / whole * 100)`, with `whole > 0` and `part <= whole`.
pub(crate) fn percentage(part: u32, whole: u32) -> u8 {
    (f64::from(part) / f64::from(whole) * 100.0).round() as u8
}

/// Computes commitment scores from the store.
pub struct CommitmentScorer<S: ?Sized> {
    store: Arc<S>,
}

impl<S> CommitmentScorer<S>
where
    S: RegistrationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Score `email`, optionally ignoring its registration for one event.
    ///
    /// Store failures surface as `RsvpError::Internal`; nothing partial is
    /// returned.
    #[instrument(skip(self))]
    pub async fn score(&self, email: &str, exclude_event_id: Option<&str>) -> Result<CommitmentScore> {
        let history = self.store.find_by_email(email, exclude_event_id).await?;
        let score = CommitmentScore::from_history(email, &history);
        debug!(score = score.score, tier = score.tier.as_str(), "Scored guest");
        Ok(score)
    }
}
