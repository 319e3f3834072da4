//! Turnout prediction.
//!
//! Each registrant contributes a fractional expected attendance based on
//! their stated intent and their commitment score computed over *other*
//! events:
//!
//! | intent | score >= 80 | 50..80 | < 50 |
//! |--------|-------------|--------|------|
//! | yes    | 0.95        | 0.75   | 0.5  |
//! | maybe  | 0.7         | 0.4    | 0.2  |
//! | no     | 0           | 0      | 0    |
//!
//! The forecast is the rounded sum. Confidence depends only on how many
//! registrations the event has.

use std::collections::HashMap;
use std::sync::Arc;

use rsvp_state::{Attendance, Registration, RegistrationStore};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::error::Result;
use crate::obs;
use crate::scoring::{CommitmentScore, MODERATE_THRESHOLD, RELIABLE_THRESHOLD};

/// Expected attendance contributed by one registration.
pub fn attendance_weight(attendance: Attendance, score: u8) -> f64 {
    let band = if score >= RELIABLE_THRESHOLD {
        0
    } else if score >= MODERATE_THRESHOLD {
        1
    } else {
        2
    };
    match attendance {
        Attendance::Yes => [0.95, 0.75, 0.5][band],
        Attendance::Maybe => [0.7, 0.4, 0.2][band],
        Attendance::No => 0.0,
    }
}

/// How much to trust a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// More than 20 registrations is high, more than 10 medium.
    pub fn for_sample(registrations: usize) -> Self {
        if registrations > 20 {
            Confidence::High
        } else if registrations > 10 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn accuracy(&self) -> &'static str {
        match self {
            Confidence::High => "±5%",
            Confidence::Medium => "±10%",
            Confidence::Low => "±20%",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Running sums before rounding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnoutTally {
    pub likely_yes: f64,
    pub likely_maybe: f64,
    pub definite_no: u32,
    pub registered: u32,
    pub registrations: usize,
}

impl TurnoutTally {
    /// Add one registration whose peer score is `score`.
    pub fn add(&mut self, attendance: Attendance, score: u8) {
        self.registrations += 1;
        match attendance {
            Attendance::Yes => {
                self.likely_yes += attendance_weight(attendance, score);
                self.registered += 1;
            }
            Attendance::Maybe => {
                self.likely_maybe += attendance_weight(attendance, score);
                self.registered += 1;
            }
            Attendance::No => self.definite_no += 1,
        }
    }

    pub fn into_prediction(self) -> TurnoutPrediction {
        let confidence = Confidence::for_sample(self.registrations);
        TurnoutPrediction {
            predicted: (self.likely_yes + self.likely_maybe).round() as u32,
            registered: self.registered,
            breakdown: TurnoutBreakdown {
                likely_yes: self.likely_yes.round() as u32,
                likely_maybe: self.likely_maybe.round() as u32,
                definite_no: self.definite_no,
            },
            confidence,
            accuracy: confidence.accuracy().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnoutBreakdown {
    pub likely_yes: u32,
    pub likely_maybe: u32,
    pub definite_no: u32,
}

/// Attendance forecast for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnoutPrediction {
    pub predicted: u32,
    pub registered: u32,
    pub breakdown: TurnoutBreakdown,
    pub confidence: Confidence,
    pub accuracy: String,
}

/// Tally an event snapshot given each registrant's history on other events.
///
/// Emails missing from `histories` are scored as new guests.
pub fn tally_snapshot(
    registrations: &[Registration],
    histories: &HashMap<String, Vec<Registration>>,
) -> TurnoutTally {
    let mut tally = TurnoutTally::default();
    for registration in registrations {
        let history = histories
            .get(&registration.email)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let peer = CommitmentScore::from_history(&registration.email, history);
        tally.add(registration.attendance, peer.score);
    }
    tally
}

/// Forecasts event turnout from the store.
pub struct TurnoutPredictor<S: ?Sized> {
    store: Arc<S>,
}

impl<S> TurnoutPredictor<S>
where
    S: RegistrationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Predict turnout for `event_id`.
    ///
    /// Each registrant is scored with this event excluded from their
    /// history. Histories are fetched in one batch. Any store failure
    /// aborts the whole prediction.
    #[instrument(skip(self))]
    pub async fn predict(&self, event_id: &str) -> Result<TurnoutPrediction> {
        let registrations = self.store.find_by_event(event_id).await?;

        let mut emails: Vec<String> = registrations.iter().map(|r| r.email.clone()).collect();
        emails.sort();
        emails.dedup();
        let histories = self.store.find_histories(&emails, Some(event_id)).await?;

        let tally = tally_snapshot(&registrations, &histories);
        let count = tally.registrations;
        let prediction = tally.into_prediction();

        obs::emit_prediction(
            event_id,
            count,
            prediction.predicted,
            prediction.confidence.as_str(),
        );
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_match_table() {
        assert_eq!(attendance_weight(Attendance::Yes, 80), 0.95);
        assert_eq!(attendance_weight(Attendance::Yes, 79), 0.75);
        assert_eq!(attendance_weight(Attendance::Yes, 50), 0.75);
        assert_eq!(attendance_weight(Attendance::Yes, 49), 0.5);
        assert_eq!(attendance_weight(Attendance::Maybe, 100), 0.7);
        assert_eq!(attendance_weight(Attendance::Maybe, 60), 0.4);
        assert_eq!(attendance_weight(Attendance::Maybe, 0), 0.2);
        assert_eq!(attendance_weight(Attendance::No, 100), 0.0);
    }

    #[test]
    fn confidence_thresholds() {
        assert_eq!(Confidence::for_sample(0), Confidence::Low);
        assert_eq!(Confidence::for_sample(10), Confidence::Low);
        assert_eq!(Confidence::for_sample(11), Confidence::Medium);
        assert_eq!(Confidence::for_sample(20), Confidence::Medium);
        assert_eq!(Confidence::for_sample(21), Confidence::High);
        assert_eq!(Confidence::High.accuracy(), "±5%");
    }

    #[test]
    fn tally_three_reliable_yes_and_one_moderate_maybe() {
        let mut tally = TurnoutTally::default();
        for _ in 0..3 {
            tally.add(Attendance::Yes, 90);
        }
        tally.add(Attendance::Maybe, 60);

        assert!((tally.likely_yes - 2.85).abs() < 1e-9);
        assert!((tally.likely_maybe - 0.4).abs() < 1e-9);

        let prediction = tally.into_prediction();
        assert_eq!(prediction.predicted, 3);
        assert_eq!(
            prediction.breakdown,
            TurnoutBreakdown {
                likely_yes: 3,
                likely_maybe: 0,
                definite_no: 0
            }
        );
        assert_eq!(prediction.registered, 4);
    }

    #[test]
    fn no_intent_counts_but_adds_no_weight() {
        let mut tally = TurnoutTally::default();
        tally.add(Attendance::No, 100);
        tally.add(Attendance::No, 10);
        let prediction = tally.into_prediction();
        assert_eq!(prediction.predicted, 0);
        assert_eq!(prediction.registered, 0);
        assert_eq!(prediction.breakdown.definite_no, 2);
    }

    #[test]
    fn prediction_serializes_like_dashboard_payload() {
        let json = serde_json::to_value(TurnoutTally::default().into_prediction()).unwrap();
        assert_eq!(json["confidence"], "low");
        assert_eq!(json["accuracy"], "±20%");
        assert_eq!(json["breakdown"]["likelyYes"], 0);
    }
}
