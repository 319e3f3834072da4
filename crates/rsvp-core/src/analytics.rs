//! Organizer-facing reports: per-event stats, team rosters, guest search
//! and cross-event analytics.
//!
//! Everything here is a read over store snapshots; nothing is cached or
//! written back.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Timelike;
use rsvp_state::{Attendance, Registration, RegistrationStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::{Result, RsvpError};

/// Default number of hits returned by [`EventAnalytics::search_guests`].
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

const TOP_TEAMS: usize = 10;
const SHOW_RATE_EVENTS: usize = 10;

/// Headline numbers for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub event_id: String,
    pub total: u32,
    pub confirmed: u32,
    pub maybe: u32,
    pub declined: u32,
    pub checked_in: u32,
    /// Check-ins as a percentage of confirmed guests; 0 when nobody confirmed.
    pub attendance_rate: u32,
    pub capacity: u32,
    pub spots_remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamProgress {
    None,
    Partial,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRoster {
    pub team_name: String,
    pub members: Vec<Registration>,
    pub checked_in: u32,
    pub progress: TeamProgress,
}

impl TeamRoster {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpBreakdown {
    pub yes: u32,
    pub maybe: u32,
    pub no: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyCheckIns {
    /// UTC hour label, e.g. `"9:00"` or `"18:00"`.
    pub hour: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPerformance {
    pub team: String,
    pub percentage: u32,
    pub total: u32,
    pub checked_in: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventShowRate {
    pub event_id: String,
    pub name: String,
    /// Short display date, e.g. `"Mar 9"`.
    pub date: String,
    /// Guests who said yes.
    pub registered: u32,
    /// Guests who checked in, whatever they said.
    pub attended: u32,
}

/// Read-only reports over the store.
pub struct EventAnalytics<S: ?Sized> {
    store: Arc<S>,
}

impl<S> EventAnalytics<S>
where
    S: RegistrationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn event_stats(&self, event_id: &str) -> Result<EventStats> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| RsvpError::NotFound(format!("event {event_id}")))?;
        let registrations = self.store.find_by_event(event_id).await?;

        let breakdown = breakdown_of(&registrations);
        let total = registrations.len() as u32;
        let checked_in = registrations.iter().filter(|r| r.checked_in).count() as u32;

        Ok(EventStats {
            event_id: event.id,
            total,
            confirmed: breakdown.yes,
            maybe: breakdown.maybe,
            declined: breakdown.no,
            checked_in,
            attendance_rate: rate(checked_in, breakdown.yes),
            capacity: event.capacity,
            spots_remaining: event.capacity.saturating_sub(total),
        })
    }

    /// Registrations grouped by team, largest team first.
    #[instrument(skip(self))]
    pub async fn team_roster(&self, event_id: &str) -> Result<Vec<TeamRoster>> {
        let registrations = self.store.find_by_event(event_id).await?;

        let mut teams: HashMap<String, Vec<Registration>> = HashMap::new();
        for registration in registrations {
            if let Some(team) = registration.team_name.clone() {
                teams.entry(team).or_default().push(registration);
            }
        }

        let mut rosters: Vec<TeamRoster> = teams
            .into_iter()
            .map(|(team_name, members)| {
                let checked_in = members.iter().filter(|m| m.checked_in).count() as u32;
                let progress = if checked_in == 0 {
                    TeamProgress::None
                } else if checked_in as usize == members.len() {
                    TeamProgress::Complete
                } else {
                    TeamProgress::Partial
                };
                TeamRoster {
                    team_name,
                    members,
                    checked_in,
                    progress,
                }
            })
            .collect();

        rosters.sort_by(|a, b| {
            b.size()
                .cmp(&a.size())
                .then_with(|| a.team_name.cmp(&b.team_name))
        });
        Ok(rosters)
    }

    /// Case-insensitive substring search on name or email within one event.
    #[instrument(skip(self))]
    pub async fn search_guests(
        &self,
        event_id: &str,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Registration>> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let hits: Vec<Registration> = self
            .store
            .find_by_event(event_id)
            .await?
            .into_iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&needle) || r.email.to_lowercase().contains(&needle)
            })
            .take(limit)
            .collect();
        debug!(hits = hits.len(), "Guest search");
        Ok(hits)
    }

    /// Yes/maybe/no counts for one event, or all events when `scope` is `None`.
    #[instrument(skip(self))]
    pub async fn rsvp_breakdown(&self, scope: Option<&str>) -> Result<RsvpBreakdown> {
        let registrations = self.registrations_in(scope).await?;
        Ok(breakdown_of(&registrations))
    }

    /// Check-ins bucketed by UTC hour of day, earliest hour first.
    #[instrument(skip(self))]
    pub async fn hourly_check_ins(&self, scope: Option<&str>) -> Result<Vec<HourlyCheckIns>> {
        let registrations = self.registrations_in(scope).await?;

        let mut buckets: BTreeMap<u32, u32> = BTreeMap::new();
        for at in registrations.iter().filter_map(|r| r.checked_in_at) {
            *buckets.entry(at.hour()).or_default() += 1;
        }

        Ok(buckets
            .into_iter()
            .map(|(hour, count)| HourlyCheckIns {
                hour: format!("{hour}:00"),
                count,
            })
            .collect())
    }

    /// Check-in percentage per team, best ten first.
    #[instrument(skip(self))]
    pub async fn team_performance(&self, scope: Option<&str>) -> Result<Vec<TeamPerformance>> {
        let registrations = self.registrations_in(scope).await?;

        let mut teams: HashMap<String, (u32, u32)> = HashMap::new();
        for registration in &registrations {
            if let Some(team) = &registration.team_name {
                let entry = teams.entry(team.clone()).or_default();
                entry.0 += 1;
                if registration.checked_in {
                    entry.1 += 1;
                }
            }
        }

        let mut performance: Vec<TeamPerformance> = teams
            .into_iter()
            .map(|(team, (total, checked_in))| TeamPerformance {
                team,
                percentage: rate(checked_in, total),
                total,
                checked_in,
            })
            .collect();
        performance.sort_by(|a, b| {
            b.percentage
                .cmp(&a.percentage)
                .then_with(|| a.team.cmp(&b.team))
        });
        performance.truncate(TOP_TEAMS);
        Ok(performance)
    }

    /// Confirmed versus attended for the first ten events by date.
    #[instrument(skip(self))]
    pub async fn show_rate(&self) -> Result<Vec<EventShowRate>> {
        let events = self.store.list_events().await?;

        let mut rows = Vec::with_capacity(events.len().min(SHOW_RATE_EVENTS));
        for event in events.into_iter().take(SHOW_RATE_EVENTS) {
            let registrations = self.store.find_by_event(&event.id).await?;
            rows.push(EventShowRate {
                date: event.date.format("%b %-d").to_string(),
                registered: registrations
                    .iter()
                    .filter(|r| r.attendance == Attendance::Yes)
                    .count() as u32,
                attended: registrations.iter().filter(|r| r.checked_in).count() as u32,
                event_id: event.id,
                name: event.name,
            });
        }
        Ok(rows)
    }

    async fn registrations_in(&self, scope: Option<&str>) -> Result<Vec<Registration>> {
        match scope {
            Some(event_id) => Ok(self.store.find_by_event(event_id).await?),
            None => {
                let mut all = Vec::new();
                for event in self.store.list_events().await? {
                    all.extend(self.store.find_by_event(&event.id).await?);
                }
                Ok(all)
            }
        }
    }
}

fn breakdown_of(registrations: &[Registration]) -> RsvpBreakdown {
    let mut breakdown = RsvpBreakdown {
        yes: 0,
        maybe: 0,
        no: 0,
    };
    for registration in registrations {
        match registration.attendance {
            Attendance::Yes => breakdown.yes += 1,
            Attendance::Maybe => breakdown.maybe += 1,
            Attendance::No => breakdown.no += 1,
        }
    }
    breakdown
}

/// `round(part / whole * 100)`, or 0 when `whole` is 0. May exceed 100.
fn rate(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) / f64::from(whole) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_rounds_and_handles_zero() {
        assert_eq!(rate(0, 0), 0);
        assert_eq!(rate(1, 3), 33);
        assert_eq!(rate(2, 3), 67);
        assert_eq!(rate(3, 2), 150);
    }

    #[test]
    fn team_progress_serializes_lowercase() {
        let json = serde_json::to_string(&TeamProgress::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
    }
}
