//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryRegistrationStore`, which satisfies the
//! [`RegistrationStore`] contract without any external dependencies and can
//! simulate an unavailable backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{StorageError, UniqueConstraint};
use crate::storage_traits::*;

#[derive(Debug, Default)]
struct Tables {
    registrations: Vec<Registration>,
    events: Vec<EventRecord>,
}

/// In-memory registration store backed by insertion-ordered vectors.
///
/// All mutations happen under one mutex, so `conditional_check_in` is
/// trivially atomic per row.
#[derive(Debug, Default)]
pub struct MemoryRegistrationStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    check_in_budget: Mutex<Option<usize>>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StorageError::Backend`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Allow `n` more conditional check-ins, then behave as unavailable.
    pub fn fail_check_ins_after(&self, n: usize) {
        *self.check_in_budget.lock().unwrap() = Some(n);
    }

    /// Number of stored registrations.
    pub fn len(&self) -> usize {
        self.tables.lock().unwrap().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("store unavailable".to_string()));
        }
        Ok(())
    }

    fn consume_check_in_budget(&self) -> StorageResult<()> {
        let mut budget = self.check_in_budget.lock().unwrap();
        match budget.as_mut() {
            Some(0) => Err(StorageError::Backend("store unavailable".to_string())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn insert(&self, registration: Registration) -> StorageResult<Registration> {
        self.ensure_available()?;
        let mut tables = self.tables.lock().unwrap();
        for existing in &tables.registrations {
            if existing.id == registration.id {
                return Err(StorageError::UniqueViolation {
                    constraint: UniqueConstraint::RegistrationId,
                });
            }
            if existing.qr_token == registration.qr_token {
                return Err(StorageError::UniqueViolation {
                    constraint: UniqueConstraint::QrToken,
                });
            }
            if existing.event_id == registration.event_id && existing.email == registration.email
            {
                return Err(StorageError::UniqueViolation {
                    constraint: UniqueConstraint::EventEmail,
                });
            }
        }
        tables.registrations.push(registration.clone());
        Ok(registration)
    }

    async fn get_registration(
        &self,
        id: &RegistrationId,
    ) -> StorageResult<Option<Registration>> {
        self.ensure_available()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.registrations.iter().find(|r| r.id == *id).cloned())
    }

    async fn find_by_token(&self, token: &QrToken) -> StorageResult<Option<Registration>> {
        self.ensure_available()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .registrations
            .iter()
            .find(|r| r.qr_token == *token)
            .cloned())
    }

    async fn find_by_event(&self, event_id: &str) -> StorageResult<Vec<Registration>> {
        self.ensure_available()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn find_by_email(
        &self,
        email: &str,
        exclude_event_id: Option<&str>,
    ) -> StorageResult<Vec<Registration>> {
        self.ensure_available()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .registrations
            .iter()
            .filter(|r| r.email == email)
            .filter(|r| exclude_event_id.map(|e| r.event_id != e).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn conditional_check_in(
        &self,
        id: &RegistrationId,
        at: DateTime<Utc>,
    ) -> StorageResult<CheckInOutcome> {
        self.ensure_available()?;
        self.consume_check_in_budget()?;
        let mut tables = self.tables.lock().unwrap();
        let row = tables
            .registrations
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or_else(|| StorageError::RegistrationNotFound {
                id: id.0.clone(),
            })?;
        if row.checked_in {
            return Ok(CheckInOutcome::AlreadyCheckedIn(row.clone()));
        }
        row.checked_in = true;
        row.checked_in_at = Some(at);
        Ok(CheckInOutcome::Transitioned(row.clone()))
    }

    async fn insert_event(&self, event: EventRecord) -> StorageResult<EventRecord> {
        self.ensure_available()?;
        let mut tables = self.tables.lock().unwrap();
        if tables.events.iter().any(|e| e.id == event.id) {
            return Err(StorageError::UniqueViolation {
                constraint: UniqueConstraint::EventId,
            });
        }
        tables.events.push(event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: &str) -> StorageResult<Option<EventRecord>> {
        self.ensure_available()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_events(&self) -> StorageResult<Vec<EventRecord>> {
        self.ensure_available()?;
        let tables = self.tables.lock().unwrap();
        let mut events = tables.events.clone();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }
}
