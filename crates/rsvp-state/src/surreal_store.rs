use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::storage_traits::{
    CheckInOutcome, EventRecord, QrToken, Registration, RegistrationId, RegistrationStore,
    StorageResult,
};
use crate::SurrealHandle;

/// SurrealDB-backed implementation of the RegistrationStore trait.
#[derive(Clone)]
pub struct SurrealRegistrationStore {
    handle: Arc<SurrealHandle>,
}

impl SurrealRegistrationStore {
    pub fn new(handle: Arc<SurrealHandle>) -> Self {
        Self { handle }
    }

    /// In-memory store with a fresh schema, for tests and demos.
    pub async fn in_memory() -> crate::Result<Self> {
        Ok(Self::new(Arc::new(SurrealHandle::setup_db().await?)))
    }
}

#[async_trait]
impl RegistrationStore for SurrealRegistrationStore {
    async fn insert(&self, registration: Registration) -> StorageResult<Registration> {
        self.handle.registration_insert(registration).await
    }

    async fn get_registration(
        &self,
        id: &RegistrationId,
    ) -> StorageResult<Option<Registration>> {
        self.handle.registration_get(id).await
    }

    async fn find_by_token(&self, token: &QrToken) -> StorageResult<Option<Registration>> {
        self.handle.registration_by_token(token).await
    }

    async fn find_by_event(&self, event_id: &str) -> StorageResult<Vec<Registration>> {
        self.handle.registrations_for_event(event_id).await
    }

    async fn find_by_email(
        &self,
        email: &str,
        exclude_event_id: Option<&str>,
    ) -> StorageResult<Vec<Registration>> {
        self.handle
            .registrations_for_email(email, exclude_event_id)
            .await
    }

    async fn find_histories(
        &self,
        emails: &[String],
        exclude_event_id: Option<&str>,
    ) -> StorageResult<HashMap<String, Vec<Registration>>> {
        self.handle
            .registration_histories(emails, exclude_event_id)
            .await
    }

    async fn conditional_check_in(
        &self,
        id: &RegistrationId,
        at: DateTime<Utc>,
    ) -> StorageResult<CheckInOutcome> {
        self.handle.registration_check_in(id, at).await
    }

    async fn insert_event(&self, event: EventRecord) -> StorageResult<EventRecord> {
        self.handle.event_insert(event).await
    }

    async fn get_event(&self, id: &str) -> StorageResult<Option<EventRecord>> {
        self.handle.event_get(id).await
    }

    async fn list_events(&self) -> StorageResult<Vec<EventRecord>> {
        self.handle.event_list().await
    }
}
