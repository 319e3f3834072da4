//! SurrealDB Handle - Connection and Operations
//!
//! Manages the connection and provides the queries behind
//! [`crate::SurrealRegistrationStore`]:
//! - registration insert and lookups (id, token, event, email, batch)
//! - the conditional check-in update
//! - event insert and lookups
//!
//! Supports in-memory, local file (SurrealKV), URL and cloud connections.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::schema::{EventRow, RegistrationRow};
use crate::storage_traits::{
    CheckInOutcome, EventRecord, QrToken, Registration, RegistrationId, StorageResult,
};
use crate::Result;
use chrono::{DateTime, Utc};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::sql::Datetime as SurrealDatetime;
use surrealdb::Surreal;
use tracing::{debug, info, instrument, warn};

const DEFAULT_NAMESPACE: &str = "rsvp";
const DEFAULT_DATABASE: &str = "main";
const DEFAULT_DATA_DIR: &str = ".rsvp/db";

/// Configuration for a remote (cloud) SurrealDB connection
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint URL (e.g., "wss://xxx.aws-use1.surrealdb.cloud")
    pub endpoint: String,
    /// Database username
    pub username: String,
    /// Database password
    pub password: String,
    /// Namespace (default: "rsvp")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl CloudConfig {
    /// Read the remote connection settings from the process environment.
    ///
    /// `SURREALDB_ENDPOINT`, `SURREALDB_USERNAME` and `SURREALDB_PASSWORD`
    /// are required. `SURREALDB_NAMESPACE` and `SURREALDB_DATABASE` default
    /// to `rsvp` / `main`; `SURREALDB_ROOT=true` signs in as a root user.
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(
        var: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, String> {
        let required = |key: &str| var(key).ok_or_else(|| format!("{key} not set"));
        Ok(Self {
            endpoint: required("SURREALDB_ENDPOINT")?,
            username: required("SURREALDB_USERNAME")?,
            password: required("SURREALDB_PASSWORD")?,
            namespace: var("SURREALDB_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            database: var("SURREALDB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            is_root: var("SURREALDB_ROOT").is_some_and(|v| v.eq_ignore_ascii_case("true")),
        })
    }
}

/// SurrealDB connection handle for the RSVP store
#[derive(Clone)]
pub struct SurrealHandle {
    db: Surreal<Any>,
}

impl SurrealHandle {
    /// Connect to SurrealDB in-memory and set up schema
    #[instrument(skip_all)]
    pub async fn setup_db() -> Result<Self> {
        info!("Connecting to SurrealDB (in-memory)");
        Self::setup_url("mem://").await
    }

    /// Connect to any URL understood by `engine::any` (`mem://`,
    /// `surrealkv://path`, `ws://host:port`, ...)
    #[instrument]
    pub async fn setup_url(url: &str) -> Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(DEFAULT_NAMESPACE)
            .use_db(DEFAULT_DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealDB connected and schema initialized");
        Ok(SurrealHandle { db })
    }

    /// Open (or create) a local SurrealKV database under `dir`
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub async fn setup_local(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Self::setup_url(&format!("surrealkv://{}", dir.display())).await
    }

    /// Connect to SurrealDB Cloud
    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
    pub async fn setup_cloud(config: CloudConfig) -> Result<Self> {
        info!("Connecting to SurrealDB Cloud (root={})", config.is_root);

        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
            })?;

        if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("Root authentication failed: {}", e)))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| {
                StateError::Connection(format!("Database authentication failed: {}", e))
            })?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to select namespace/database: {}", e))
            })?;

        migrations::init_schema(&db).await?;

        info!("SurrealDB Cloud connected and schema initialized");
        Ok(SurrealHandle { db })
    }

    /// Connect using environment variables
    ///
    /// If SURREALDB_ENDPOINT is set, connects to cloud.
    /// If SURREALDB_URL is set, connects to that URL.
    /// Otherwise, opens a local database in RSVP_DATA_DIR (default `.rsvp/db`).
    #[instrument(skip_all)]
    pub async fn setup_from_env() -> Result<Self> {
        if let Ok(config) = CloudConfig::from_env() {
            info!("Cloud config found, connecting to SurrealDB Cloud");
            return Self::setup_cloud(config).await;
        }

        if let Ok(url) = std::env::var("SURREALDB_URL") {
            info!("SURREALDB_URL found, connecting to {}", url);
            return Self::setup_url(&url).await;
        }

        let dir = std::env::var("RSVP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
        info!(
            "No cloud config or SURREALDB_URL found, using local persistence in {}",
            dir.display()
        );
        Self::setup_local(dir).await
    }

    // ========== Registration Operations ==========

    /// Insert a registration; unique index violations surface as
    /// `StorageError::UniqueViolation`.
    #[instrument(skip(self, registration), fields(registration_id = %registration.id, event_id = %registration.event_id))]
    pub async fn registration_insert(&self, registration: Registration) -> StorageResult<Registration> {
        debug!("Inserting registration");

        let row = RegistrationRow::from(registration);
        let created: Option<RegistrationRow> = self
            .db
            .create("registrations")
            .content(row)
            .await
            .map_err(StorageError::from_surreal)?;

        created
            .map(Registration::from)
            .ok_or_else(|| StorageError::Backend("failed to create registration".to_string()))
    }

    /// Get a registration by id
    #[instrument(skip(self), fields(registration_id = %id))]
    pub async fn registration_get(&self, id: &RegistrationId) -> StorageResult<Option<Registration>> {
        let rows = self
            .select_registrations(
                "SELECT * FROM registrations WHERE registration_id = $value",
                id.0.clone(),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Get a registration by QR token
    #[instrument(skip(self, token))]
    pub async fn registration_by_token(&self, token: &QrToken) -> StorageResult<Option<Registration>> {
        let rows = self
            .select_registrations(
                "SELECT * FROM registrations WHERE qr_token = $value",
                token.as_str().to_string(),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// All registrations for an event, oldest first
    #[instrument(skip(self))]
    pub async fn registrations_for_event(&self, event_id: &str) -> StorageResult<Vec<Registration>> {
        self.select_registrations(
            "SELECT * FROM registrations WHERE event_id = $value ORDER BY created_at",
            event_id.to_string(),
        )
        .await
    }

    /// All registrations for an email, optionally excluding one event
    #[instrument(skip(self, email))]
    pub async fn registrations_for_email(
        &self,
        email: &str,
        exclude_event_id: Option<&str>,
    ) -> StorageResult<Vec<Registration>> {
        let mut query = self
            .db
            .query(
                "SELECT * FROM registrations \
                 WHERE email = $email AND ($exclude = NONE OR event_id != $exclude) \
                 ORDER BY created_at",
            )
            .bind(("email", email.to_string()))
            .bind(("exclude", exclude_event_id.map(str::to_string)))
            .await
            .map_err(StorageError::from_surreal)?;

        let rows: Vec<RegistrationRow> = query.take(0).map_err(StorageError::from_surreal)?;
        Ok(rows.into_iter().map(Registration::from).collect())
    }

    /// Histories for several emails in one round trip
    #[instrument(skip(self, emails), fields(emails = emails.len()))]
    pub async fn registration_histories(
        &self,
        emails: &[String],
        exclude_event_id: Option<&str>,
    ) -> StorageResult<HashMap<String, Vec<Registration>>> {
        let mut histories: HashMap<String, Vec<Registration>> = emails
            .iter()
            .map(|email| (email.clone(), Vec::new()))
            .collect();
        if emails.is_empty() {
            return Ok(histories);
        }

        let mut query = self
            .db
            .query(
                "SELECT * FROM registrations \
                 WHERE email INSIDE $emails AND ($exclude = NONE OR event_id != $exclude) \
                 ORDER BY created_at",
            )
            .bind(("emails", emails.to_vec()))
            .bind(("exclude", exclude_event_id.map(str::to_string)))
            .await
            .map_err(StorageError::from_surreal)?;

        let rows: Vec<RegistrationRow> = query.take(0).map_err(StorageError::from_surreal)?;
        for row in rows {
            let registration = Registration::from(row);
            histories
                .entry(registration.email.clone())
                .or_default()
                .push(registration);
        }
        debug!("Fetched histories for {} emails", histories.len());
        Ok(histories)
    }

    /// Flip `checked_in` to true iff it is currently false.
    ///
    /// The WHERE clause carries the `checked_in = false` guard, so the
    /// update and the check happen in one statement.
    #[instrument(skip(self, at), fields(registration_id = %id))]
    pub async fn registration_check_in(
        &self,
        id: &RegistrationId,
        at: DateTime<Utc>,
    ) -> StorageResult<CheckInOutcome> {
        let result = self
            .db
            .query(
                "UPDATE registrations SET checked_in = true, checked_in_at = $at \
                 WHERE registration_id = $rid AND checked_in = false RETURN AFTER",
            )
            .bind(("at", SurrealDatetime::from(at)))
            .bind(("rid", id.0.clone()))
            .await
            .and_then(|mut response| response.take::<Vec<RegistrationRow>>(0));

        let updated = match result {
            Ok(rows) => rows,
            Err(e) => {
                let err = StorageError::from_surreal(e);
                // A write-write conflict means another caller committed first.
                if is_retryable_conflict(&err) {
                    warn!("Check-in write conflicted, re-reading row");
                    return match self.registration_get(id).await? {
                        Some(row) if row.checked_in => Ok(CheckInOutcome::AlreadyCheckedIn(row)),
                        _ => Err(err),
                    };
                }
                return Err(err);
            }
        };

        if let Some(row) = updated.into_iter().next() {
            info!("Registration checked in");
            return Ok(CheckInOutcome::Transitioned(Registration::from(row)));
        }

        match self.registration_get(id).await? {
            Some(existing) => {
                debug!("Registration was already checked in");
                Ok(CheckInOutcome::AlreadyCheckedIn(existing))
            }
            None => Err(StorageError::RegistrationNotFound { id: id.0.clone() }),
        }
    }

    // ========== Event Operations ==========

    /// Insert an event
    #[instrument(skip(self, event), fields(event_id = %event.id, slug = %event.slug))]
    pub async fn event_insert(&self, event: EventRecord) -> StorageResult<EventRecord> {
        debug!("Inserting event");

        let created: Option<EventRow> = self
            .db
            .create("events")
            .content(EventRow::from(event))
            .await
            .map_err(StorageError::from_surreal)?;

        created
            .map(EventRecord::from)
            .ok_or_else(|| StorageError::Backend("failed to create event".to_string()))
    }

    /// Get an event by id
    #[instrument(skip(self))]
    pub async fn event_get(&self, id: &str) -> StorageResult<Option<EventRecord>> {
        let mut result = self
            .db
            .query("SELECT * FROM events WHERE event_id = $id")
            .bind(("id", id.to_string()))
            .await
            .map_err(StorageError::from_surreal)?;

        let rows: Vec<EventRow> = result.take(0).map_err(StorageError::from_surreal)?;
        Ok(rows.into_iter().next().map(EventRecord::from))
    }

    /// All events ordered by date
    #[instrument(skip(self))]
    pub async fn event_list(&self) -> StorageResult<Vec<EventRecord>> {
        let mut result = self
            .db
            .query("SELECT * FROM events ORDER BY date")
            .await
            .map_err(StorageError::from_surreal)?;

        let rows: Vec<EventRow> = result.take(0).map_err(StorageError::from_surreal)?;
        Ok(rows.into_iter().map(EventRecord::from).collect())
    }

    // -- private helpers -----------------------------------------------------

    async fn select_registrations(
        &self,
        sql: &'static str,
        value: String,
    ) -> StorageResult<Vec<Registration>> {
        let mut result = self
            .db
            .query(sql)
            .bind(("value", value))
            .await
            .map_err(StorageError::from_surreal)?;

        let rows: Vec<RegistrationRow> = result.take(0).map_err(StorageError::from_surreal)?;
        Ok(rows.into_iter().map(Registration::from).collect())
    }
}

fn is_retryable_conflict(err: &StorageError) -> bool {
    matches!(err, StorageError::Backend(msg) if msg.contains("can be retried"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_traits::Attendance;

    fn registration(event_id: &str, email: &str, token: &str) -> Registration {
        Registration::new(event_id, "Guest", email, Attendance::Yes, QrToken::new(token))
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn cloud_config_defaults_namespace_and_database() {
        let config = CloudConfig::from_vars(vars(&[
            ("SURREALDB_ENDPOINT", "wss://db.example.org"),
            ("SURREALDB_USERNAME", "door"),
            ("SURREALDB_PASSWORD", "secret"),
            ("SURREALDB_ROOT", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.namespace, "rsvp");
        assert_eq!(config.database, "main");
        assert!(config.is_root);
    }

    #[test]
    fn cloud_config_requires_credentials() {
        let err = CloudConfig::from_vars(vars(&[("SURREALDB_ENDPOINT", "wss://db.example.org")]))
            .unwrap_err();
        assert_eq!(err, "SURREALDB_USERNAME not set");
    }

    #[tokio::test]
    async fn test_surreal_connection_and_schema_creation() {
        let handle = SurrealHandle::setup_db().await;
        assert!(handle.is_ok(), "Failed to connect: {:?}", handle.err());
    }

    #[tokio::test]
    async fn test_registration_insert_and_lookup_by_token() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let reg = registration("evt-1", "a@example.edu", "QR_tokenAAAAAA");

        let saved = handle.registration_insert(reg.clone()).await.unwrap();
        assert_eq!(saved.id, reg.id);

        let found = handle
            .registration_by_token(&QrToken::new("QR_tokenAAAAAA"))
            .await
            .unwrap()
            .expect("registration by token");
        assert_eq!(found.email, "a@example.edu");
        assert!(!found.checked_in);
    }

    #[tokio::test]
    async fn test_email_lookup_excludes_event() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        handle
            .registration_insert(registration("evt-1", "b@example.edu", "QR_b1"))
            .await
            .unwrap();
        handle
            .registration_insert(registration("evt-2", "b@example.edu", "QR_b2"))
            .await
            .unwrap();

        let all = handle
            .registrations_for_email("b@example.edu", None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let others = handle
            .registrations_for_email("b@example.edu", Some("evt-1"))
            .await
            .unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].event_id, "evt-2");
    }

    #[tokio::test]
    async fn test_check_in_is_conditional() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let reg = handle
            .registration_insert(registration("evt-1", "c@example.edu", "QR_c1"))
            .await
            .unwrap();

        let first_at = Utc::now();
        let first = handle.registration_check_in(&reg.id, first_at).await.unwrap();
        assert!(first.is_transition());

        let second = handle
            .registration_check_in(&reg.id, first_at + chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert!(!second.is_transition());
        assert_eq!(
            second.registration().checked_in_at.map(|t| t.timestamp_millis()),
            Some(first_at.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn test_check_in_unknown_id_is_not_found() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let err = handle
            .registration_check_in(&RegistrationId::from("missing"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::RegistrationNotFound { id } if id == "missing"));
    }
}
