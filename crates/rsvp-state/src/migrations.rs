//! SurrealDB schema initialization
//!
//! Sets up the `registrations` and `events` tables with the unique indexes
//! the [`crate::RegistrationStore`] contract depends on. Safe to call more
//! than once.

use crate::error::{StateError, UniqueConstraint};
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all RSVP tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing RSVP SurrealDB schema");

    init_registrations_table(db).await?;
    init_events_table(db).await?;

    info!("RSVP schema initialization complete");
    Ok(())
}

/// Initialize `registrations` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE registrations {
///   registration_id:       STRING (unique)
///   event_id:              STRING (indexed)
///   name:                  STRING
///   email:                 STRING (indexed)
///   attendance:            STRING (yes | no | maybe)
///   meal_preference:       STRING?
///   dietary_restrictions:  STRING?
///   team_name:             STRING?
///   qr_token:              STRING (unique)
///   checked_in:            BOOL
///   checked_in_at:         DATETIME?
///   created_at:            DATETIME
/// }
/// ```
///
/// Constraints:
/// - `(event_id, email)` is unique (one RSVP per guest per event)
/// - `qr_token` is unique
/// - `checked_in` only moves false -> true (enforced by the conditional update)
async fn init_registrations_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing registrations table");

    let sql = format!(
        r#"
        DEFINE TABLE IF NOT EXISTS registrations SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS {id_idx} ON TABLE registrations COLUMNS registration_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS {token_idx} ON TABLE registrations COLUMNS qr_token UNIQUE;
        DEFINE INDEX IF NOT EXISTS {pair_idx} ON TABLE registrations COLUMNS event_id, email UNIQUE;

        -- Lookup paths used by the scorer and predictor
        DEFINE INDEX IF NOT EXISTS idx_registration_email ON TABLE registrations COLUMNS email;
        DEFINE INDEX IF NOT EXISTS idx_registration_event ON TABLE registrations COLUMNS event_id;
        "#,
        id_idx = UniqueConstraint::RegistrationId.index_name(),
        token_idx = UniqueConstraint::QrToken.index_name(),
        pair_idx = UniqueConstraint::EventEmail.index_name(),
    );

    db.query(sql)
        .await
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    info!("✓ registrations table initialized");
    Ok(())
}

/// Initialize `events` table
async fn init_events_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing events table");

    let sql = format!(
        r#"
        DEFINE TABLE IF NOT EXISTS events SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS {id_idx} ON TABLE events COLUMNS event_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_event_date ON TABLE events COLUMNS date;
        "#,
        id_idx = UniqueConstraint::EventId.index_name(),
    );

    db.query(sql)
        .await
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    info!("✓ events table initialized");
    Ok(())
}
