//! RSVP - campus event attendance CLI
//!
//! The `rsvp` command drives the attendance engine from a terminal: create
//! events, take registrations, scan guests in at the door and read the
//! organizer reports.
//!
//! ## Commands
//!
//! - `event create|list`: manage events
//! - `register`: RSVP a guest and mint their QR token
//! - `check-in` / `check-in-team`: door check-in by token or by team
//! - `score` / `predict`: commitment score and turnout forecast
//! - `stats` / `teams` / `search`: per-event views
//! - `analytics`: cross-event reports
//!
//! Results are printed to stdout as pretty JSON. Logs go to stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rsvp_core::{
    AttendanceEngine, EventRequest, RegistrationRequest, RegistrationStore,
    SurrealRegistrationStore, DEFAULT_SEARCH_LIMIT,
};
use rsvp_state::SurrealHandle;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, Level};

type Engine = AttendanceEngine<dyn RegistrationStore>;

#[derive(Parser, Debug)]
#[command(name = "rsvp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Campus RSVP attendance engine", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage events
    Event {
        #[command(subcommand)]
        action: EventAction,
    },

    /// Register a guest for an event
    Register {
        /// Event id (UUID)
        #[arg(long)]
        event: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// yes, no or maybe
        #[arg(long, default_value = "yes")]
        attendance: String,

        #[arg(long)]
        meal: Option<String>,

        #[arg(long)]
        dietary: Option<String>,

        #[arg(long)]
        team: Option<String>,
    },

    /// Check a guest in by QR token
    CheckIn {
        token: String,
    },

    /// Check in every member of a team
    CheckInTeam {
        #[arg(long)]
        event: String,

        #[arg(long)]
        team: String,
    },

    /// Show a guest's commitment score
    Score {
        email: String,

        /// Leave this event out of the history
        #[arg(long)]
        exclude_event: Option<String>,
    },

    /// Forecast turnout for an event
    Predict {
        event: String,
    },

    /// Headline numbers for an event
    Stats {
        event: String,
    },

    /// Team rosters for an event
    Teams {
        event: String,
    },

    /// Search guests of an event by name or email
    Search {
        event: String,

        term: String,

        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },

    /// Cross-event reports
    Analytics {
        #[command(subcommand)]
        report: AnalyticsReport,
    },
}

#[derive(Subcommand, Debug)]
enum EventAction {
    /// Create a new event
    Create {
        #[arg(long)]
        slug: String,

        #[arg(long)]
        name: String,

        /// RFC 3339 start time, e.g. 2024-03-09T18:00:00Z
        #[arg(long)]
        date: DateTime<Utc>,

        #[arg(long)]
        capacity: u32,

        #[arg(long)]
        location: Option<String>,
    },

    /// List events by date
    List,
}

#[derive(Subcommand, Debug)]
enum AnalyticsReport {
    /// Yes/maybe/no counts
    Breakdown {
        /// Limit to one event
        #[arg(long)]
        event: Option<String>,
    },

    /// Check-ins per UTC hour
    Hourly {
        #[arg(long)]
        event: Option<String>,
    },

    /// Check-in rate per team (top 10)
    Teams {
        #[arg(long)]
        event: Option<String>,
    },

    /// Confirmed versus attended per event (first 10 by date)
    ShowRate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    rsvp_core::init_tracing(cli.json, level);

    let handle = SurrealHandle::setup_from_env()
        .await
        .context("Failed to connect to RSVP database")?;
    let store: Arc<dyn RegistrationStore> =
        Arc::new(SurrealRegistrationStore::new(Arc::new(handle)));
    let engine = AttendanceEngine::new(store);

    let output = run(&engine, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(engine: &Engine, command: Commands) -> Result<Value> {
    debug!(?command, "Running command");
    match command {
        Commands::Event { action } => match action {
            EventAction::Create {
                slug,
                name,
                date,
                capacity,
                location,
            } => {
                let event = engine
                    .registrations
                    .create_event(EventRequest {
                        slug,
                        name,
                        date,
                        capacity,
                        location,
                    })
                    .await
                    .context("Failed to create event")?;
                to_json(&event)
            }
            EventAction::List => to_json(&engine.store().list_events().await?),
        },
        Commands::Register {
            event,
            name,
            email,
            attendance,
            meal,
            dietary,
            team,
        } => {
            let registration = engine
                .registrations
                .register(RegistrationRequest {
                    event_id: event,
                    name,
                    email,
                    attendance,
                    meal_preference: meal,
                    dietary_restrictions: dietary,
                    team_name: team,
                })
                .await
                .context("Registration failed")?;
            to_json(&registration)
        }
        Commands::CheckIn { token } => {
            let receipt = engine
                .check_in
                .check_in_by_token(&token)
                .await
                .context("Check-in failed")?;
            to_json(&receipt)
        }
        Commands::CheckInTeam { event, team } => {
            let batch = engine
                .check_in
                .check_in_team(&event, &team)
                .await
                .context(format!("Team check-in failed for '{}'", team))?;
            to_json(&batch)
        }
        Commands::Score {
            email,
            exclude_event,
        } => to_json(
            &engine
                .scorer
                .score(&email, exclude_event.as_deref())
                .await?,
        ),
        Commands::Predict { event } => to_json(&engine.predictor.predict(&event).await?),
        Commands::Stats { event } => to_json(&engine.analytics.event_stats(&event).await?),
        Commands::Teams { event } => to_json(&engine.analytics.team_roster(&event).await?),
        Commands::Search { event, term, limit } => to_json(
            &engine
                .analytics
                .search_guests(&event, &term, limit)
                .await?,
        ),
        Commands::Analytics { report } => match report {
            AnalyticsReport::Breakdown { event } => {
                to_json(&engine.analytics.rsvp_breakdown(event.as_deref()).await?)
            }
            AnalyticsReport::Hourly { event } => {
                to_json(&engine.analytics.hourly_check_ins(event.as_deref()).await?)
            }
            AnalyticsReport::Teams { event } => {
                to_json(&engine.analytics.team_performance(event.as_deref()).await?)
            }
            AnalyticsReport::ShowRate => to_json(&engine.analytics.show_rate().await?),
        },
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize output")
}
