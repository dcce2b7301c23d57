//! # Outbound Contact Distribution Engine
//!
//! This crate assigns outbound call-list records ("contacts") to agents under
//! per-attribute quota constraints, guarantees that at most one agent works a
//! contact at any time, and recycles qualified contacts for another attempt.
//!
//! ## Features
//!
//! - **Distribution**: FIFO allocation of the next eligible contact, with
//!   claim-and-skip so concurrent agents never receive the same contact
//! - **Locking**: re-entrant per-contact locks, bulk release on agent
//!   eviction and a stale lock sweep
//! - **Quotas**: ordered predicate rules with row-scoped counters
//! - **Qualification & Recycling**: outcome recording, relaunch gating and
//!   bulk re-queueing of recyclable outcomes
//! - **Import**: batch ingestion with phone validation and composite-key
//!   deduplication
//! - **Change Notification**: a campaign snapshot published after every
//!   committed mutation
//!
//! ## Architecture
//!
//! - [`engine`]: the [`DialerEngine`] entry point and its operations
//! - [`quota`]: pure quota rule evaluation
//! - [`database`]: SQLite storage via sqlx
//! - [`model`]: plain data types
//! - [`notifier`]: post-commit change events
//! - [`config`], [`logging`], [`error`]: ambient plumbing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dialer_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let engine = DialerEngine::in_memory().await?;
//!
//!     let campaign = engine.create_campaign(NewCampaign::named("Spring renewals")).await?;
//!     engine
//!         .import_batch(
//!             &campaign.id,
//!             vec![NewContact::with_phone("0612345678")],
//!             &DedupConfig::on(vec![ContactField::PhoneNumber]),
//!         )
//!         .await?;
//!
//!     if let Some(allocation) = engine.pick_next(&campaign.id, "agent-1").await? {
//!         println!("calling {}", allocation.contact.phone_number);
//!     }
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod logging;

// Domain
pub mod model;
pub mod quota;
pub mod validation;

// Storage and orchestration
pub mod database;
pub mod engine;
pub mod notifier;

// Re-exports for convenience
pub use config::DialerConfig;
pub use database::DialerDatabase;
pub use engine::DialerEngine;
pub use error::{DialerError, ErrorKind, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AllocationConfig, DatabaseConfig, DialerConfig, ImportConfig, LockConfig, LogSettings};
    pub use crate::engine::{
        Allocation, DedupConfig, DialerEngine, ImportReport, QualifyOutcome, QualifyRequest, RejectReason,
        RejectedRow, ReleaseSummary,
    };
    pub use crate::error::{DialerError, ErrorKind, Result};
    pub use crate::model::*;
    pub use crate::notifier::{BroadcastNotifier, ChangeEvent, ChangeKind, ChangeNotifier, NoopNotifier};
    pub use crate::DialerDatabase;
}
