//! Backup retention enforcement.
//!
//! Promotes the most recent root-level backup artifact into a retention tier
//! (daily, weekly, monthly, yearly) and prunes that tier down to a configured
//! size, over any [`Store`] backend.
//!
//! ## Architecture
//!
//! - `artifact`: the artifact model and creation-time ordering
//! - `store`: the list/copy/delete contract plus local and remote backends
//! - `config`: tier and comparison-mode enumerations
//! - `policy`: validated retention policy
//! - `enforcer`: the promote-then-prune algorithm and its run report
//!
//! ## Usage
//!
//! ```no_run
//! use retention::{LocalStore, RetentionPolicy};
//!
//! # async fn run() -> Result<(), retention::RetentionError> {
//! let store = LocalStore::new("/var/backups");
//! let policy = RetentionPolicy::new("daily", "count", 7)?;
//!
//! let report = policy.enforce(&store).await?;
//! println!("deleted {} artifacts", report.deleted.len());
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod config;
pub mod enforcer;
pub mod error;
pub mod policy;
pub mod store;

// Re-export commonly used types
pub use artifact::{Artifact, order_newest_first, sort_by_created};
pub use config::{ComparisonMode, Tier};
pub use enforcer::{EnforcementReport, Promotion};
pub use error::{RetentionError, Stage, StoreError};
pub use policy::{RetentionPolicy, RetentionPolicyBuilder};
pub use store::{LocalStore, RemoteStore, Store, create_store};
