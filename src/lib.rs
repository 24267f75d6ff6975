//! SUDEPmonitor - local cache and heart-rate variability analysis for
//! wearable seizure-monitoring recordings.
//!
//! Users are recorded by a smart watch in sessions holding tri-axial
//! accelerometer and heart-rate traces. This library reads user records
//! from a hierarchical JSON store, caches them on disk, and derives
//! windowed statistics from them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        sudep-monitor                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │ RemoteStore │──▶│  Assembly   │──▶│ LocalCache  │         │
//! │  │ (JSON tree) │   │ (UserRecord)│   │ (JSON files)│         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │         │                                    │               │
//! │         ▼                                    ▼               │
//! │  ┌─────────────┐               ┌──────────────────────────┐  │
//! │  │    User     │               │ Windowing ─▶ HRV (CSI)   │  │
//! │  │  Directory  │               │           ─▶ Detection   │  │
//! │  └─────────────┘               └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sudep_monitor::{BlockingFirebaseStore, Config, HrvAnalyzer, LocalCache, UserDirectory};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let store = BlockingFirebaseStore::new(config.remote_config())?;
//! let cache = LocalCache::new(&config.cache_dir, UserDirectory::fetch(&store)?);
//!
//! if let Some(user) = cache.fetch(&store, "SM36", false)? {
//!     let analyzer = HrvAnalyzer::default();
//!     for session in user.sessions.values() {
//!         if let Some(heart) = session.heart_data.as_present() {
//!             let trace = analyzer.csi_trace(heart)?;
//!             println!("{} CSI values", trace.values.len());
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod directory;
pub mod error;
pub mod model;
pub mod remote;

// Re-export key types at crate root for convenience
pub use cache::{FetchMany, LocalCache, CACHE_FORMAT_VERSION};
pub use config::{Config, ConfigError};
pub use core::{
    csi, DateKey, EventDetector, HrvAnalyzer, VarianceSummary, VarianceTable,
    ZeroDispersionPolicy,
};
pub use directory::UserDirectory;
pub use error::{AssemblyError, CacheError, DateKeyError, RemoteError, StatsError};
pub use model::{AccelData, Channel, Events, HeartData, ProfileRecord, SessionRecord, UserRecord};
pub use remote::{BlockingFirebaseStore, FirebaseClient, JsonTreeStore, RemoteConfig, RemoteStore};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
