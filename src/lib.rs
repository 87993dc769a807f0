//! reelcache: serial-windowed template fetch, cache, and navigation.
//!
//! Templates live on a remote server, addressed by a dense-ish serial
//! number per (category, religion) scope. The engine fetches them in
//! fixed-size serial windows, merges results into an index-addressable
//! batch cache that can represent "confirmed absent", and publishes the
//! gap-free visible prefix to subscribers while a navigator moves over
//! the serial index with wraparound.
//!
//! Typical use:
//!
//! ```no_run
//! use reelcache::{EngineConfig, TemplateEngine};
//! use reelcache::models::{ReligionFilter, Scope};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut engine = TemplateEngine::with_http_gateway(EngineConfig::from_env())?;
//! engine.activate_scope(Scope::new("congratulations", ReligionFilter::All)).await;
//!
//! let mut display = engine.subscribe_display();
//! engine.next();
//! engine.poll_completions();
//! println!("{} templates visible", display.borrow_and_update().len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod models;
pub mod prefs;

pub use api::{GatewayError, HttpTemplateGateway, TemplateGateway};
pub use cache::{BatchCache, CacheSlot, Window};
pub use config::EngineConfig;
pub use engine::{CategorySerialIndex, EnginePhase, SerialNavigator, TemplateEngine};
pub use models::{Scope, TemplateMedia, TemplateRecord};
pub use prefs::{PrefsStore, ScopePreferences};
