//! # Posture-Session
//!
//! Bookkeeping for one monitoring session and the storage seams around it.
//!
//! ## Flow
//!
//! ```text
//! start() ─→ update_stats() per analyzed frame
//!         ─→ set_tracked_time() from client-side timers
//!         ─→ stop() ─→ SessionSummary ─→ SessionStore::save_session
//! ```
//!
//! Per-frame log records go to [`SessionStore::save_log`]; calibration
//! profiles live behind [`ProfileStore`]. [`InMemoryStore`] implements both.
//! A [`SessionReport`] ranks the issues in a session's logs and turns the
//! top ones into workstation advice.

pub mod record;
pub mod report;
pub mod session;
pub mod store;

pub use record::*;
pub use report::*;
pub use session::*;
pub use store::*;
