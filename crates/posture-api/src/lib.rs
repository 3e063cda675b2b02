//! # Posture-API
//!
//! Client-facing layer of the posture coach: one [`Connection`] per
//! monitoring client, speaking a JSON message protocol.
//!
//! ## Client actions
//!
//! - `set_profile` - install a previously stored calibration profile
//! - `calibrate_landmarks` - feed one calibration frame
//! - `process_landmarks` - analyze one frame of the active session
//! - `start_session` / `stop_session` - session lifecycle
//! - `toggle_audio` - mute or unmute alert sounds
//! - `update_session_stats` - client-measured good/bad seconds
//! - `log_posture` - persist a posture snapshot
//! - `pong` - keepalive reply
//!
//! Every inbound message passes the size check, the rate limiter and
//! sanitization before it reaches the analysis core.

pub mod config;
pub mod connection;
pub mod protocol;
pub mod rate_limit;
pub mod sanitize;

pub use config::*;
pub use connection::*;
pub use protocol::*;
pub use rate_limit::*;
