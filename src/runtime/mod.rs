//! The playback session and its configuration.
//!
//! # Example
//!
//! ```
//! use tonebridge::runtime::{PlaybackSession, PlaybackState, SessionConfig};
//!
//! let mut session = PlaybackSession::new(SessionConfig::default()).unwrap();
//! session.start_song().unwrap();
//! assert_eq!(session.state(), PlaybackState::Running);
//!
//! // Drive the clock; whatever came due is played
//! let played = session.advance(0.25).unwrap();
//! assert!(!played.is_empty());
//! ```

mod config;
mod session;

pub use config::SessionConfig;
pub use session::{PlaybackSession, PlaybackState, SessionError};
