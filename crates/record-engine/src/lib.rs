//! Zoomcast Record Engine
//!
//! Sequences one recording session from start to finished artifact.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │               SessionController                  │
//! │   set_target / push_video / push_audio / finish  │
//! │                      │                           │
//! │          bounded command queue (serialized)      │
//! │                      ▼                           │
//! │              RecordingSession                    │
//! │  ┌────────────┐ ┌───────────────┐ ┌───────────┐  │
//! │  │ Crop       │ │ Frame         │ │ Media     │  │
//! │  │ Transition │►│ Transform     │►│ Sink      │  │
//! │  └────────────┘ └───────────────┘ └───────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The command queue is the single-writer discipline of the design: crop
//! target updates and frame delivery may originate on different threads,
//! but they reach the session state strictly serialized, so a target
//! update is visible atomically to the next frame's `advance`.

pub mod controller;
pub mod session;

pub use controller::SessionController;
pub use session::{RecordingSession, SessionConfig, SessionState, SessionStats};
