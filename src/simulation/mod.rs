//! Simulation module for session state and input
//!
//! This module ties together physics and rendering: it owns the lens and
//! the source, reacts to user controls and moves images in and out of files.

pub mod loader;
pub mod session;

// Re-export commonly used items
pub use loader::LoadError;
pub use session::{ControlEvent, Session, SessionError};
