//! carepoint-session
//!
//! The form session controller: section progress, debounced draft
//! autosave, and the submission pipeline, wired together by
//! [`session::FormSession`]. External services and the notification
//! surface are traits the host implements.

pub mod autosave;
pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod sections;
pub mod service;
pub mod session;
pub mod submit;
