use std::time::Duration;

/// Timing knobs for a form session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Quiet period after the last edit before the draft is written.
    pub autosave_debounce: Duration,
    /// How long the "saved" indicator stays up before reverting to idle.
    pub saved_display: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_debounce: Duration::from_secs(30),
            saved_display: Duration::from_secs(3),
        }
    }
}
