//! Error types shared across Jankscope crates.

/// Top-level error type for Jankscope operations.
#[derive(Debug, thiserror::Error)]
pub enum JankscopeError {
    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Gesture error: {message}")]
    Gesture { message: String },

    #[error("State machine error: {message}")]
    StateMachine { message: String },

    #[error("Grid error: {message}")]
    Grid { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using JankscopeError.
pub type JankscopeResult<T> = Result<T, JankscopeError>;

impl JankscopeError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn gesture(msg: impl Into<String>) -> Self {
        Self::Gesture {
            message: msg.into(),
        }
    }

    pub fn state_machine(msg: impl Into<String>) -> Self {
        Self::StateMachine {
            message: msg.into(),
        }
    }

    pub fn grid(msg: impl Into<String>) -> Self {
        Self::Grid {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline {
            message: msg.into(),
        }
    }

    /// Whether this error must terminate the enclosing source pipeline.
    ///
    /// Record-level parse faults and failed gestures are reported and
    /// skipped; everything else is an upstream or programmer bug.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            JankscopeError::Parse { .. } | JankscopeError::Gesture { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_gesture_faults_are_recoverable() {
        assert!(!JankscopeError::parse("bad payload").is_fatal());
        assert!(!JankscopeError::gesture("move in empty state").is_fatal());
        assert!(JankscopeError::state_machine("untracked pointer").is_fatal());
        assert!(JankscopeError::grid("position out of range").is_fatal());
    }
}
