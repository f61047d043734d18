//! Remote-store reachability as seen by one session.
//!
//! The state starts `Unreachable`. Only [`crate::store::FailoverStore`] mutates it:
//! any remote I/O failure moves it to `Unreachable`, and only an explicit successful
//! connect moves it back to `Reachable`. There is no timed retry.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Reachable,
    Unreachable,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reachable => "reachable",
            Self::Unreachable => "unreachable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    status: ConnectionStatus,
    last_error: Option<String>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Unreachable,
            last_error: None,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_reachable(&self) -> bool {
        self.status == ConnectionStatus::Reachable
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn mark_reachable(&mut self) {
        self.status = ConnectionStatus::Reachable;
        self.last_error = None;
    }

    pub(crate) fn mark_unreachable(&mut self, error: impl Into<String>) {
        self.status = ConnectionStatus::Unreachable;
        self.last_error = Some(error.into());
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionState, ConnectionStatus};

    #[test]
    fn starts_unreachable_without_error() {
        let state = ConnectionState::new();
        assert_eq!(state.status(), ConnectionStatus::Unreachable);
        assert!(state.last_error().is_none());
    }

    #[test]
    fn failure_records_error_and_success_clears_it() {
        let mut state = ConnectionState::new();
        state.mark_reachable();
        assert!(state.is_reachable());

        state.mark_unreachable("connection refused");
        assert!(!state.is_reachable());
        assert_eq!(state.last_error(), Some("connection refused"));

        state.mark_reachable();
        assert!(state.last_error().is_none());
    }
}
