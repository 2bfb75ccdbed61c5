//! Session state machine.
//!
//! Two states: logged out, or logged in as exactly one user. Anything that
//! needs a user asks the state for an [`ActiveSession`] instead of threading
//! an optional id around.

use crate::{error::Result, Error, UserId};

/// Proof that a user is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveSession {
    user_id: UserId,
}

impl ActiveSession {
    pub fn new(user_id: impl Into<UserId>) -> Result<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(Error::InvalidSession("empty user id".to_string()));
        }
        Ok(Self { user_id })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Current session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    LoggedOut,
    LoggedIn(ActiveSession),
}

/// What a state change did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// LoggedOut -> LoggedIn
    Started(ActiveSession),
    /// LoggedIn -> LoggedIn as a different user
    Replaced {
        previous: ActiveSession,
        current: ActiveSession,
    },
    /// LoggedIn -> LoggedOut
    Ended(ActiveSession),
    /// No state change
    Unchanged,
}

impl SessionState {
    pub fn active(&self) -> Option<&ActiveSession> {
        match self {
            SessionState::LoggedOut => None,
            SessionState::LoggedIn(session) => Some(session),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionState::LoggedIn(_))
    }

    /// Enter the logged-in state for `user_id`.
    pub fn log_in(&mut self, user_id: impl Into<UserId>) -> Result<Transition> {
        let next = ActiveSession::new(user_id)?;
        let previous = std::mem::replace(self, SessionState::LoggedIn(next.clone()));
        Ok(match previous {
            SessionState::LoggedOut => Transition::Started(next),
            SessionState::LoggedIn(prev) if prev == next => Transition::Unchanged,
            SessionState::LoggedIn(prev) => Transition::Replaced {
                previous: prev,
                current: next,
            },
        })
    }

    /// Enter the logged-out state.
    pub fn log_out(&mut self) -> Transition {
        match std::mem::take(self) {
            SessionState::LoggedOut => Transition::Unchanged,
            SessionState::LoggedIn(prev) => Transition::Ended(prev),
        }
    }
}
