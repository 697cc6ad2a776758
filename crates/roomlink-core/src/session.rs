//! Session guard.
//!
//! Tracks whether the authentication session backing the room is still
//! usable. Expiry is sticky: once latched it only clears through an explicit
//! re-authentication, never through time passing or network events.

use crate::env::MonotonicInstant;

/// Snapshot of session validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionValidity<I> {
    /// Expiry latched
    pub is_expired: bool,
    /// Token expiry time, if the auth collaborator reported one
    pub expires_at: Option<I>,
}

/// Owner of the sticky session-expired flag.
#[derive(Debug, Clone)]
pub struct SessionGuard<I> {
    validity: SessionValidity<I>,
}

impl<I: MonotonicInstant> Default for SessionGuard<I> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<I: MonotonicInstant> SessionGuard<I> {
    /// Guard for a valid session, optionally with a known token expiry.
    pub fn new(expires_at: Option<I>) -> Self {
        Self { validity: SessionValidity { is_expired: false, expires_at } }
    }

    /// Current validity snapshot.
    pub fn validity(&self) -> SessionValidity<I> {
        self.validity
    }

    /// Whether expiry has been latched.
    pub fn is_expired(&self) -> bool {
        self.validity.is_expired
    }

    /// Whether the session is usable at `now`.
    ///
    /// False once expiry is latched or once `now` reaches the known token
    /// expiry, even before [`SessionGuard::poll`] latches it.
    pub fn is_valid(&self, now: I) -> bool {
        !self.validity.is_expired && self.validity.expires_at.is_none_or(|at| now < at)
    }

    /// Known token expiry that has not been latched yet.
    pub fn next_deadline(&self) -> Option<I> {
        if self.validity.is_expired { None } else { self.validity.expires_at }
    }

    /// Auth collaborator reported the token expired.
    ///
    /// Returns `true` if this latched a previously valid session.
    pub fn on_token_expired(&mut self) -> bool {
        if self.validity.is_expired {
            return false;
        }
        self.validity.is_expired = true;
        tracing::info!("session expired, reconnection suspended");
        true
    }

    /// Latch expiry if the known token expiry has passed.
    ///
    /// Returns `true` if this latched a previously valid session.
    pub fn poll(&mut self, now: I) -> bool {
        match self.validity.expires_at {
            Some(at) if !self.validity.is_expired && now >= at => self.on_token_expired(),
            _ => false,
        }
    }

    /// User re-authenticated and the auth collaborator issued a new token.
    ///
    /// The only way to clear a latched expiry. Returns `true` if the session
    /// was expired.
    pub fn on_token_renewed(&mut self, expires_at: Option<I>) -> bool {
        let was_expired = self.validity.is_expired;
        self.validity = SessionValidity { is_expired: false, expires_at };
        if was_expired {
            tracing::info!("session renewed");
        }
        was_expired
    }
}
