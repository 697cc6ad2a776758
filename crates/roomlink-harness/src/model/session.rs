//! Reference model of session expiry.
//!
//! A deliberately naive restatement of the session rules, tracked alongside
//! the real system and compared after every operation.

use std::time::Duration;

/// Expected session banner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionModel {
    latched: bool,
    acknowledged: bool,
    /// Token expiry as an offset from the start of the run
    expires_at: Option<Duration>,
}

impl SessionModel {
    /// Token expired, by notification or by its known lifetime running out.
    pub fn expire(&mut self) {
        if !self.latched {
            self.latched = true;
            self.acknowledged = false;
        }
    }

    /// New token issued at `elapsed` with an optional lifetime.
    pub fn renew(&mut self, elapsed: Duration, lifetime: Option<Duration>) {
        self.latched = false;
        self.acknowledged = false;
        self.expires_at = lifetime.map(|lifetime| elapsed + lifetime);
    }

    /// User dismissed the banner.
    pub fn acknowledge(&mut self) {
        if self.latched {
            self.acknowledged = true;
        }
    }

    /// Time advanced to `elapsed`.
    pub fn advance(&mut self, elapsed: Duration) {
        if self.expires_at.is_some_and(|at| elapsed >= at) {
            self.expire();
        }
    }

    /// Whether the session is unusable.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Whether the banner should be shown.
    pub fn banner(&self) -> bool {
        self.latched && !self.acknowledged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledge_hides_banner_but_keeps_latch() {
        let mut model = SessionModel::default();
        model.expire();
        model.acknowledge();

        assert!(!model.banner());
        assert!(model.is_latched());
    }

    #[test]
    fn lifetime_runs_out() {
        let mut model = SessionModel::default();
        model.renew(Duration::from_secs(10), Some(Duration::from_secs(5)));

        model.advance(Duration::from_secs(14));
        assert!(!model.is_latched());
        model.advance(Duration::from_secs(15));
        assert!(model.banner());
    }
}
