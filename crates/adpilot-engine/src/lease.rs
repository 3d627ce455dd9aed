//! Exclusive tick lease.
//!
//! There is exactly one tick in flight per deployment. For single-node
//! deployments the lease is process-local; the TTL means a holder that dies
//! mid-tick (or hangs past its deadline) releases ownership without help.
//! Approval handling takes the same lease, which is what serialises it with
//! ticks.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct LeaseState {
    holder: Uuid,
    expires_at: DateTime<Utc>,
}

pub struct Lease {
    ttl: Duration,
    state: Mutex<Option<LeaseState>>,
}

/// Releases the lease on drop.
pub struct LeaseGuard<'a> {
    lease: &'a Lease,
    token: Uuid,
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        self.lease.release(self.token);
    }
}

impl Lease {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Try to acquire the lease at `now`. Fails while a live holder exists;
    /// an expired holder is evicted.
    pub fn try_acquire(&self, now: DateTime<Utc>) -> Option<LeaseGuard<'_>> {
        let mut state = self.state.lock();
        match *state {
            Some(current) if current.expires_at > now => None,
            _ => {
                let token = Uuid::new_v4();
                *state = Some(LeaseState {
                    holder: token,
                    expires_at: now + self.ttl,
                });
                Some(LeaseGuard { lease: self, token })
            }
        }
    }

    pub fn is_held(&self, now: DateTime<Utc>) -> bool {
        self.state
            .lock()
            .is_some_and(|s| s.expires_at > now)
    }

    fn release(&self, token: Uuid) {
        let mut state = self.state.lock();
        if state.is_some_and(|s| s.holder == token) {
            *state = None;
        }
    }
}
