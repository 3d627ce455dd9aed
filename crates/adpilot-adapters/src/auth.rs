//! Refresh-token state machine with single-flight refresh.
//!
//! On `AuthExpired` the adapter attempts one background refresh; concurrent
//! callers wait on the in-flight refresh result instead of racing their own.

use chrono::{DateTime, Utc};
use std::future::Future;
use tokio::sync::Mutex;
use tracing::{debug, info};

use adpilot_core::AdapterError;

#[derive(Debug, Clone)]
struct TokenState {
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    /// Bumped on every successful refresh so callers can tell whether a
    /// refresh already happened while they were waiting for the lock.
    generation: u64,
}

/// Access-token holder shared by all calls of one adapter.
pub struct TokenGuard {
    state: Mutex<TokenState>,
}

impl TokenGuard {
    pub fn new(initial_token: Option<String>) -> Self {
        Self {
            state: Mutex::new(TokenState {
                access_token: initial_token,
                expires_at: None,
                generation: 0,
            }),
        }
    }

    /// The current token and its generation, if any.
    pub async fn current(&self) -> Option<(String, u64)> {
        let state = self.state.lock().await;
        let expired = state
            .expires_at
            .is_some_and(|exp| exp <= Utc::now());
        if expired {
            return None;
        }
        state
            .access_token
            .clone()
            .map(|t| (t, state.generation))
    }

    /// Refresh the token unless another caller already did. `seen_generation`
    /// is the generation of the token the caller just saw rejected; holding
    /// the state lock across the refresh future is what makes this
    /// single-flight: later callers block here and then observe the fresh
    /// token without issuing their own refresh.
    pub async fn refresh<F, Fut>(
        &self,
        seen_generation: u64,
        refresh_fn: F,
    ) -> Result<String, AdapterError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(String, DateTime<Utc>), AdapterError>>,
    {
        let mut state = self.state.lock().await;

        if state.generation > seen_generation {
            if let Some(ref token) = state.access_token {
                debug!("token already refreshed by a concurrent caller");
                return Ok(token.clone());
            }
        }

        let (token, expires_at) = refresh_fn().await?;
        state.access_token = Some(token.clone());
        state.expires_at = Some(expires_at);
        state.generation += 1;
        info!(generation = state.generation, "access token refreshed");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn refresh_installs_token() {
        let guard = TokenGuard::new(None);
        assert!(guard.current().await.is_none());

        let token = guard
            .refresh(0, || async {
                Ok(("tok-1".to_string(), Utc::now() + chrono::Duration::hours(1)))
            })
            .await
            .unwrap();
        assert_eq!(token, "tok-1");
        assert_eq!(guard.current().await.unwrap().0, "tok-1");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let guard = Arc::new(TokenGuard::new(Some("stale".into())));
        let refreshes = Arc::new(AtomicU32::new(0));

        let (_, gen) = guard.current().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let guard = Arc::clone(&guard);
            let refreshes = Arc::clone(&refreshes);
            handles.push(tokio::spawn(async move {
                guard
                    .refresh(gen, move || {
                        let refreshes = Arc::clone(&refreshes);
                        async move {
                            refreshes.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                            Ok(("fresh".to_string(), Utc::now() + chrono::Duration::hours(1)))
                        }
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), "fresh");
        }
        // First caller refreshes; the other three see the bumped generation.
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_reads_as_absent() {
        let guard = TokenGuard::new(None);
        guard
            .refresh(0, || async {
                Ok(("tok".to_string(), Utc::now() - chrono::Duration::minutes(1)))
            })
            .await
            .unwrap();
        assert!(guard.current().await.is_none());
    }
}
