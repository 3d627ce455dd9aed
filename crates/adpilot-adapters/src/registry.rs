//! The adapter registry: a plain value holding concrete adapter instances
//! keyed by platform, built explicitly from config and passed into the
//! engine at construction. No ambient globals.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use adpilot_core::PlatformId;
use adpilot_config::PilotConfig;

use crate::adapter::{HealthStatus, PlatformAdapter};
use crate::google::GoogleAdsAdapter;
use crate::http::PlatformClient;
use crate::linkedin::LinkedinAdsAdapter;
use crate::meta::MetaAdsAdapter;
use crate::mock::MockAdapter;
use crate::normalize::FxTable;
use crate::ratelimit::TokenBucket;
use crate::tiktok::TiktokAdsAdapter;

pub struct AdapterRegistry {
    adapters: HashMap<PlatformId, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Build the registry from config. Platforms with an API key get a live
    /// adapter; the rest run in mock mode so the whole loop works end-to-end
    /// with zero credentials.
    pub fn from_config(config: &PilotConfig, fx: Arc<FxTable>) -> Self {
        let mut registry = Self::new();
        for (platform, platform_config) in config.enabled_platforms() {
            let adapter: Arc<dyn PlatformAdapter> = if platform_config.api_key.is_some() {
                let client = PlatformClient::new(
                    platform_config.endpoint.clone(),
                    platform_config.api_key.clone(),
                    platform_config.refresh_token.clone(),
                    TokenBucket::new(
                        platform_config.rate_burst,
                        platform_config.rate_refill_per_sec,
                    ),
                );
                match platform {
                    PlatformId::GoogleAds => Arc::new(GoogleAdsAdapter::new(client)),
                    PlatformId::MetaAds => Arc::new(MetaAdsAdapter::new(client)),
                    PlatformId::TiktokAds => {
                        Arc::new(TiktokAdsAdapter::new(client, Arc::clone(&fx)))
                    }
                    PlatformId::LinkedinAds => Arc::new(LinkedinAdsAdapter::new(client)),
                }
            } else {
                info!(%platform, "no credentials configured, using mock adapter");
                Arc::new(MockAdapter::new(platform))
            };
            registry.register(adapter);
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    pub fn get(&self, platform: PlatformId) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    /// Registered platforms in stable order.
    pub fn platforms(&self) -> Vec<PlatformId> {
        let mut out: Vec<_> = self.adapters.keys().copied().collect();
        out.sort();
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlatformId, &Arc<dyn PlatformAdapter>)> {
        self.adapters.iter().map(|(p, a)| (*p, a))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Probe every adapter concurrently.
    pub async fn health_all(&self) -> Vec<(PlatformId, HealthStatus)> {
        let futures = self
            .platforms()
            .into_iter()
            .map(|platform| {
                let adapter = self.adapters[&platform].clone();
                async move { (platform, adapter.health().await) }
            })
            .collect::<Vec<_>>();
        futures::future::join_all(futures).await
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
