//! # adpilot-adapters
//!
//! The adapter abstraction layer: every ad platform is presented through one
//! capability set, independent of its native protocol, units, or auth scheme.
//! Includes the registry that holds concrete adapter instances, the mock
//! adapters used when credentials are absent, and the metric normaliser that
//! folds heterogeneous raw metrics into canonical samples.

pub mod adapter;
pub mod auth;
pub mod google;
pub mod http;
pub mod linkedin;
pub mod meta;
pub mod mock;
pub mod normalize;
pub mod ratelimit;
pub mod registry;
pub mod tiktok;

pub use adapter::{AdapterResult, HealthStatus, PlatformAdapter, RawMetrics};
pub use mock::MockAdapter;
pub use normalize::{FxTable, NormalizedBatch, Normalizer};
pub use ratelimit::TokenBucket;
pub use registry::AdapterRegistry;
