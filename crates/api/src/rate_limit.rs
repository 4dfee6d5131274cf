//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-client-IP limits on the frame and enrollment endpoints using
//! tower_governor. GCRA needs no background task; the quota replenishes as
//! requests are evaluated.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config keyed by peer IP, reporting X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Interval for one request to replenish (milliseconds)
    pub replenish_ms: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // Exam clients post a snapshot every second or two
        Self {
            enabled: true,
            replenish_ms: 250,
            burst_size: 20,
        }
    }
}

impl RateLimitConfig {
    /// Create a strict config (single client per IP)
    pub fn strict() -> Self {
        Self {
            enabled: true,
            replenish_ms: 1_000,
            burst_size: 5,
        }
    }

    /// Create a lenient config (many candidates behind one NAT)
    pub fn lenient() -> Self {
        Self {
            enabled: true,
            replenish_ms: 20,
            burst_size: 200,
        }
    }
}

/// Create a rate limiting governor config.
///
/// Uses PeerIpKeyExtractor, so the service must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
/// Returns `None` for a zero interval or burst.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<DefaultGovernorConfig>> {
    GovernorConfigBuilder::default()
        .per_millisecond(config.replenish_ms)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.replenish_ms, 250);
        assert_eq!(config.burst_size, 20);
    }

    #[test]
    fn test_strict_config() {
        let config = RateLimitConfig::strict();
        assert_eq!(config.replenish_ms, 1_000);
        assert_eq!(config.burst_size, 5);
    }

    #[test]
    fn test_create_governor_config() {
        assert!(create_governor_config(&RateLimitConfig::default()).is_some());
        assert!(create_governor_config(&RateLimitConfig::lenient()).is_some());
    }

    #[test]
    fn test_zero_burst_is_rejected() {
        let config = RateLimitConfig {
            burst_size: 0,
            ..Default::default()
        };
        assert!(create_governor_config(&config).is_none());
    }
}
