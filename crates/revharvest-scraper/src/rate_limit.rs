//! Politeness delays and client-identity rotation.
//!
//! Every adapter owns one [`RateController`]; it calls [`RateController::wait`]
//! immediately before each network call and stamps the request with
//! [`RateController::next_identity`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::seq::IndexedRandom;
use rand::Rng;
use revharvest_core::AppConfig;

/// Real browser user-agents used when dynamic generation is off.
const STATIC_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
];

const PLATFORMS: &[&str] = &[
    "Windows NT 10.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "X11; Linux x86_64",
    "Windows NT 11.0; Win64; x64",
];

const CHROME_MAJOR: std::ops::RangeInclusive<u32> = 118..=126;
const FIREFOX_MAJOR: std::ops::RangeInclusive<u32> = 115..=127;

/// Delay window applied before each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Window used for the very first request of an adapter.
    pub warmup_min_ms: u64,
    pub warmup_max_ms: u64,
    pub rotate_user_agents: bool,
}

impl RatePolicy {
    /// Builds the policy from configuration. The warm-up window is 0.5-1.5 s,
    /// clamped so it never exceeds the configured maximum delay.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms,
            warmup_min_ms: 500.min(config.max_delay_ms),
            warmup_max_ms: 1_500.min(config.max_delay_ms),
            rotate_user_agents: config.rotate_user_agents,
        }
    }

    /// No waiting at all. Used by tests against local mock servers.
    #[must_use]
    pub fn none() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
            warmup_min_ms: 0,
            warmup_max_ms: 0,
            rotate_user_agents: false,
        }
    }
}

#[derive(Debug)]
pub struct RateController {
    policy: RatePolicy,
    first_request: AtomicBool,
}

impl RateController {
    #[must_use]
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            first_request: AtomicBool::new(true),
        }
    }

    /// The delay the next call to [`Self::wait`] would sleep for. Consumes the
    /// warm-up slot on first use.
    fn next_delay(&self) -> Duration {
        let (lo, hi) = if self.first_request.swap(false, Ordering::Relaxed) {
            (self.policy.warmup_min_ms, self.policy.warmup_max_ms)
        } else {
            (self.policy.min_delay_ms, self.policy.max_delay_ms)
        };
        if hi == 0 {
            return Duration::ZERO;
        }
        let ms = rand::rng().random_range(lo.min(hi)..=hi);
        Duration::from_millis(ms)
    }

    /// Sleeps for a randomized politeness delay.
    pub async fn wait(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tracing::debug!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "politeness delay"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// A user-agent string for the next request.
    #[must_use]
    pub fn next_identity(&self) -> String {
        if self.policy.rotate_user_agents {
            if let Some(ua) = generate_user_agent() {
                return ua;
            }
        }
        static_user_agent()
    }
}

fn static_user_agent() -> String {
    STATIC_USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(STATIC_USER_AGENTS[0])
        .to_string()
}

fn generate_user_agent() -> Option<String> {
    let mut rng = rand::rng();
    let platform = PLATFORMS.choose(&mut rng)?;
    if rng.random_bool(0.75) {
        let major = rng.random_range(CHROME_MAJOR);
        Some(format!(
            "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0.0.0 Safari/537.36"
        ))
    } else {
        let major = rng.random_range(FIREFOX_MAJOR);
        Some(format!(
            "Mozilla/5.0 ({platform}; rv:{major}.0) Gecko/20100101 Firefox/{major}.0"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delay_uses_warmup_window() {
        let controller = RateController::new(RatePolicy {
            min_delay_ms: 2_000,
            max_delay_ms: 5_000,
            warmup_min_ms: 500,
            warmup_max_ms: 1_500,
            rotate_user_agents: false,
        });
        let first = controller.next_delay();
        assert!(first >= Duration::from_millis(500) && first <= Duration::from_millis(1_500));
        let second = controller.next_delay();
        assert!(second >= Duration::from_millis(2_000) && second <= Duration::from_millis(5_000));
    }

    #[test]
    fn zero_policy_never_sleeps() {
        let controller = RateController::new(RatePolicy::none());
        assert_eq!(controller.next_delay(), Duration::ZERO);
        assert_eq!(controller.next_delay(), Duration::ZERO);
    }

    #[test]
    fn static_pool_is_used_when_rotation_disabled() {
        let controller = RateController::new(RatePolicy::none());
        let ua = controller.next_identity();
        assert!(STATIC_USER_AGENTS.contains(&ua.as_str()));
    }

    #[test]
    fn generated_identities_look_like_browsers() {
        let controller = RateController::new(RatePolicy {
            rotate_user_agents: true,
            ..RatePolicy::none()
        });
        for _ in 0..20 {
            let ua = controller.next_identity();
            assert!(ua.starts_with("Mozilla/5.0 ("));
            assert!(ua.contains("Chrome/") || ua.contains("Firefox/"));
        }
    }
}
