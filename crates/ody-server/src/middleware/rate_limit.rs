//! Governor-based rate limiting.
//!
//! A direct limiter throttles all `/api` traffic; a keyed limiter throttles
//! handshake attempts per agent id. Both are in-memory and process-local.
//! Keyed state is pruned periodically so idle agent ids do not accumulate.

use std::hash::Hash;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::Clock;
use governor::middleware::RateLimitingMiddleware;
use governor::state::keyed::ShrinkableKeyedStateStore;
use governor::{DefaultDirectRateLimiter, DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::task::JoinHandle;

use crate::context::AppContext;
use crate::error::AppError;

/// A shared unkeyed rate limiter.
pub type SharedLimiter = Arc<DefaultDirectRateLimiter>;

/// A shared rate limiter keyed by an arbitrary string (agent id).
pub type KeyedLimiter = Arc<DefaultKeyedRateLimiter<String>>;

/// Window over which a single agent may make its handshake allowance.
pub const KEYED_WINDOW: Duration = Duration::from_secs(60);

/// How often idle keys are dropped from the keyed limiter.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

fn non_zero(requests: u32, fallback: u32) -> NonZeroU32 {
    NonZeroU32::new(requests)
        .or_else(|| NonZeroU32::new(fallback))
        .unwrap_or(NonZeroU32::MIN)
}

fn per_minute(requests_per_minute: u32, fallback: u32) -> Quota {
    Quota::per_minute(non_zero(requests_per_minute, fallback))
}

/// At most `requests` in a burst, with a single request earned back per
/// [`KEYED_WINDOW`]. An exhausted key stays blocked for the whole window
/// rather than regaining a slot every `window / requests`.
pub(crate) fn keyed_quota(requests: u32, fallback: u32) -> Quota {
    let n = non_zero(requests, fallback);
    Quota::with_period(KEYED_WINDOW)
        .map(|q| q.allow_burst(n))
        .unwrap_or_else(|| Quota::per_minute(n))
}

/// Create a limiter with the given requests-per-minute quota. Zero falls
/// back to `fallback`.
pub fn create_limiter(requests_per_minute: u32, fallback: u32) -> SharedLimiter {
    Arc::new(RateLimiter::direct(per_minute(requests_per_minute, fallback)))
}

/// Create a per-key limiter allowing `requests_per_minute` per key per
/// [`KEYED_WINDOW`].
pub fn create_keyed_limiter(requests_per_minute: u32, fallback: u32) -> KeyedLimiter {
    Arc::new(RateLimiter::keyed(keyed_quota(requests_per_minute, fallback)))
}

/// Drop keys whose state is indistinguishable from a fresh key.
pub fn prune_keyed<K, S, C, MW>(limiter: &RateLimiter<K, S, C, MW>)
where
    K: Hash,
    S: ShrinkableKeyedStateStore<K>,
    C: Clock,
    MW: RateLimitingMiddleware<C::Instant>,
{
    limiter.retain_recent();
    limiter.shrink_to_fit();
}

/// Prune `limiter` every `every` until the returned task is aborted.
pub fn spawn_pruning(limiter: KeyedLimiter, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let before = limiter.len();
            prune_keyed(&*limiter);
            tracing::debug!(before, after = limiter.len(), "Pruned handshake limiter");
        }
    })
}

/// Rate limiting middleware. Returns 429 Too Many Requests when exceeded.
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    if ctx.api_limiter.check().is_err() {
        tracing::warn!(path = %request.uri().path(), "API rate limit exceeded");
        return Err(AppError::new(ody_core::Error::RateLimited(
            "too many requests".into(),
        ))
        .into_response());
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;
    use governor::middleware::NoOpMiddleware;
    use governor::nanos::Nanos;
    use governor::state::keyed::DashMapStateStore;

    type FakeKeyed =
        RateLimiter<String, DashMapStateStore<String>, FakeRelativeClock, NoOpMiddleware<Nanos>>;

    fn fake_keyed(requests: u32) -> (FakeKeyed, FakeRelativeClock) {
        let clock = FakeRelativeClock::default();
        let limiter = RateLimiter::dashmap_with_clock(keyed_quota(requests, 5), &clock);
        (limiter, clock)
    }

    #[test]
    fn direct_limiter_exhausts() {
        let limiter = create_limiter(3, 300);
        for _ in 0..3 {
            assert!(limiter.check().is_ok());
        }
        assert!(limiter.check().is_err());
    }

    #[test]
    fn zero_uses_fallback() {
        let limiter = create_limiter(0, 2);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn keyed_limiter_is_per_key() {
        let limiter = create_keyed_limiter(5, 5);
        let a = "agent-a".to_string();
        let b = "agent-b".to_string();
        for _ in 0..5 {
            assert!(limiter.check_key(&a).is_ok());
        }
        assert!(limiter.check_key(&a).is_err());
        assert!(limiter.check_key(&b).is_ok());
    }

    #[test]
    fn exhausted_key_stays_blocked_for_the_window() {
        let (limiter, clock) = fake_keyed(5);
        let key = "agent-a".to_string();
        for _ in 0..5 {
            assert!(limiter.check_key(&key).is_ok());
        }
        assert!(limiter.check_key(&key).is_err());

        // A per-minute quota would have refilled one slot by now.
        clock.advance(Duration::from_millis(12_100));
        assert!(limiter.check_key(&key).is_err());

        clock.advance(Duration::from_secs(40));
        assert!(limiter.check_key(&key).is_err());

        clock.advance(KEYED_WINDOW);
        assert!(limiter.check_key(&key).is_ok());
    }

    #[test]
    fn pruning_drops_idle_keys() {
        let (limiter, clock) = fake_keyed(5);
        for i in 0..100 {
            assert!(limiter.check_key(&format!("agent-{i}")).is_ok());
        }
        assert_eq!(limiter.len(), 100);

        prune_keyed(&limiter);
        assert_eq!(limiter.len(), 100);

        clock.advance(KEYED_WINDOW * 2);
        assert!(limiter.check_key(&"agent-live".to_string()).is_ok());
        prune_keyed(&limiter);
        assert_eq!(limiter.len(), 1);
    }

    #[tokio::test]
    async fn pruning_task_runs_until_aborted() {
        let limiter = create_keyed_limiter(5, 5);
        let task = spawn_pruning(limiter.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!task.is_finished());
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
