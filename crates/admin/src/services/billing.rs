//! Billing return handling.
//!
//! After checkout the merchant is sent back to the app before the billing
//! webhook has necessarily updated `plan_subscriptions`. The return handler
//! polls a fixed number of times for the plan to become usable.

use std::future::Future;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::db::{PlanRepository, PlanSubscription, RepositoryError};

/// Poll attempts before giving up.
pub const PLAN_POLL_ATTEMPTS: u32 = 5;

/// Pause between attempts.
pub const PLAN_POLL_DELAY: Duration = Duration::from_secs(2);

/// Call `check` up to `attempts` times, sleeping `delay` between calls,
/// until it yields a value.
///
/// # Errors
///
/// Returns the first error from `check`.
pub async fn poll_until<T, E, F, Fut>(
    attempts: u32,
    delay: Duration,
    mut check: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=attempts {
        if let Some(found) = check().await? {
            return Ok(Some(found));
        }
        debug!(attempt, "Not ready yet");
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(None)
}

/// Wait for `shop`'s plan to become usable.
///
/// Returns the last seen subscription either way, so the caller can tell
/// "still pending" from "no subscription at all".
///
/// # Errors
///
/// Returns `RepositoryError` if a plan lookup fails.
#[instrument(skip(pool))]
pub async fn await_active_plan(
    pool: &PgPool,
    shop: &str,
) -> Result<(bool, Option<PlanSubscription>), RepositoryError> {
    let repo = &PlanRepository::new(pool);

    let active = poll_until(PLAN_POLL_ATTEMPTS, PLAN_POLL_DELAY, move || async move {
        let plan = repo.get(shop).await?;
        Ok::<_, RepositoryError>(plan.filter(|plan| plan.status.is_usable()))
    })
    .await?;

    if let Some(plan) = active {
        info!(shop = %shop, plan = %plan.plan_name, "Plan active");
        return Ok((true, Some(plan)));
    }
    Ok((false, repo.get(shop).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_poll_returns_once_ready() {
        let calls = &AtomicU32::new(0);
        let found = poll_until(5, Duration::ZERO, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok::<_, String>((n == 3).then_some(n))
        })
        .await
        .unwrap();

        assert_eq!(found, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_gives_up_after_attempts() {
        let calls = &AtomicU32::new(0);
        let found = poll_until(5, Duration::ZERO, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<Option<()>, String>(None)
        })
        .await
        .unwrap();

        assert_eq!(found, None);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_poll_stops_on_error() {
        let calls = &AtomicU32::new(0);
        let result = poll_until(5, Duration::ZERO, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<Option<()>, _>("db down".to_string())
        })
        .await;

        assert_eq!(result, Err("db down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
