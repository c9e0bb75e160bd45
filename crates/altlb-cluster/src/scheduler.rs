//! Refresh scheduling
//!
//! Two regimes drive node list refreshes:
//!
//! - **Active**: outgoing traffic claims the [`RefreshDeadline`]; at most one
//!   caller wins per update period and signals the refresh loop.
//! - **Idle**: the refresh loop ticks on its own timer so the list stays
//!   current even when no requests are sent.

use altlb_core::{unix_now_secs, Result};
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Next time (Unix seconds) a traffic-driven refresh may fire
pub struct RefreshDeadline {
    enabled: bool,
    period_secs: i64,
    next_refresh: AtomicI64,
}

impl RefreshDeadline {
    /// A zero period disables traffic-driven refresh. Periods beyond the
    /// `i64` range saturate, so a deadline set from them is never reached.
    pub fn new(period: Duration) -> Self {
        Self {
            enabled: !period.is_zero(),
            period_secs: i64::try_from(period.as_secs()).unwrap_or(i64::MAX),
            next_refresh: AtomicI64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Try to claim the refresh due at `now`.
    ///
    /// Only one caller can move an expired deadline forward, so only one
    /// caller gets `true` per period.
    pub fn try_claim(&self, now: i64) -> bool {
        if !self.enabled {
            return false;
        }

        let next = self.next_refresh.load(Ordering::Acquire);
        if next >= now {
            return false;
        }

        self.next_refresh
            .compare_exchange(
                next,
                now.saturating_add(self.period_secs),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Push the deadline one period past `now`
    pub fn postpone(&self, now: i64) {
        self.next_refresh
            .store(now.saturating_add(self.period_secs), Ordering::Release);
    }

    pub fn next_refresh(&self) -> i64 {
        self.next_refresh.load(Ordering::Acquire)
    }
}

/// Something the refresh loop can refresh
pub(crate) trait Refresher: Send + Sync + 'static {
    /// Refresh the node list, returning how many nodes were published
    fn refresh(&self) -> impl Future<Output = Result<usize>> + Send;

    fn deadline(&self) -> &RefreshDeadline;
}

/// Spawn the background refresh loop.
///
/// The loop refreshes on every idle tick (when `idle_period` is non-zero)
/// and whenever `signal` is notified. It exits when `cancel` fires or the
/// target has been dropped. Errors are logged and the loop keeps going.
pub(crate) fn spawn_refresh_loop<R: Refresher>(
    target: Weak<R>,
    idle_period: Duration,
    signal: Arc<Notify>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(idle_period = ?idle_period, "Starting node list refresh loop");

        let mut ticker = idle_ticker(idle_period);

        loop {
            let reason = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = signal.notified() => "active",
                _ = next_tick(&mut ticker) => "idle",
            };

            let Some(target) = target.upgrade() else {
                break;
            };

            target.deadline().postpone(unix_now_secs());
            match target.refresh().await {
                Ok(count) => debug!(reason, count, "Node list refreshed"),
                Err(e) => warn!(reason, error = %e, "Background node list refresh failed"),
            }
        }

        info!("Stopped node list refresh loop");
    })
}

/// No ticker when the period is zero or too large to schedule
fn idle_ticker(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let Some(start) = Instant::now().checked_add(period) else {
        warn!(idle_period = ?period, "Idle period out of range, idle refresh disabled");
        return None;
    };
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
