use std::{
    fmt,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicI64, Ordering},
    },
};

use dashmap::DashMap;
use jiff::Timestamp;
use serde::Serialize;
use tollgate_config::BudgetConfig;
use tollgate_core::{BudgetScope, Clock, Cost, SystemClock};
use uuid::Uuid;

use crate::{
    counter::ScopeCounter,
    error::BudgetExceeded,
    window::{Window, timestamp},
};

type SharedCounter = Arc<Mutex<ScopeCounter>>;

fn lock(counter: &Mutex<ScopeCounter>) -> MutexGuard<'_, ScopeCounter> {
    counter.lock().unwrap_or_else(|e| e.into_inner())
}

/// Spend ledger for the request, user-daily and system-daily scopes
///
/// Counters are locked in a fixed order (request, user, system) so a
/// reservation sees a consistent view of all three without deadlocking.
/// Requests for different users only contend on the system counter.
#[derive(Clone)]
pub struct BudgetLedger {
    inner: Arc<LedgerInner>,
}

struct LedgerInner {
    clock: Arc<dyn Clock>,
    request_limit: Cost,
    user_limit: Cost,
    user_window: Window,
    system_limit: Cost,
    system_window: Window,
    users: DashMap<String, SharedCounter>,
    /// User window most recently swept for idle counters
    swept_window: AtomicI64,
    system: Mutex<ScopeCounter>,
}

/// Spend counter for a single governed call
///
/// Every tier attempt of one call draws from the same instance.
pub struct RequestScope {
    counter: SharedCounter,
}

impl RequestScope {
    pub fn remaining(&self) -> Cost {
        lock(&self.counter).headroom()
    }
}

impl fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counter = lock(&self.counter);
        f.debug_struct("RequestScope")
            .field("limit", &counter.limit)
            .field("used", &counter.used())
            .finish()
    }
}

/// Selects a scope instance for read-only queries
#[derive(Debug, Clone, Copy)]
pub enum ScopeKey<'a> {
    Request(&'a RequestScope),
    User(&'a str),
    System,
}

/// Point-in-time view of one scope instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSnapshot {
    pub scope: BudgetScope,
    pub limit: Cost,
    pub committed: Cost,
    pub reserved: Cost,
    pub remaining: Cost,
    pub window_start: Option<Timestamp>,
    pub resets_at: Option<Timestamp>,
}

/// Configured limit and window of a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeLimit {
    pub scope: BudgetScope,
    pub limit: Cost,
    /// Window length in seconds; absent for the request scope
    pub window: Option<u64>,
    pub resets_at: Option<Timestamp>,
}

/// Outcome of committing a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Amount added to every scope
    pub charged: Cost,
    /// Whether `charged` is less than the actual cost
    pub clamped: bool,
}

impl BudgetLedger {
    pub fn new(config: &BudgetConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &BudgetConfig, clock: Arc<dyn Clock>) -> Self {
        let system_window = Window::new(config.system_daily.window, config.reset_hour_utc);
        let user_window = Window::new(config.user_daily.window, config.reset_hour_utc);
        let now = clock.now();
        let system = ScopeCounter::new(config.system_daily.limit, Some(system_window.start_of(now)));
        let swept_window = AtomicI64::new(user_window.start_of(now));

        Self {
            inner: Arc::new(LedgerInner {
                clock,
                request_limit: config.request.limit,
                user_limit: config.user_daily.limit,
                user_window,
                system_limit: config.system_daily.limit,
                system_window,
                users: DashMap::new(),
                swept_window,
                system: Mutex::new(system),
            }),
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    /// Open the request scope for one governed call
    pub fn request_scope(&self) -> RequestScope {
        RequestScope {
            counter: Arc::new(Mutex::new(ScopeCounter::new(self.inner.request_limit, None))),
        }
    }

    /// Reserve `estimate` against the request, user and system scopes
    ///
    /// Either every scope is held for `estimate` or none is touched.
    pub fn reserve(
        &self,
        request: &RequestScope,
        user_id: &str,
        estimate: Cost,
    ) -> Result<Reservation, BudgetExceeded> {
        let inner = &self.inner;
        let now = inner.clock.now();
        let user_window = inner.user_window.start_of(now);
        let system_window = inner.system_window.start_of(now);
        let user = inner.user_counter(user_id, user_window);

        let mut request_counter = lock(&request.counter);
        let mut user_counter = lock(&user);
        let mut system_counter = lock(&inner.system);

        user_counter.roll(Some(user_window));
        system_counter.roll(Some(system_window));

        let scopes = [
            (BudgetScope::Request, &*request_counter),
            (BudgetScope::UserDaily, &*user_counter),
            (BudgetScope::SystemDaily, &*system_counter),
        ];

        let failed: Vec<_> = scopes
            .iter()
            .filter(|(_, counter)| !counter.admits(estimate))
            .map(|(scope, _)| *scope)
            .collect();

        if let Some(&scope) = failed.last() {
            let remaining = scopes
                .iter()
                .find(|(s, _)| *s == scope)
                .map_or(Cost::ZERO, |(_, counter)| counter.headroom());

            tracing::debug!(
                user_id,
                scope = %scope,
                estimate = %estimate,
                remaining = %remaining,
                "reservation refused"
            );

            return Err(BudgetExceeded {
                scope,
                failed,
                requested: estimate,
                remaining,
            });
        }

        request_counter.hold(estimate);
        user_counter.hold(estimate);
        system_counter.hold(estimate);

        drop(system_counter);
        drop(user_counter);
        drop(request_counter);

        inner.sweep_if_window_changed(user_window);

        let reservation = Reservation {
            id: Uuid::new_v4(),
            estimate,
            ledger: Arc::clone(inner),
            request: Arc::clone(&request.counter),
            user,
            user_window,
            system_window,
            settled: false,
        };

        tracing::debug!(
            reservation_id = %reservation.id,
            user_id,
            estimate = %estimate,
            "budget reserved"
        );

        Ok(reservation)
    }

    /// Headroom left in a scope instance
    pub fn remaining(&self, key: ScopeKey<'_>) -> Cost {
        self.snapshot(key).remaining
    }

    /// Read a scope instance, resetting it first if its window elapsed
    pub fn snapshot(&self, key: ScopeKey<'_>) -> ScopeSnapshot {
        let inner = &self.inner;
        let now = inner.clock.now();

        match key {
            ScopeKey::Request(request) => describe(BudgetScope::Request, &lock(&request.counter), None),
            ScopeKey::User(user_id) => {
                let current = inner.user_window.start_of(now);
                let window = Some(inner.user_window);

                match inner.users.get(user_id).map(|entry| Arc::clone(entry.value())) {
                    Some(counter) => {
                        let mut counter = lock(&counter);
                        counter.roll(Some(current));
                        describe(BudgetScope::UserDaily, &counter, window)
                    }
                    None => describe(
                        BudgetScope::UserDaily,
                        &ScopeCounter::new(inner.user_limit, Some(current)),
                        window,
                    ),
                }
            }
            ScopeKey::System => {
                let mut counter = lock(&inner.system);
                counter.roll(Some(inner.system_window.start_of(now)));
                describe(BudgetScope::SystemDaily, &counter, Some(inner.system_window))
            }
        }
    }

    /// Configured limits of every scope, with the next reset instant
    pub fn scope_limits(&self) -> Vec<ScopeLimit> {
        let inner = &self.inner;
        let now = inner.clock.now();

        let windowed = |scope, limit, window: Window| ScopeLimit {
            scope,
            limit,
            window: Some(window.length().as_secs()),
            resets_at: Some(timestamp(window.end_of(now))),
        };

        vec![
            ScopeLimit {
                scope: BudgetScope::Request,
                limit: inner.request_limit,
                window: None,
                resets_at: None,
            },
            windowed(BudgetScope::UserDaily, inner.user_limit, inner.user_window),
            windowed(BudgetScope::SystemDaily, inner.system_limit, inner.system_window),
        ]
    }

    /// Start of the window currently open for `scope`
    pub fn window_start(&self, scope: BudgetScope) -> Option<Timestamp> {
        let now = self.inner.clock.now();
        match scope {
            BudgetScope::Request => None,
            BudgetScope::UserDaily => Some(timestamp(self.inner.user_window.start_of(now))),
            BudgetScope::SystemDaily => Some(timestamp(self.inner.system_window.start_of(now))),
        }
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.inner.users.len()
    }
}

impl fmt::Debug for BudgetLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BudgetLedger")
            .field("request_limit", &self.inner.request_limit)
            .field("user_limit", &self.inner.user_limit)
            .field("system_limit", &self.inner.system_limit)
            .finish_non_exhaustive()
    }
}

impl LedgerInner {
    fn user_counter(&self, user_id: &str, window: i64) -> SharedCounter {
        if let Some(entry) = self.users.get(user_id) {
            return Arc::clone(entry.value());
        }

        let entry = self
            .users
            .entry(user_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(ScopeCounter::new(self.user_limit, Some(window)))));

        Arc::clone(entry.value())
    }

    /// Sweep once per user window, whichever caller first observes it
    fn sweep_if_window_changed(&self, current: i64) {
        let swept = self.swept_window.load(Ordering::Acquire);
        if swept == current {
            return;
        }

        if self
            .swept_window
            .compare_exchange(swept, current, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.evict_idle_users(current);
        }
    }

    /// Forget users with nothing in flight whose window has passed
    fn evict_idle_users(&self, current: i64) {
        let before = self.users.len();

        self.users.retain(|_, counter| {
            if Arc::strong_count(counter) > 1 {
                return true;
            }
            match counter.try_lock() {
                Ok(counter) => counter.window_start == Some(current),
                Err(_) => true,
            }
        });

        tracing::debug!(evicted = before.saturating_sub(self.users.len()), "evicted idle user counters");
    }
}

fn describe(scope: BudgetScope, counter: &ScopeCounter, window: Option<Window>) -> ScopeSnapshot {
    let resets_at = counter
        .window_start
        .zip(window)
        .map(|(start, window)| timestamp(start.saturating_add(window.seconds())));

    ScopeSnapshot {
        scope,
        limit: counter.limit,
        committed: counter.committed,
        reserved: counter.reserved,
        remaining: counter.headroom(),
        window_start: counter.window_start.map(timestamp),
        resets_at,
    }
}

/// Provisional hold on all three scopes
///
/// Settle it with [`Reservation::commit`] or [`Reservation::release`].
/// A reservation dropped unsettled (for example when the owning future
/// is cancelled) releases itself.
#[must_use = "an unsettled reservation is released when dropped"]
pub struct Reservation {
    id: Uuid,
    estimate: Cost,
    ledger: Arc<LedgerInner>,
    request: SharedCounter,
    user: SharedCounter,
    user_window: i64,
    system_window: i64,
    settled: bool,
}

impl Reservation {
    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub const fn estimate(&self) -> Cost {
        self.estimate
    }

    /// Replace the estimate with the measured cost
    ///
    /// The charge is clamped so no scope ends above its limit. A hold
    /// placed in a window that has since rolled over is charged to the
    /// new window.
    pub fn commit(mut self, actual: Cost) -> Settlement {
        let charged = self.settle(Some(actual));

        let settlement = Settlement {
            charged,
            clamped: charged < actual,
        };

        if settlement.clamped {
            tracing::warn!(
                reservation_id = %self.id,
                estimate = %self.estimate,
                actual = %actual,
                charged = %charged,
                "actual cost exceeded remaining budget, charge clamped"
            );
        } else {
            tracing::debug!(reservation_id = %self.id, charged = %charged, "reservation committed");
        }

        settlement
    }

    /// Roll the reservation back entirely
    pub fn release(mut self) {
        self.settle(None);
        tracing::debug!(reservation_id = %self.id, "reservation released");
    }

    fn settle(&mut self, actual: Option<Cost>) -> Cost {
        self.settled = true;

        let inner = &self.ledger;
        let now = inner.clock.now();
        let user_window = inner.user_window.start_of(now);
        let system_window = inner.system_window.start_of(now);

        let mut request = lock(&self.request);
        let mut user = lock(&self.user);
        let mut system = lock(&inner.system);

        user.roll(Some(user_window));
        system.roll(Some(system_window));

        request.unhold(self.estimate, None);
        user.unhold(self.estimate, Some(self.user_window));
        system.unhold(self.estimate, Some(self.system_window));

        let Some(actual) = actual else {
            return Cost::ZERO;
        };

        let charged = actual.min(request.headroom()).min(user.headroom()).min(system.headroom());

        request.charge(charged);
        user.charge(charged);
        system.charge(charged);

        charged
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(None);
            tracing::debug!(reservation_id = %self.id, "unsettled reservation released on drop");
        }
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("id", &self.id)
            .field("estimate", &self.estimate)
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}
