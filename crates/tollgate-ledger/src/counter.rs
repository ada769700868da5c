use tollgate_core::Cost;

/// Spend counter for one scope instance
///
/// `committed` holds settled charges, `reserved` holds estimates of
/// in-flight calls. `committed + reserved <= limit` holds at all times.
#[derive(Debug)]
pub(crate) struct ScopeCounter {
    pub(crate) limit: Cost,
    pub(crate) committed: Cost,
    pub(crate) reserved: Cost,
    /// Unix second the current window started; `None` for unwindowed scopes
    pub(crate) window_start: Option<i64>,
}

impl ScopeCounter {
    pub(crate) const fn new(limit: Cost, window_start: Option<i64>) -> Self {
        Self {
            limit,
            committed: Cost::ZERO,
            reserved: Cost::ZERO,
            window_start,
        }
    }

    /// Reset to an empty window if `current` differs from the tracked one
    pub(crate) fn roll(&mut self, current: Option<i64>) -> bool {
        if self.window_start == current {
            return false;
        }

        self.window_start = current;
        self.committed = Cost::ZERO;
        self.reserved = Cost::ZERO;
        true
    }

    pub(crate) fn used(&self) -> Cost {
        self.committed + self.reserved
    }

    pub(crate) fn headroom(&self) -> Cost {
        self.limit.saturating_sub(self.used())
    }

    pub(crate) fn admits(&self, amount: Cost) -> bool {
        amount <= self.headroom()
    }

    pub(crate) fn hold(&mut self, amount: Cost) {
        self.reserved += amount;
    }

    /// Drop a hold placed in `window`; holds from an earlier window are
    /// already gone
    pub(crate) fn unhold(&mut self, amount: Cost, window: Option<i64>) {
        if self.window_start == window {
            self.reserved = self.reserved.saturating_sub(amount);
        }
    }

    /// Charge up to `amount`, clamped to headroom; returns the amount charged
    pub(crate) fn charge(&mut self, amount: Cost) -> Cost {
        let charged = amount.min(self.headroom());
        self.committed += charged;
        charged
    }
}
