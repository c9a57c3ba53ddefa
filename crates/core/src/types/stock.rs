//! Stock count arithmetic.
//!
//! Stock counts never go negative. Both manual adjustments and order
//! fulfilment clamp at zero instead of failing.

/// Apply a manual stock adjustment, clamping the result at zero.
///
/// Positive deltas saturate at `i32::MAX`.
#[must_use]
pub const fn adjust_stock(current: i32, delta: i32) -> i32 {
    let next = current.saturating_add(delta);
    if next < 0 { 0 } else { next }
}

/// Result of taking an order quantity out of a color's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fulfilment {
    /// Stock before the order.
    pub previous: i32,
    /// Stock after the order.
    pub remaining: i32,
    /// Units ordered beyond what was in stock (0 when fully covered).
    pub shortfall: i32,
}

impl Fulfilment {
    /// Whether the order asked for more than was in stock.
    #[must_use]
    pub const fn is_oversold(&self) -> bool {
        self.shortfall > 0
    }
}

/// Take `requested` units out of `current` stock.
///
/// Oversell is allowed: when `requested` exceeds the stock, the stock drops to
/// zero and the deficit is reported as `shortfall`.
#[must_use]
pub const fn fulfil(current: i32, requested: i32) -> Fulfilment {
    let available = if current < 0 { 0 } else { current };
    if requested > available {
        Fulfilment {
            previous: current,
            remaining: 0,
            shortfall: requested.saturating_sub(available),
        }
    } else {
        Fulfilment {
            previous: current,
            remaining: available - requested,
            shortfall: 0,
        }
    }
}
