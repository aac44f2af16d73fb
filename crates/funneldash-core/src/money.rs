//! Fixed-scale decimal helpers for money and ratio columns.

use rust_decimal::{Decimal, RoundingStrategy};

pub const MONEY_SCALE: u32 = 2;
pub const RATIO_SCALE: u32 = 4;

fn at_scale(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Round to two decimal places (half away from zero).
#[must_use]
pub fn money(value: Decimal) -> Decimal {
    at_scale(value, MONEY_SCALE)
}

/// Round to four decimal places (half away from zero).
#[must_use]
pub fn ratio(value: Decimal) -> Decimal {
    at_scale(value, RATIO_SCALE)
}

/// `profit / cost` at ratio scale, or zero when cost is zero.
#[must_use]
pub fn roi(profit: Decimal, cost: Decimal) -> Decimal {
    if cost.is_zero() {
        return ratio(Decimal::ZERO);
    }
    profit
        .checked_div(cost)
        .map_or_else(|| ratio(Decimal::ZERO), ratio)
}
