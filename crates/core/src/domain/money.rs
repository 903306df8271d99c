use rust_decimal::{Decimal, RoundingStrategy};

pub type Money = Decimal;

pub const MONEY_SCALE: u32 = 2;

pub fn hundred() -> Decimal {
    Decimal::ONE_HUNDRED
}

/// Round to cents, halves away from zero.
pub fn round_money(amount: Money) -> Money {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamp a computed price into `[0, ceiling]` and round it.
pub fn clamp_price(amount: Money, ceiling: Money) -> Money {
    round_money(amount.max(Decimal::ZERO).min(ceiling))
}

/// `amount * percent / 100`, unrounded.
pub fn percent_of(amount: Money, percent: Decimal) -> Money {
    amount * percent / hundred()
}

pub fn is_valid_percent(percent: Decimal) -> bool {
    percent >= Decimal::ZERO && percent <= hundred()
}
