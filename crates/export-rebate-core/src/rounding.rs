//! Decimal arithmetic policy.
//!
//! Every division in the engine goes through [`checked_div`]: the quotient is
//! rounded to [`CALCULATION_PRECISION`] fractional digits with half-up
//! rounding, and a zero divisor is a domain error, never a panic. Display
//! precision (2 dp for currency, 4 dp for exchange rates) is a presentation
//! concern only; displayed values are never fed back into computation.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::RebateError;
use crate::RebateResult;

/// Fractional digits kept by every intermediate division.
pub const CALCULATION_PRECISION: u32 = 10;

/// Fractional digits for rendered currency amounts.
pub const CURRENCY_DISPLAY_PRECISION: u32 = 2;

/// Fractional digits for rendered exchange rates.
pub const EXCHANGE_RATE_DISPLAY_PRECISION: u32 = 4;

const HALF_UP: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Divide with the engine's precision and rounding policy.
/// A zero divisor fails with `DivisionByZero` naming the calculation site.
pub fn checked_div(numerator: Decimal, denominator: Decimal, context: &str) -> RebateResult<Decimal> {
    if denominator.is_zero() {
        return Err(RebateError::DivisionByZero {
            context: context.to_string(),
        });
    }
    Ok((numerator / denominator).round_dp_with_strategy(CALCULATION_PRECISION, HALF_UP))
}

/// Clamp a parsed input to the internal precision. Values carrying more than
/// ten fractional digits are rounded half-up once, at the boundary.
pub fn quantize(value: Decimal) -> Decimal {
    if value.scale() > CALCULATION_PRECISION {
        value.round_dp_with_strategy(CALCULATION_PRECISION, HALF_UP)
    } else {
        value
    }
}

/// Render an amount as currency: 2 fractional digits, thousands separators.
pub fn format_currency(amount: Decimal) -> String {
    group_thousands(&fixed_scale(amount, CURRENCY_DISPLAY_PRECISION))
}

/// Render a fraction as a percentage with 2 fractional digits: 0.13 -> "13.00%".
pub fn format_percentage(fraction: Decimal) -> String {
    let percent = fraction * Decimal::ONE_HUNDRED;
    format!("{}%", fixed_scale(percent, CURRENCY_DISPLAY_PRECISION))
}

/// Render an exchange rate with 4 fractional digits.
pub fn format_exchange_rate(rate: Decimal) -> String {
    group_thousands(&fixed_scale(rate, EXCHANGE_RATE_DISPLAY_PRECISION))
}

/// Round to exactly `dp` fractional digits and render with trailing zeros.
fn fixed_scale(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(dp, HALF_UP);
    rounded.rescale(dp);
    rounded.to_string()
}

/// Insert comma separators into the integer part of a plain decimal string.
fn group_thousands(plain: &str) -> String {
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
