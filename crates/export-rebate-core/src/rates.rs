//! Conversion between the two ways an agent's cut is quoted.
//!
//! The engine's native unit is the **relative ratio**: the agent's share of
//! the rebate amount. Users often quote an **absolute rate** instead: a
//! percentage of the invoice value. Since the rebate itself is
//! `invoice x R`, an absolute rate of `a`% corresponds to a relative ratio
//! of `(a/100) / R` and can never exceed `R` (100% of the rebate).

use rust_decimal::Decimal;

use crate::error::RebateError;
use crate::rounding::{checked_div, format_percentage};
use crate::types::Rate;
use crate::RebateResult;

/// Convert a user-facing absolute agent rate (percent of invoice value) into
/// the engine-native relative ratio (fraction of the rebate amount).
pub fn absolute_to_relative(tax_rebate_rate: Rate, absolute_rate_percent: Decimal) -> RebateResult<Rate> {
    validate_rebate_rate(tax_rebate_rate)?;
    let absolute_fraction = checked_div(
        absolute_rate_percent,
        Decimal::ONE_HUNDRED,
        "absolute rate normalization",
    )?;
    if absolute_fraction < Decimal::ZERO || absolute_fraction > tax_rebate_rate {
        return Err(RebateError::InvalidInput {
            field: "absolute_rate_percent".into(),
            reason: format!(
                "Absolute agent rate must be between 0 and {} of invoice value",
                format_percentage(tax_rebate_rate)
            ),
        });
    }
    checked_div(absolute_fraction, tax_rebate_rate, "absolute-to-relative conversion")
}

/// Convert a relative ratio back into an absolute rate in percent of invoice
/// value: `ratio x R x 100`.
pub fn relative_to_absolute(tax_rebate_rate: Rate, relative_ratio: Rate) -> RebateResult<Decimal> {
    validate_rebate_rate(tax_rebate_rate)?;
    if relative_ratio < Decimal::ZERO || relative_ratio > Decimal::ONE {
        return Err(RebateError::InvalidInput {
            field: "relative_ratio".into(),
            reason: "Relative agent ratio must be between 0 and 1".into(),
        });
    }
    Ok(relative_ratio * tax_rebate_rate * Decimal::ONE_HUNDRED)
}

fn validate_rebate_rate(tax_rebate_rate: Rate) -> RebateResult<()> {
    if tax_rebate_rate <= Decimal::ZERO || tax_rebate_rate >= Decimal::ONE {
        return Err(RebateError::InvalidInput {
            field: "tax_rebate_rate".into(),
            reason: "Tax rebate rate must be strictly between 0 and 100%".into(),
        });
    }
    Ok(())
}
