//! Single-party invoice solver.
//!
//! Two closed-form variants coexist and are deliberately **not** unified:
//!
//! 1. **Rebate netted out** (subtractive): the rebate share retained by the
//!    consignor is netted out of the invoice.
//!    `X = S*E / [1 - R*(1 - A)]`, rebate `T = X*R`.
//! 2. **Rebate on top** (additive): the rebate rides on top of the invoiced
//!    value. `X = S*E*(1+R) / (1 + R*A)`, rebate `T = X*R/(1+R)`.
//!
//! `S` = foreign-currency sales amount, `E` = exchange rate, `R` = rebate
//! rate, `A` = agent's relative share of the rebate. The variants are not
//! algebraically equivalent; callers pick one by [`FormulaKind`].
//!
//! Each variant checks its denominator for exact zero after computing it;
//! the failure is a domain error, never inferred from parameter ranges.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RebateError;
use crate::rounding::checked_div;
use crate::types::{with_metadata, CalculationParams, CalculationResult, ComputationOutput, Money, Rate};
use crate::RebateResult;

/// Which invoice formula a caller intends. The two are distinct contracts
/// with the agent and must never be silently substituted for each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormulaKind {
    /// Subtractive model: rebate netted out of the invoice amount.
    RebateNetted,
    /// Additive model: rebate added on top of the invoice amount.
    RebateOnTop,
}

impl std::fmt::Display for FormulaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormulaKind::RebateNetted => write!(f, "rebate-netted"),
            FormulaKind::RebateOnTop => write!(f, "rebate-on-top"),
        }
    }
}

/// Consignor-side profitability derived from a solved transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitAnalysis {
    /// Client payment plus the consignor's rebate share.
    pub your_total_income: Money,
    /// Total income minus the purchase cost.
    pub your_net_profit: Money,
    /// Net profit over purchase cost, as a fraction.
    pub gross_markup: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Solve one sales transaction with the selected formula variant.
pub fn solve_invoice(
    kind: FormulaKind,
    params: &CalculationParams,
) -> RebateResult<ComputationOutput<CalculationResult>> {
    match kind {
        FormulaKind::RebateNetted => solve_invoice_netted(params),
        FormulaKind::RebateOnTop => solve_invoice_on_top(params),
    }
}

/// Variant A: `X = S·E / [1 − R·(1 − A)]`.
pub fn solve_invoice_netted(
    params: &CalculationParams,
) -> RebateResult<ComputationOutput<CalculationResult>> {
    validate_params(params)?;
    let result = invoice_netted_core(params)?;
    Ok(with_metadata(
        "Single-party invoice: rebate netted out of invoice (subtractive model)",
        &serde_json::json!({
            "formula": "X = S*E / (1 - R*(1 - A))",
            "rebate": "T = X*R",
        }),
        Vec::new(),
        result,
    ))
}

/// Variant B: `X = S·E·(1+R) / (1 + R·A)`.
pub fn solve_invoice_on_top(
    params: &CalculationParams,
) -> RebateResult<ComputationOutput<CalculationResult>> {
    validate_params(params)?;
    let result = invoice_on_top_core(params)?;
    Ok(with_metadata(
        "Single-party invoice: rebate added on top of invoice (additive model)",
        &serde_json::json!({
            "formula": "X = S*E*(1+R) / (1 + R*A)",
            "rebate": "T = X*R/(1+R)",
        }),
        Vec::new(),
        result,
    ))
}

/// Consignor profitability for a solved transaction.
pub fn analyze_profit(
    purchase_amount: Money,
    result: &CalculationResult,
) -> RebateResult<ProfitAnalysis> {
    if purchase_amount <= Decimal::ZERO {
        return Err(RebateError::InvalidInput {
            field: "purchase_amount".into(),
            reason: "Purchase amount must be greater than 0".into(),
        });
    }
    let your_total_income = result.client_payment + result.your_tax_rebate_share;
    let your_net_profit = your_total_income - purchase_amount;
    let gross_markup = checked_div(your_net_profit, purchase_amount, "gross markup")?;
    Ok(ProfitAnalysis {
        your_total_income,
        your_net_profit,
        gross_markup,
    })
}

// ---------------------------------------------------------------------------
// Formula cores
// ---------------------------------------------------------------------------

pub(crate) fn invoice_netted_core(params: &CalculationParams) -> RebateResult<CalculationResult> {
    let client_payment = params.sales_amount * params.exchange_rate;

    let denominator = Decimal::ONE
        - params.tax_rebate_rate * (Decimal::ONE - params.agent_relative_ratio);
    if denominator.is_zero() {
        return Err(RebateError::DegenerateDenominator {
            context: "1 - R*(1 - A)".into(),
        });
    }

    let invoice_amount = checked_div(client_payment, denominator, "netted invoice formula")?;
    let tax_rebate_amount = invoice_amount * params.tax_rebate_rate;
    let agent_profit = tax_rebate_amount * params.agent_relative_ratio;
    let your_tax_rebate_share = tax_rebate_amount - agent_profit;

    Ok(CalculationResult {
        client_payment,
        invoice_amount,
        tax_rebate_amount,
        agent_profit,
        your_tax_rebate_share,
    })
}

pub(crate) fn invoice_on_top_core(params: &CalculationParams) -> RebateResult<CalculationResult> {
    let client_payment = params.sales_amount * params.exchange_rate;

    let denominator = Decimal::ONE + params.tax_rebate_rate * params.agent_relative_ratio;
    if denominator.is_zero() {
        return Err(RebateError::DegenerateDenominator {
            context: "1 + R*A".into(),
        });
    }

    let numerator = client_payment * (Decimal::ONE + params.tax_rebate_rate);
    let invoice_amount = checked_div(numerator, denominator, "on-top invoice formula")?;
    let tax_rebate_amount = crate::settlement::rebate_amount(invoice_amount, params.tax_rebate_rate)?;
    let agent_profit = tax_rebate_amount * params.agent_relative_ratio;
    let your_tax_rebate_share = tax_rebate_amount - agent_profit;

    Ok(CalculationResult {
        client_payment,
        invoice_amount,
        tax_rebate_amount,
        agent_profit,
        your_tax_rebate_share,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_params(params: &CalculationParams) -> RebateResult<()> {
    if params.sales_amount <= Decimal::ZERO {
        return Err(RebateError::InvalidInput {
            field: "sales_amount".into(),
            reason: "Sales amount must be greater than 0".into(),
        });
    }
    if params.exchange_rate <= Decimal::ZERO {
        return Err(RebateError::InvalidInput {
            field: "exchange_rate".into(),
            reason: "Exchange rate must be greater than 0".into(),
        });
    }
    if params.tax_rebate_rate <= Decimal::ZERO || params.tax_rebate_rate >= Decimal::ONE {
        return Err(RebateError::InvalidInput {
            field: "tax_rebate_rate".into(),
            reason: "Tax rebate rate must be strictly between 0 and 100%".into(),
        });
    }
    if params.agent_relative_ratio < Decimal::ZERO || params.agent_relative_ratio > Decimal::ONE {
        return Err(RebateError::InvalidInput {
            field: "agent_relative_ratio".into(),
            reason: "Agent relative ratio must be between 0 and 100%".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};
    use rust_decimal_macros::dec;

    fn reference_params() -> CalculationParams {
        CalculationParams {
            sales_amount: dec!(170000),
            exchange_rate: dec!(7.1000),
            tax_rebate_rate: dec!(0.13),
            agent_relative_ratio: dec!(0.50),
        }
    }

    // -------------------------------------------------------------------
    // 1. Variant A against the formula, not a stored constant
    // -------------------------------------------------------------------
    #[test]
    fn test_netted_variant_matches_formula() {
        let params = reference_params();
        let out = solve_invoice_netted(&params).unwrap();
        let r = &out.result;

        // client payment = 170_000 * 7.1 = 1_207_000
        assert_eq!(r.client_payment, dec!(1207000.0000));

        // denominator = 1 - 0.13*(1 - 0.5) = 0.935
        let expected_invoice = checked_div(dec!(1207000), dec!(0.935), "test").unwrap();
        assert_eq!(r.invoice_amount, expected_invoice);

        assert_eq!(r.tax_rebate_amount, r.invoice_amount * dec!(0.13));
        assert_eq!(r.agent_profit, r.tax_rebate_amount * dec!(0.50));
        assert_eq!(r.your_tax_rebate_share, r.tax_rebate_amount - r.agent_profit);
    }

    // -------------------------------------------------------------------
    // 2. Variant A self-reconciles: client payment + rebate - invoice
    //    equals the agent's profit to within one minor currency unit
    // -------------------------------------------------------------------
    #[test]
    fn test_netted_variant_reconciles() {
        let params = reference_params();
        let r = solve_invoice_netted(&params).unwrap().result;

        let agent_net = r.client_payment + r.tax_rebate_amount - r.invoice_amount;
        assert!(
            (agent_net - r.agent_profit).abs() < dec!(0.01),
            "agent net {} should match agent profit {}",
            agent_net,
            r.agent_profit
        );
    }

    // -------------------------------------------------------------------
    // 3. Variant B against the formula
    // -------------------------------------------------------------------
    #[test]
    fn test_on_top_variant_matches_formula() {
        let params = reference_params();
        let out = solve_invoice_on_top(&params).unwrap();
        let r = &out.result;

        // X = 1_207_000 * 1.13 / (1 + 0.13*0.5) = 1_363_910 / 1.065
        let expected_invoice = checked_div(dec!(1363910), dec!(1.065), "test").unwrap();
        assert_eq!(r.invoice_amount, expected_invoice);

        // T = X * 0.13 / 1.13
        let expected_rebate =
            checked_div(r.invoice_amount * dec!(0.13), dec!(1.13), "test").unwrap();
        assert_eq!(r.tax_rebate_amount, expected_rebate);
        assert_eq!(r.agent_profit, expected_rebate * dec!(0.50));
    }

    // -------------------------------------------------------------------
    // 4. The two variants are not interchangeable
    // -------------------------------------------------------------------
    #[test]
    fn test_variants_diverge() {
        let params = reference_params();
        let netted = solve_invoice_netted(&params).unwrap().result;
        let on_top = solve_invoice_on_top(&params).unwrap().result;
        assert_ne!(netted.invoice_amount, on_top.invoice_amount);
    }

    // -------------------------------------------------------------------
    // 5. Dispatch by formula kind
    // -------------------------------------------------------------------
    #[test]
    fn test_solve_invoice_dispatch() {
        let params = reference_params();
        let netted = solve_invoice(FormulaKind::RebateNetted, &params).unwrap();
        let direct = solve_invoice_netted(&params).unwrap();
        assert_eq!(netted.result, direct.result);

        let on_top = solve_invoice(FormulaKind::RebateOnTop, &params).unwrap();
        assert_eq!(on_top.result, solve_invoice_on_top(&params).unwrap().result);
    }

    // -------------------------------------------------------------------
    // 6. Degenerate denominator, Variant A: 1 - R*(1-A) == 0
    // -------------------------------------------------------------------
    #[test]
    fn test_netted_zero_denominator_rejected() {
        // R = 1, A = 0 zeroes the denominator. Out of the validated domain,
        // so exercised at the formula core, where the check lives.
        let params = CalculationParams {
            sales_amount: dec!(1000),
            exchange_rate: dec!(7),
            tax_rebate_rate: dec!(1),
            agent_relative_ratio: dec!(0),
        };
        match invoice_netted_core(&params).unwrap_err() {
            RebateError::DegenerateDenominator { context } => {
                assert_eq!(context, "1 - R*(1 - A)");
            }
            other => panic!("Expected DegenerateDenominator, got {:?}", other),
        }
    }

    // -------------------------------------------------------------------
    // 7. Degenerate denominator, Variant B: 1 + R*A == 0
    // -------------------------------------------------------------------
    #[test]
    fn test_on_top_zero_denominator_rejected() {
        let params = CalculationParams {
            sales_amount: dec!(1000),
            exchange_rate: dec!(7),
            tax_rebate_rate: dec!(0.5),
            agent_relative_ratio: dec!(-2),
        };
        match invoice_on_top_core(&params).unwrap_err() {
            RebateError::DegenerateDenominator { context } => {
                assert_eq!(context, "1 + R*A");
            }
            other => panic!("Expected DegenerateDenominator, got {:?}", other),
        }
    }

    // -------------------------------------------------------------------
    // 8. Near-degenerate boundary still solves
    // -------------------------------------------------------------------
    #[test]
    fn test_near_degenerate_boundary_solves() {
        let params = CalculationParams {
            sales_amount: dec!(1000),
            exchange_rate: dec!(7),
            tax_rebate_rate: dec!(0.9999999999),
            agent_relative_ratio: dec!(0),
        };
        // denominator = 1e-10, a legal if extreme parameter set
        let r = solve_invoice_netted(&params).unwrap().result;
        assert!(r.invoice_amount > dec!(7000));
    }

    // -------------------------------------------------------------------
    // 9. Parameter range validation
    // -------------------------------------------------------------------
    #[test]
    fn test_param_validation() {
        let base = reference_params();

        let mut p = base.clone();
        p.sales_amount = Decimal::ZERO;
        assert!(matches!(
            solve_invoice_netted(&p).unwrap_err(),
            RebateError::InvalidInput { ref field, .. } if field == "sales_amount"
        ));

        let mut p = base.clone();
        p.exchange_rate = dec!(-7.1);
        assert!(matches!(
            solve_invoice_netted(&p).unwrap_err(),
            RebateError::InvalidInput { ref field, .. } if field == "exchange_rate"
        ));

        let mut p = base.clone();
        p.tax_rebate_rate = dec!(1);
        assert!(matches!(
            solve_invoice_on_top(&p).unwrap_err(),
            RebateError::InvalidInput { ref field, .. } if field == "tax_rebate_rate"
        ));

        let mut p = base;
        p.agent_relative_ratio = dec!(1.5);
        assert!(matches!(
            solve_invoice_on_top(&p).unwrap_err(),
            RebateError::InvalidInput { ref field, .. } if field == "agent_relative_ratio"
        ));
    }

    // -------------------------------------------------------------------
    // 10. Percent-form constructor normalizes at the boundary
    // -------------------------------------------------------------------
    #[test]
    fn test_from_percent_constructor() {
        let p = CalculationParams::from_percent(dec!(170000), dec!(7.1), dec!(13), dec!(50))
            .unwrap();
        assert_eq!(p.tax_rebate_rate, dec!(0.13));
        assert_eq!(p.agent_relative_ratio, dec!(0.5));

        let err =
            CalculationParams::from_percent(dec!(170000), dec!(7.1), dec!(13), dec!(120))
                .unwrap_err();
        assert!(matches!(err, RebateError::InvalidInput { .. }));
    }

    // -------------------------------------------------------------------
    // 11. Profit analysis
    // -------------------------------------------------------------------
    #[test]
    fn test_profit_analysis() {
        let params = reference_params();
        let r = solve_invoice_netted(&params).unwrap().result;
        let analysis = analyze_profit(dec!(1000000), &r).unwrap();

        assert_eq!(
            analysis.your_total_income,
            r.client_payment + r.your_tax_rebate_share
        );
        assert_eq!(
            analysis.your_net_profit,
            analysis.your_total_income - dec!(1000000)
        );
        assert_eq!(
            analysis.gross_markup,
            checked_div(analysis.your_net_profit, dec!(1000000), "test").unwrap()
        );

        assert!(matches!(
            analyze_profit(Decimal::ZERO, &r).unwrap_err(),
            RebateError::InvalidInput { ref field, .. } if field == "purchase_amount"
        ));
    }
}
