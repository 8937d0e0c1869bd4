use export_rebate_core::rates;
use export_rebate_core::rounding::checked_div;
use export_rebate_core::solver::{self, FormulaKind};
use export_rebate_core::{CalculationParams, RebateError};
use pretty_assertions::{assert_eq, assert_ne};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Invoice solver tests
// ===========================================================================

fn sample_deal() -> CalculationParams {
    // A typical export deal: 170k USD at 7.1, 13% rebate, 50/50 split
    CalculationParams {
        sales_amount: dec!(170_000),
        exchange_rate: dec!(7.1),
        tax_rebate_rate: dec!(0.13),
        agent_relative_ratio: dec!(0.50),
    }
}

#[test]
fn test_netted_invoice_matches_formula() {
    let result = solver::solve_invoice_netted(&sample_deal()).unwrap();
    let r = &result.result;

    // Client payment = 170k * 7.1 = 1,207,000 RMB
    assert_eq!(r.client_payment, dec!(1_207_000));

    // X = S*E / (1 - R*(1-A)) = 1,207,000 / (1 - 0.13*0.5) = 1,207,000 / 0.935
    let expected = checked_div(dec!(1_207_000), dec!(0.935), "test").unwrap();
    assert_eq!(r.invoice_amount, expected);

    // T = X * R, profit = T * A
    assert_eq!(r.tax_rebate_amount, r.invoice_amount * dec!(0.13));
    assert_eq!(r.agent_profit, r.tax_rebate_amount * dec!(0.50));
}

#[test]
fn test_on_top_invoice_matches_formula() {
    let result = solver::solve_invoice_on_top(&sample_deal()).unwrap();
    let r = &result.result;

    // X = S*E*(1+R) / (1 + R*A) = 1,207,000 * 1.13 / 1.065
    let expected = checked_div(dec!(1_207_000) * dec!(1.13), dec!(1.065), "test").unwrap();
    assert_eq!(r.invoice_amount, expected);

    // T = X*R / (1+R)
    let expected_rebate =
        checked_div(r.invoice_amount * dec!(0.13), dec!(1.13), "test").unwrap();
    assert_eq!(r.tax_rebate_amount, expected_rebate);
}

#[test]
fn test_variants_disagree_on_the_same_deal() {
    let netted = solver::solve_invoice_netted(&sample_deal()).unwrap().result;
    let on_top = solver::solve_invoice_on_top(&sample_deal()).unwrap().result;
    assert_ne!(netted.invoice_amount, on_top.invoice_amount);
    // The additive formula grosses the rebate on top, so it invoices more
    assert!(on_top.invoice_amount > netted.invoice_amount);
}

#[test]
fn test_dispatch_matches_direct_calls() {
    let params = sample_deal();
    let direct = solver::solve_invoice_netted(&params).unwrap().result;
    let dispatched = solver::solve_invoice(FormulaKind::RebateNetted, &params)
        .unwrap()
        .result;
    assert_eq!(direct, dispatched);
}

#[test]
fn test_agent_cash_flow_balances_per_variant() {
    for kind in [FormulaKind::RebateNetted, FormulaKind::RebateOnTop] {
        let r = solver::solve_invoice(kind, &sample_deal()).unwrap().result;
        // Agent receives the client payment and the rebate, pays the invoice;
        // what remains is exactly its profit share.
        let net = r.client_payment + r.tax_rebate_amount - r.invoice_amount;
        assert!(
            (net - r.agent_profit).abs() < dec!(0.01),
            "{kind}: net {net} vs profit {}",
            r.agent_profit,
        );
    }
}

#[test]
fn test_rejects_out_of_range_rebate_rate() {
    let params = CalculationParams {
        tax_rebate_rate: dec!(1),
        ..sample_deal()
    };
    for kind in [FormulaKind::RebateNetted, FormulaKind::RebateOnTop] {
        let err = solver::solve_invoice(kind, &params).unwrap_err();
        assert!(matches!(err, RebateError::InvalidInput { .. }));
    }
}

#[test]
fn test_from_percent_boundary() {
    let params =
        CalculationParams::from_percent(dec!(170_000), dec!(7.1), dec!(13), dec!(50)).unwrap();
    assert_eq!(params.tax_rebate_rate, dec!(0.13));
    assert_eq!(params.agent_relative_ratio, dec!(0.5));

    let err = CalculationParams::from_percent(dec!(170_000), dec!(7.1), dec!(13), dec!(120))
        .unwrap_err();
    assert!(matches!(err, RebateError::InvalidInput { .. }));
}

// ===========================================================================
// Rate converter tests
// ===========================================================================

#[test]
fn test_absolute_to_relative() {
    // 6.5 absolute points of a 13% rebate is half of it
    let ratio = rates::absolute_to_relative(dec!(0.13), dec!(6.5)).unwrap();
    assert_eq!(ratio, dec!(0.5));
}

#[test]
fn test_relative_to_absolute() {
    let points = rates::relative_to_absolute(dec!(0.13), dec!(0.5)).unwrap();
    assert_eq!(points, dec!(6.5));
}

#[test]
fn test_absolute_share_cannot_exceed_rebate_rate() {
    // Asking for 14 points out of a 13% rebate is over 100% of it
    let err = rates::absolute_to_relative(dec!(0.13), dec!(14)).unwrap_err();
    assert!(matches!(err, RebateError::InvalidInput { .. }));
}

#[test]
fn test_rate_share_is_invariant_across_conversion() {
    // Whatever representation the parties negotiate in, the agent's cut of
    // the rebate is the same money.
    let rebate_rate = dec!(0.13);
    let absolute_points = dec!(3.9);
    let ratio = rates::absolute_to_relative(rebate_rate, absolute_points).unwrap();

    let params = CalculationParams {
        agent_relative_ratio: ratio,
        ..sample_deal()
    };
    let r = solver::solve_invoice_netted(&params).unwrap().result;
    // 3.9 points of the invoice, directly
    let direct: Decimal = r.invoice_amount * dec!(0.039);
    assert!((r.agent_profit - direct).abs() < dec!(0.01));
}
