//! Settlement calculator.
//!
//! Turns factory allocations into full per-record financial details (tax
//! rebate, agent profit, pre/post-shipment balances, overprice tax, refunds)
//! and rolls them up into aggregate totals. The allocation/source join is by
//! the `(factory_name, product_name)` composite key, never by position.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::allocation::{allocate_invoice_amounts, validate_product_situations};
use crate::error::RebateError;
use crate::rounding::checked_div;
use crate::solver::invoice_on_top_core;
use crate::types::{
    with_metadata, CalculationParams, ComputationOutput, Money, MultiProductCalculationResult,
    ProductCalculationDetail, ProductSituation, Rate,
};
use crate::RebateResult;

/// One minor currency unit: the reconciliation tolerance.
const RECONCILIATION_TOLERANCE: Decimal = dec!(0.01);

/// Per-record rebate formula shared across the engine: `T = X·R / (1 + R)`.
pub fn rebate_amount(invoice_amount: Money, tax_rebate_rate: Rate) -> RebateResult<Money> {
    checked_div(
        invoice_amount * tax_rebate_rate,
        Decimal::ONE + tax_rebate_rate,
        "rebate formula denominator",
    )
}

/// Allocate `total_invoice_amount` over `products` and derive the complete
/// settlement detail for every record, in input order.
pub fn settle_products(
    total_invoice_amount: Money,
    products: &[ProductSituation],
    agent_relative_ratio: Rate,
) -> RebateResult<ComputationOutput<MultiProductCalculationResult>> {
    validate_agent_ratio(agent_relative_ratio)?;

    let allocations = allocate_invoice_amounts(total_invoice_amount, products)?;

    let by_key: HashMap<(&str, &str), &ProductSituation> = products
        .iter()
        .map(|p| ((p.factory_name.as_str(), p.product_name.as_str()), p))
        .collect();

    let mut warnings: Vec<String> = Vec::new();
    let mut total_tax_rebate = Decimal::ZERO;
    let mut total_agent_profit = Decimal::ZERO;
    let mut your_total_share = Decimal::ZERO;
    let mut details = Vec::with_capacity(allocations.len());

    for allocation in &allocations {
        let situation = by_key
            .get(&(
                allocation.factory_name.as_str(),
                allocation.product_name.as_str(),
            ))
            .ok_or_else(|| RebateError::UnmatchedAllocation {
                factory: allocation.factory_name.clone(),
                product: allocation.product_name.clone(),
            })?;

        let tax_rebate = allocation.tax_rebate_amount;
        let agent_profit = tax_rebate * agent_relative_ratio;

        let balance_before_shipment =
            situation.actual_purchase_amount - situation.prepaid_amount;
        let balance_after_rebating =
            allocation.allocated_invoice_amount - balance_before_shipment;

        let overprice = allocation.allocated_invoice_amount - situation.actual_purchase_amount;
        let overprice_tax = overprice * situation.tax_point;

        let prepayment_refund = if situation.agree_to_invoice_agent {
            situation.prepaid_amount
        } else {
            Decimal::ZERO
        };

        if overprice < Decimal::ZERO && !situation.is_fixed_invoice_amount() {
            warnings.push(format!(
                "'{}' / '{}' is invoiced {} below its actual value; its overprice refund is negative",
                allocation.factory_name,
                allocation.product_name,
                crate::rounding::format_currency(-overprice),
            ));
        }

        total_tax_rebate += tax_rebate;
        total_agent_profit += agent_profit;
        your_total_share += tax_rebate - agent_profit;

        details.push(ProductCalculationDetail {
            factory_name: allocation.factory_name.clone(),
            product_name: allocation.product_name.clone(),
            actual_purchase_amount: situation.actual_purchase_amount,
            invoice_amount: allocation.allocated_invoice_amount,
            tax_rebate_amount: tax_rebate,
            agent_profit,
            agent_balance_before_shipment: balance_before_shipment,
            agent_balance_after_rebating: balance_after_rebating,
            overprice_tax,
            prepayment_refund_amount: prepayment_refund,
            overprice_refund_amount: allocation.overprice_refund_amount,
        });
    }

    let result = MultiProductCalculationResult {
        total_invoice_amount,
        total_tax_rebate_amount: total_tax_rebate,
        total_agent_profit,
        your_total_tax_rebate_share: your_total_share,
        details,
    };

    Ok(with_metadata(
        "Multi-factory settlement: proportional allocation with residual-to-last, per-record rebate T = X*R/(1+R)",
        &serde_json::json!({
            "agent_relative_ratio": agent_relative_ratio,
            "residual_policy": "last flexible record in input order",
        }),
        warnings,
        result,
    ))
}

/// Derive the grand total invoice amount from the records themselves: each
/// product is solved with the additive (rebate-on-top) formula against its
/// own sales amount and rebate rate, and the invoices are summed.
pub fn derive_total_invoice_amount(
    products: &[ProductSituation],
    exchange_rate: Decimal,
    agent_relative_ratio: Rate,
) -> RebateResult<Money> {
    validate_product_situations(products)?;
    validate_agent_ratio(agent_relative_ratio)?;
    if exchange_rate <= Decimal::ZERO {
        return Err(RebateError::InvalidInput {
            field: "exchange_rate".into(),
            reason: "Exchange rate must be greater than 0".into(),
        });
    }

    let participating_total: Decimal = products
        .iter()
        .filter(|p| p.agree_to_invoice_agent)
        .map(|p| p.actual_purchase_amount)
        .sum();
    if participating_total.is_zero() {
        return Err(RebateError::InvalidInput {
            field: "products".into(),
            reason: "No factory agrees to invoice the agent".into(),
        });
    }

    let mut total = Decimal::ZERO;
    for p in products {
        let params = CalculationParams {
            sales_amount: p.sales_amount_foreign,
            exchange_rate,
            tax_rebate_rate: p.tax_rebate_rate,
            agent_relative_ratio,
        };
        total += invoice_on_top_core(&params)?.invoice_amount;
    }
    Ok(total)
}

/// Cash-flow cross-check over a settled result.
///
/// The agent's income is the client payment plus the rebate it claims; its
/// expense is the total invoiced amount. The net must equal the agent's
/// profit share to within one minor currency unit. Exact when every record
/// shares one rebate rate; heterogeneous rates can drift, which this check
/// reports rather than masks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationCheck {
    pub agent_income: Money,
    pub agent_expense: Money,
    pub agent_net_profit: Money,
    pub total_agent_profit: Money,
}

impl ReconciliationCheck {
    pub fn is_balanced(&self) -> bool {
        (self.agent_net_profit - self.total_agent_profit).abs() < RECONCILIATION_TOLERANCE
    }
}

/// Build the reconciliation check for a settled result.
pub fn reconcile(
    client_payment: Money,
    result: &MultiProductCalculationResult,
) -> ReconciliationCheck {
    let agent_income = client_payment + result.total_tax_rebate_amount;
    let agent_expense = result.total_invoice_amount;
    ReconciliationCheck {
        agent_income,
        agent_expense,
        agent_net_profit: agent_income - agent_expense,
        total_agent_profit: result.total_agent_profit,
    }
}

/// Consignor's total take: client payment plus the retained rebate share.
pub fn your_total_income(client_payment: Money, result: &MultiProductCalculationResult) -> Money {
    client_payment + result.your_total_tax_rebate_share
}

/// Consignor's net profit: total income minus purchase cost and the tax cost
/// of over-invoicing.
pub fn your_net_profit(client_payment: Money, result: &MultiProductCalculationResult) -> Money {
    let total_actual: Decimal = result
        .details
        .iter()
        .map(|d| d.actual_purchase_amount)
        .sum();
    let total_overprice_tax: Decimal = result.details.iter().map(|d| d.overprice_tax).sum();
    your_total_income(client_payment, result) - total_actual - total_overprice_tax
}

/// Net profit over total purchase cost, as a fraction.
pub fn gross_markup(net_profit: Money, total_purchase_amount: Money) -> RebateResult<Rate> {
    checked_div(net_profit, total_purchase_amount, "gross markup")
}

fn validate_agent_ratio(agent_relative_ratio: Rate) -> RebateResult<()> {
    if agent_relative_ratio < Decimal::ZERO || agent_relative_ratio > Decimal::ONE {
        return Err(RebateError::InvalidInput {
            field: "agent_relative_ratio".into(),
            reason: "Agent relative ratio must be between 0 and 100%".into(),
        });
    }
    Ok(())
}
