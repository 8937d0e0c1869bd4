//! Factory allocation engine.
//!
//! Splits one total invoice amount across product/factory records. Records
//! that refuse agent invoicing or over-invoicing are **fixed**: they are
//! invoiced at exactly their actual value. Everything else is **flexible**
//! and shares the remaining budget in proportion to actual value, except the
//! last flexible record, which receives the exact residual so that the sum
//! of allocations always equals the supplied total. The residual-to-last
//! tie-break is the original settlement convention and is kept as-is.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::error::RebateError;
use crate::rounding::checked_div;
use crate::settlement::rebate_amount;
use crate::types::{FactoryAllocation, Money, ProductSituation};
use crate::RebateResult;

/// Distribute `total_invoice_amount` over `products`.
///
/// Returns one allocation per input record, in input order. The sum of
/// `allocated_invoice_amount` equals `total_invoice_amount` exactly.
pub fn allocate_invoice_amounts(
    total_invoice_amount: Money,
    products: &[ProductSituation],
) -> RebateResult<Vec<FactoryAllocation>> {
    validate_product_situations(products)?;

    let flexible: Vec<usize> = products
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_fixed_invoice_amount())
        .map(|(i, _)| i)
        .collect();

    let fixed_total: Decimal = products
        .iter()
        .filter(|p| p.is_fixed_invoice_amount())
        .map(|p| p.actual_purchase_amount)
        .sum();
    let flexible_total: Decimal = flexible
        .iter()
        .map(|&i| products[i].actual_purchase_amount)
        .sum();

    if !flexible.is_empty() && flexible_total.is_zero() {
        return Err(RebateError::DivisionByZero {
            context: "flexible actual value total".into(),
        });
    }

    // Budget left for the flexible partition once fixed records are paid.
    let allocatable = total_invoice_amount - fixed_total;

    let mut flexible_amounts = vec![Decimal::ZERO; products.len()];
    let mut running_total = fixed_total;
    for (pos, &i) in flexible.iter().enumerate() {
        let amount = if pos + 1 == flexible.len() {
            // Last flexible record absorbs all rounding drift.
            total_invoice_amount - running_total
        } else {
            let share = checked_div(
                products[i].actual_purchase_amount,
                flexible_total,
                "flexible actual value total",
            )?;
            allocatable * share
        };
        running_total += amount;
        flexible_amounts[i] = amount;
    }

    products
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let (allocated, refund) = if p.is_fixed_invoice_amount() {
                (p.actual_purchase_amount, Decimal::ZERO)
            } else {
                let allocated = flexible_amounts[i];
                let refund =
                    (allocated - p.actual_purchase_amount) * (Decimal::ONE - p.tax_point);
                (allocated, refund)
            };
            Ok(FactoryAllocation {
                factory_name: p.factory_name.clone(),
                product_name: p.product_name.clone(),
                actual_purchase_amount: p.actual_purchase_amount,
                allocated_invoice_amount: allocated,
                tax_rebate_amount: rebate_amount(allocated, p.tax_rebate_rate)?,
                overprice_refund_amount: refund,
            })
        })
        .collect()
}

/// Validate an input list: field ranges, non-empty identity, and uniqueness
/// of the `(factory_name, product_name)` composite key.
pub fn validate_product_situations(products: &[ProductSituation]) -> RebateResult<()> {
    if products.is_empty() {
        return Err(RebateError::InvalidInput {
            field: "products".into(),
            reason: "Product list must not be empty".into(),
        });
    }

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for p in products {
        if p.factory_name.trim().is_empty() {
            return Err(RebateError::InvalidInput {
                field: "factory_name".into(),
                reason: "Factory name must not be empty".into(),
            });
        }
        if p.product_name.trim().is_empty() {
            return Err(RebateError::InvalidInput {
                field: "product_name".into(),
                reason: "Product name must not be empty".into(),
            });
        }
        if !seen.insert((p.factory_name.as_str(), p.product_name.as_str())) {
            return Err(RebateError::DuplicateRecord {
                factory: p.factory_name.clone(),
                product: p.product_name.clone(),
            });
        }
        if p.tax_rebate_rate <= Decimal::ZERO || p.tax_rebate_rate >= Decimal::ONE {
            return Err(RebateError::InvalidInput {
                field: "tax_rebate_rate".into(),
                reason: format!(
                    "Tax rebate rate for '{}' must be strictly between 0 and 100%",
                    p.product_name
                ),
            });
        }
        if p.sales_amount_foreign <= Decimal::ZERO {
            return Err(RebateError::InvalidInput {
                field: "sales_amount_foreign".into(),
                reason: format!("Sales amount for '{}' must be greater than 0", p.product_name),
            });
        }
        if p.actual_purchase_amount <= Decimal::ZERO {
            return Err(RebateError::InvalidInput {
                field: "actual_purchase_amount".into(),
                reason: format!(
                    "Actual purchase amount for '{}' must be greater than 0",
                    p.product_name
                ),
            });
        }
        if p.prepaid_amount < Decimal::ZERO {
            return Err(RebateError::InvalidInput {
                field: "prepaid_amount".into(),
                reason: format!("Prepaid amount for '{}' must not be negative", p.product_name),
            });
        }
        if p.tax_point < Decimal::ZERO || p.tax_point >= Decimal::ONE {
            return Err(RebateError::InvalidInput {
                field: "tax_point".into(),
                reason: format!(
                    "Tax point for '{}' must be in [0, 100%)",
                    p.product_name
                ),
            });
        }
    }
    Ok(())
}
