//! Settlement report export.
//!
//! One row per product calculation detail, joined back to its source record
//! by the `(factory, product)` composite key. Currency cells carry 2 decimal
//! places, rate cells are rendered as percentages.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use export_rebate_core::rounding::format_percentage;
use export_rebate_core::{MultiProductCalculationResult, ProductSituation};

const REPORT_HEADER: [&str; 15] = [
    "Factory Name",
    "Product Name",
    "Tax Rebate Rate",
    "Actual Value",
    "Prepaid Amount",
    "Tax Point",
    "Agrees To Invoice Agent",
    "Overprice Allowed",
    "Invoice Amount",
    "Tax Rebate Amount",
    "Balance Before Shipment",
    "Balance After Rebating",
    "Overprice Tax",
    "Public Refund",
    "Private Refund",
];

/// Write the per-factory settlement report as CSV.
pub fn write_settlement_report(
    path: &str,
    result: &MultiProductCalculationResult,
    products: &[ProductSituation],
) -> Result<(), Box<dyn std::error::Error>> {
    let by_key: HashMap<(&str, &str), &ProductSituation> = products
        .iter()
        .map(|p| ((p.factory_name.as_str(), p.product_name.as_str()), p))
        .collect();

    let mut file =
        File::create(path).map_err(|e| format!("Failed to create '{}': {}", path, e))?;
    // UTF-8 BOM so Excel decodes non-ASCII factory and product names
    file.write_all("\u{FEFF}".as_bytes())
        .map_err(|e| format!("Failed to write '{}': {}", path, e))?;

    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(REPORT_HEADER)?;

    for detail in &result.details {
        let situation = by_key
            .get(&(detail.factory_name.as_str(), detail.product_name.as_str()))
            .ok_or_else(|| {
                format!(
                    "No source record for '{}' / '{}'",
                    detail.factory_name, detail.product_name
                )
            })?;

        wtr.write_record([
            detail.factory_name.as_str(),
            detail.product_name.as_str(),
            &format_percentage(situation.tax_rebate_rate),
            &cell(detail.actual_purchase_amount),
            &cell(situation.prepaid_amount),
            &format_percentage(situation.tax_point),
            flag(situation.agree_to_invoice_agent),
            flag(situation.allow_overprice_invoice),
            &cell(detail.invoice_amount),
            &cell(detail.tax_rebate_amount),
            &cell(detail.agent_balance_before_shipment),
            &cell(detail.agent_balance_after_rebating),
            &cell(detail.overprice_tax),
            &cell(detail.prepayment_refund_amount),
            &cell(detail.overprice_refund_amount),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Currency cell: plain 2-decimal number, no grouping.
fn cell(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

fn flag(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// JSON echo of the report location for the command envelope.
pub fn report_written(path: &str) -> Value {
    Value::String(path.to_string())
}
