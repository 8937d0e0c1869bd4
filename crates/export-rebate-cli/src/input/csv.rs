//! Product-situation CSV reader.
//!
//! Expected column order, one record per row after a header row:
//! factory name, product name, tax rebate rate, foreign sales amount,
//! actual value, prepaid amount, tax point, agree-to-invoice flag,
//! overprice-allowed flag. Rates accept either a `%`-suffixed percentage
//! or a bare fraction. Flags accept yes/true/是 in any case.

use std::str::FromStr;

use rust_decimal::Decimal;

use export_rebate_core::rounding::quantize;
use export_rebate_core::ProductSituation;

use crate::input::file::resolve_path;

const EXPECTED_COLUMNS: usize = 9;

/// Read the full product list from a CSV file.
pub fn read_product_situations(
    path: &str,
) -> Result<Vec<ProductSituation>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(&canonical)
        .map_err(|e| format!("Failed to open '{}': {}", canonical.display(), e))?;

    let mut products = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        // Header is row 1, data starts at row 2
        let row = index + 2;
        if record.len() < EXPECTED_COLUMNS {
            return Err(format!(
                "Row {} has {} columns, expected {}",
                row,
                record.len(),
                EXPECTED_COLUMNS
            )
            .into());
        }
        products.push(parse_row(&record, row)?);
    }
    Ok(products)
}

fn parse_row(
    record: &csv::StringRecord,
    row: usize,
) -> Result<ProductSituation, Box<dyn std::error::Error>> {
    Ok(ProductSituation {
        factory_name: record[0].to_string(),
        product_name: record[1].to_string(),
        tax_rebate_rate: parse_rate(&record[2], row, "tax rebate rate")?,
        sales_amount_foreign: parse_amount(&record[3], row, "foreign sales amount")?,
        actual_purchase_amount: parse_amount(&record[4], row, "actual value")?,
        prepaid_amount: parse_amount(&record[5], row, "prepaid amount")?,
        tax_point: parse_rate(&record[6], row, "tax point")?,
        agree_to_invoice_agent: parse_flag(&record[7]),
        allow_overprice_invoice: parse_flag(&record[8]),
    })
}

/// A rate cell: `13%` means 0.13, a bare `0.13` is taken as-is.
fn parse_rate(cell: &str, row: usize, field: &str) -> Result<Decimal, Box<dyn std::error::Error>> {
    let trimmed = cell.trim();
    if let Some(percent) = trimmed.strip_suffix('%') {
        let value = parse_amount(percent, row, field)?;
        return Ok(quantize(value / Decimal::ONE_HUNDRED));
    }
    parse_amount(trimmed, row, field)
}

/// An amount cell; thousands separators are tolerated.
fn parse_amount(
    cell: &str,
    row: usize,
    field: &str,
) -> Result<Decimal, Box<dyn std::error::Error>> {
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned)
        .map(quantize)
        .map_err(|_| format!("Row {}: invalid {} '{}'", row, field, cell.trim()).into())
}

fn parse_flag(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed == "是" || trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("yes")
}
