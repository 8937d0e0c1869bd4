use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use export_rebate_core::settlement;

use crate::input;
use crate::output::report;

/// Flags take the agent share in percent; the engine wants a fraction.
fn percent_to_fraction(percent: Decimal) -> Result<Decimal, Box<dyn std::error::Error>> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(format!("--agent-share must be between 0 and 100, got {}", percent).into());
    }
    Ok(percent / Decimal::ONE_HUNDRED)
}

/// Arguments for multi-factory consignment settlement
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SettleArgs {
    /// Path to product-situation CSV file
    #[arg(long)]
    pub input: String,

    /// Total invoice amount in domestic currency; derived from the records
    /// when omitted (requires --exchange-rate)
    #[arg(long, alias = "total")]
    pub total_invoice: Option<Decimal>,

    /// Exchange rate to domestic currency
    #[arg(long, alias = "rate")]
    pub exchange_rate: Option<Decimal>,

    /// Agent's share of the rebate, in percent of the rebate
    #[arg(long, alias = "share")]
    pub agent_share: Decimal,

    /// Client payment in domestic currency; derived from the records when
    /// an exchange rate is available
    #[arg(long)]
    pub client_payment: Option<Decimal>,

    /// Write the per-factory settlement report to this CSV path
    #[arg(long)]
    pub export: Option<String>,
}

pub fn run_settle(args: SettleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let products = input::csv::read_product_situations(&args.input)?;

    let agent_ratio = percent_to_fraction(args.agent_share)?;

    let total = match args.total_invoice {
        Some(total) => total,
        None => {
            let exchange_rate = args
                .exchange_rate
                .ok_or("--exchange-rate is required when --total-invoice is omitted")?;
            settlement::derive_total_invoice_amount(&products, exchange_rate, agent_ratio)?
        }
    };

    let settled = settlement::settle_products(total, &products, agent_ratio)?;

    let mut value = serde_json::to_value(&settled)?;

    if let Some(ref path) = args.export {
        report::write_settlement_report(path, &settled.result, &products)?;
        value["report"] = report::report_written(path);
    }

    // Reconcile when the client payment is known, explicitly or via the
    // exchange rate.
    let client_payment = args.client_payment.or_else(|| {
        args.exchange_rate.map(|rate| {
            products
                .iter()
                .map(|p| p.sales_amount_foreign * rate)
                .sum()
        })
    });
    if let Some(payment) = client_payment {
        let check = settlement::reconcile(payment, &settled.result);
        let mut reconciliation = serde_json::to_value(&check)?;
        reconciliation["balanced"] = Value::Bool(check.is_balanced());
        value["reconciliation"] = reconciliation;
    }

    Ok(value)
}
