use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use export_rebate_core::solver::{self, FormulaKind};
use export_rebate_core::{rates, CalculationParams};

use crate::input;

/// Which rebate-sharing formula to solve with.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormulaArg {
    /// Rebate netted out of the invoice: X = S*E / (1 - R*(1 - A))
    Netted,
    /// Rebate grossed on top of the invoice: X = S*E*(1+R) / (1 + R*A)
    OnTop,
}

impl From<FormulaArg> for FormulaKind {
    fn from(arg: FormulaArg) -> Self {
        match arg {
            FormulaArg::Netted => FormulaKind::RebateNetted,
            FormulaArg::OnTop => FormulaKind::RebateOnTop,
        }
    }
}

/// Arguments for the single-transaction invoice solver
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct InvoiceArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Sales amount in foreign currency
    #[arg(long, alias = "sales")]
    pub sales_amount: Option<Decimal>,

    /// Exchange rate to domestic currency
    #[arg(long, alias = "rate")]
    pub exchange_rate: Option<Decimal>,

    /// Tax rebate rate, in percent (e.g. 13 for 13%)
    #[arg(long)]
    pub rebate_rate: Option<Decimal>,

    /// Agent's share of the rebate, in percent of the rebate
    #[arg(long, alias = "share", conflicts_with = "agent_absolute")]
    pub agent_share: Option<Decimal>,

    /// Agent's cut in absolute percentage points of the invoice value
    /// (e.g. 6.5); converted to a relative share of the rebate
    #[arg(long)]
    pub agent_absolute: Option<Decimal>,

    /// Formula variant
    #[arg(long, value_enum, default_value = "netted")]
    pub formula: FormulaArg,

    /// Actual purchase amount; when given, consignor profitability is included
    #[arg(long)]
    pub purchase_amount: Option<Decimal>,
}

/// JSON shape accepted via --input or piped stdin. Rates are percentages,
/// matching the flag convention.
#[derive(Debug, Serialize, Deserialize)]
struct InvoiceInput {
    sales_amount: Decimal,
    exchange_rate: Decimal,
    rebate_rate: Decimal,
    agent_share: Decimal,
    #[serde(default)]
    purchase_amount: Option<Decimal>,
}

pub fn run_invoice(args: InvoiceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let invoice_input = if let Some(ref path) = args.input {
        input::file::read_json::<InvoiceInput>(path)?
    } else if let Some(parsed) = input::stdin::read_stdin_as::<InvoiceInput>()? {
        parsed
    } else {
        let rebate_rate = args
            .rebate_rate
            .ok_or("--rebate-rate is required (or provide --input)")?;
        let agent_share = match (args.agent_share, args.agent_absolute) {
            (Some(share), _) => share,
            (None, Some(points)) => {
                // Absolute points of invoice value; converted to the
                // engine-native relative share of the rebate.
                let ratio =
                    rates::absolute_to_relative(rebate_rate / Decimal::ONE_HUNDRED, points)?;
                ratio * Decimal::ONE_HUNDRED
            }
            (None, None) => {
                return Err("--agent-share or --agent-absolute is required (or provide --input)".into())
            }
        };
        InvoiceInput {
            sales_amount: args
                .sales_amount
                .ok_or("--sales-amount is required (or provide --input)")?,
            exchange_rate: args
                .exchange_rate
                .ok_or("--exchange-rate is required (or provide --input)")?,
            rebate_rate,
            agent_share,
            purchase_amount: args.purchase_amount,
        }
    };

    let purchase = invoice_input.purchase_amount;
    let params = CalculationParams::from_percent(
        invoice_input.sales_amount,
        invoice_input.exchange_rate,
        invoice_input.rebate_rate,
        invoice_input.agent_share,
    )?;

    let solved = solver::solve_invoice(args.formula.into(), &params)?;
    let mut value = serde_json::to_value(&solved)?;

    if let Some(purchase_amount) = purchase {
        let analysis = solver::analyze_profit(purchase_amount, &solved.result)?;
        value["profit_analysis"] = serde_json::to_value(&analysis)?;
    }

    Ok(value)
}
