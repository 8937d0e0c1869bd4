use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use export_rebate_core::rates;

/// Arguments for rate representation conversion
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ConvertRateArgs {
    /// Tax rebate rate, in percent (e.g. 13 for 13%)
    #[arg(long)]
    pub rebate_rate: Decimal,

    /// Absolute agent rate, in percentage points of the invoice (e.g. 6.5)
    #[arg(long, conflicts_with = "relative")]
    pub absolute: Option<Decimal>,

    /// Relative agent share, in percent of the rebate (e.g. 50)
    #[arg(long, conflicts_with = "absolute")]
    pub relative: Option<Decimal>,
}

pub fn run_convert_rate(args: ConvertRateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rebate_rate = args.rebate_rate / Decimal::ONE_HUNDRED;

    match (args.absolute, args.relative) {
        (Some(absolute_points), None) => {
            let ratio = rates::absolute_to_relative(rebate_rate, absolute_points)?;
            Ok(json!({
                "result": {
                    "rebate_rate_pct": args.rebate_rate,
                    "absolute_points": absolute_points,
                    "relative_share_pct": ratio * Decimal::ONE_HUNDRED,
                },
                "methodology": "relative = (absolute / 100) / rebate_rate",
            }))
        }
        (None, Some(relative_pct)) => {
            let ratio = relative_pct / Decimal::ONE_HUNDRED;
            let points = rates::relative_to_absolute(rebate_rate, ratio)?;
            Ok(json!({
                "result": {
                    "rebate_rate_pct": args.rebate_rate,
                    "relative_share_pct": relative_pct,
                    "absolute_points": points,
                },
                "methodology": "absolute = relative * rebate_rate * 100",
            }))
        }
        _ => Err("provide exactly one of --absolute or --relative".into()),
    }
}
