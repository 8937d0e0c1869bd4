use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.13 = 13%). Never as percentages.
pub type Rate = Decimal;

/// One product sourced from one factory, as parsed from the input sheet.
///
/// Treated as an immutable value object: the engine never mutates it, and the
/// `(factory_name, product_name)` pair must be unique within an input list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSituation {
    /// Supplying factory name (composite-key part).
    pub factory_name: String,
    /// Product name (composite-key part).
    pub product_name: String,
    /// Customs rebate rate for this product, as a fraction in (0, 1).
    pub tax_rebate_rate: Rate,
    /// Sales amount on the proforma invoice, in the foreign currency.
    pub sales_amount_foreign: Money,
    /// Actual purchase value payable to the factory, in RMB.
    pub actual_purchase_amount: Money,
    /// Deposit the consignor has already paid the factory, in RMB.
    pub prepaid_amount: Money,
    /// Factory's tax point applied to the over-invoiced portion, in [0, 1).
    pub tax_point: Rate,
    /// Whether the factory agrees to issue its invoice to the agent.
    pub agree_to_invoice_agent: bool,
    /// Whether the factory may be invoiced above its actual value.
    pub allow_overprice_invoice: bool,
}

impl ProductSituation {
    /// A record that refuses agent invoicing or over-invoicing can only be
    /// invoiced at exactly its actual purchase value.
    pub fn is_fixed_invoice_amount(&self) -> bool {
        !self.agree_to_invoice_agent || !self.allow_overprice_invoice
    }
}

/// Per-record share of the total invoice amount, produced by the allocation
/// engine. Sum of `allocated_invoice_amount` over a result set equals the
/// total handed to the engine, exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryAllocation {
    pub factory_name: String,
    pub product_name: String,
    pub actual_purchase_amount: Money,
    pub allocated_invoice_amount: Money,
    pub tax_rebate_amount: Money,
    /// Net-of-tax-point refund the factory owes back for the over-invoiced
    /// portion. Negative when the allocation fell below actual value.
    pub overprice_refund_amount: Money,
}

/// Full financial detail for one record, derived from its allocation.
/// Created once by the settlement calculator and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCalculationDetail {
    pub factory_name: String,
    pub product_name: String,
    pub actual_purchase_amount: Money,
    pub invoice_amount: Money,
    pub tax_rebate_amount: Money,
    pub agent_profit: Money,
    /// Amount the agent still owes the factory before shipment
    /// (actual value minus the consignor's prepayment).
    pub agent_balance_before_shipment: Money,
    /// Balance the agent pays the factory once the rebate lands
    /// (invoice amount minus the pre-shipment balance).
    pub agent_balance_after_rebating: Money,
    /// Tax cost of the over-invoiced portion, at the factory's tax point.
    pub overprice_tax: Money,
    /// Corporate-account refund of the consignor's prepayment; zero for
    /// factories that do not invoice the agent.
    pub prepayment_refund_amount: Money,
    /// Private-account refund of the over-invoiced portion, net of tax point.
    pub overprice_refund_amount: Money,
}

/// Aggregate settlement over an input list, details in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiProductCalculationResult {
    pub total_invoice_amount: Money,
    pub total_tax_rebate_amount: Money,
    pub total_agent_profit: Money,
    /// `total_tax_rebate_amount - total_agent_profit`.
    pub your_total_tax_rebate_share: Money,
    pub details: Vec<ProductCalculationDetail>,
}

/// Transaction-level parameters for the single-party invoice solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationParams {
    /// Sales amount on the proforma invoice, in the foreign currency.
    pub sales_amount: Money,
    /// RMB per unit of foreign currency.
    pub exchange_rate: Decimal,
    /// Customs rebate rate, as a fraction in (0, 1).
    pub tax_rebate_rate: Rate,
    /// Agent's share of the rebate amount, as a fraction in [0, 1].
    pub agent_relative_ratio: Rate,
}

impl CalculationParams {
    /// Build params from user-facing percentage inputs. The rebate rate and
    /// the agent ratio arrive as percentages (13 = 13%, ratio in [0, 100])
    /// and are normalized to fractions here, at the boundary.
    pub fn from_percent(
        sales_amount: Money,
        exchange_rate: Decimal,
        tax_rebate_rate_percent: Decimal,
        agent_ratio_percent: Decimal,
    ) -> crate::RebateResult<Self> {
        if agent_ratio_percent < Decimal::ZERO || agent_ratio_percent > Decimal::ONE_HUNDRED {
            return Err(crate::RebateError::InvalidInput {
                field: "agent_ratio_percent".into(),
                reason: "Agent ratio must be between 0 and 100 percent".into(),
            });
        }
        Ok(Self {
            sales_amount,
            exchange_rate,
            tax_rebate_rate: crate::rounding::checked_div(
                tax_rebate_rate_percent,
                Decimal::ONE_HUNDRED,
                "percentage normalization",
            )?,
            agent_relative_ratio: crate::rounding::checked_div(
                agent_ratio_percent,
                Decimal::ONE_HUNDRED,
                "percentage normalization",
            )?,
        })
    }
}

/// Result of one single-party invoice computation. All amounts in RMB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub client_payment: Money,
    pub invoice_amount: Money,
    pub tax_rebate_amount: Money,
    pub agent_profit: Money,
    pub your_tax_rebate_share: Money,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation. Deterministic: identical inputs always
/// produce identical envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
    pub rounding: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: format!("{}dp", crate::rounding::CALCULATION_PRECISION),
            rounding: "half_up".to_string(),
        },
    }
}
