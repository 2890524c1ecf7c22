//! Rule-based risk commentary
//!
//! Each rule inspects the computed views independently and contributes at
//! most one advisory line. Rules run in registration order.

use crate::ledger::{Ledger, TransCode};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

pub const EXPIRATION_LOSS_THRESHOLD_PCT: u32 = 20;
pub const CONCENTRATION_TRADE_THRESHOLD: usize = 5;
pub const ACH_FREQUENCY_THRESHOLD: usize = 3;

pub const DEFAULT_ADVICE: &str =
    "No major risk flags found in your trade log. Keep following your risk management plan.";

/// Views a rule may look at
pub struct RiskInputs<'a> {
    pub ledger: &'a Ledger,
    pub pnl: &'a BTreeMap<String, Decimal>,
    /// Sum of `pnl`, range-checked by the caller
    pub total_pnl: Decimal,
    pub expiration_loss_percentage: Decimal,
}

/// Trait for risk rules
pub trait RiskRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Advisory text when the rule's condition holds
    fn evaluate(&self, inputs: &RiskInputs<'_>) -> Option<String>;
}

/// Runs the registered rules in order
pub struct RiskAdvisor {
    rules: Vec<Box<dyn RiskRule>>,
}

impl RiskAdvisor {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn RiskRule>) {
        self.rules.push(rule);
    }

    /// Never empty: falls back to [`DEFAULT_ADVICE`]
    pub fn advise(&self, inputs: &RiskInputs<'_>) -> Vec<String> {
        let mut advice = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            if let Some(line) = rule.evaluate(inputs) {
                debug!(rule = rule.name(), "Risk rule fired");
                advice.push(line);
            }
        }

        if advice.is_empty() {
            advice.push(DEFAULT_ADVICE.to_string());
        }

        advice
    }
}

impl Default for RiskAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

//
// ========== Rules ==========
//

/// Rule: expiration losses dominate the money put into opening trades
pub struct ExpirationRelianceRule;

impl RiskRule for ExpirationRelianceRule {
    fn name(&self) -> &'static str {
        "expiration_reliance"
    }

    fn evaluate(&self, inputs: &RiskInputs<'_>) -> Option<String> {
        if inputs.expiration_loss_percentage <= Decimal::from(EXPIRATION_LOSS_THRESHOLD_PCT) {
            return None;
        }

        Some(format!(
            "Expiration losses equal {}% of your buy-to-open total. You may be relying too \
             heavily on options that expire worthless; consider closing positions before expiry.",
            inputs.expiration_loss_percentage.round_dp(2)
        ))
    }
}

/// Rule: the worst instrument lost more than the best one gained
pub struct LossAsymmetryRule;

impl RiskRule for LossAsymmetryRule {
    fn name(&self) -> &'static str {
        "loss_asymmetry"
    }

    fn evaluate(&self, inputs: &RiskInputs<'_>) -> Option<String> {
        let worst = inputs.pnl.values().min()?;
        let best = inputs.pnl.values().max()?;

        if worst.abs() <= *best {
            return None;
        }

        Some(format!(
            "Your largest loss ({}) is bigger than your largest gain ({}). \
             Consider using stop-loss orders to cap the downside.",
            worst, best
        ))
    }
}

/// Rule: a single instrument dominates the trade count
pub struct ConcentrationRule;

impl RiskRule for ConcentrationRule {
    fn name(&self) -> &'static str {
        "concentration"
    }

    fn evaluate(&self, inputs: &RiskInputs<'_>) -> Option<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in inputs.ledger.records() {
            if !record.instrument.is_empty() {
                *counts.entry(record.instrument.as_str()).or_default() += 1;
            }
        }

        let heavy: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(_, count)| *count > CONCENTRATION_TRADE_THRESHOLD)
            .collect();

        // Ties across several instruments are not a concentration signal.
        match heavy.as_slice() {
            [(instrument, count)] => Some(format!(
                "{} appears in {} transactions. Your trading is concentrated in a single \
                 instrument; consider diversifying.",
                instrument, count
            )),
            _ => None,
        }
    }
}

/// Rule: frequent deposits
pub struct AchFrequencyRule;

impl RiskRule for AchFrequencyRule {
    fn name(&self) -> &'static str {
        "ach_frequency"
    }

    fn evaluate(&self, inputs: &RiskInputs<'_>) -> Option<String> {
        let ach_count = inputs.ledger.count_code(&TransCode::Ach);

        if ach_count <= ACH_FREQUENCY_THRESHOLD {
            return None;
        }

        Some(format!(
            "You made {} ACH transfers. Frequent replenishment of the account can be a sign \
             of chasing losses.",
            ach_count
        ))
    }
}

/// Rule: realised PnL is negative overall
pub struct PortfolioLossRule;

impl RiskRule for PortfolioLossRule {
    fn name(&self) -> &'static str {
        "portfolio_loss"
    }

    fn evaluate(&self, inputs: &RiskInputs<'_>) -> Option<String> {
        let total = inputs.total_pnl;

        if total >= Decimal::ZERO {
            return None;
        }

        Some(format!(
            "Your overall realised PnL is negative ({}). Review your strategy before adding \
             more capital.",
            total
        ))
    }
}

/// Create the advisor with the standard rules in their fixed order
pub fn create_default_risk_advisor() -> RiskAdvisor {
    let mut advisor = RiskAdvisor::new();
    advisor.add_rule(Box::new(ExpirationRelianceRule));
    advisor.add_rule(Box::new(LossAsymmetryRule));
    advisor.add_rule(Box::new(ConcentrationRule));
    advisor.add_rule(Box::new(AchFrequencyRule));
    advisor.add_rule(Box::new(PortfolioLossRule));
    advisor
}

//
// ================= Tests =================
//
