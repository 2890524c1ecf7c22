//! Trade analytics over a cleaned ledger
//!
//! Every view is computed once, in dependency order, when the analytics
//! object is built. There is no lazy or incremental path: a new export means
//! a new `TradeAnalytics`.
//!
//! Totals are checked: a ledger whose sums leave the `Decimal` range is
//! rejected as malformed rather than saturated.

pub mod risk;

pub use risk::{create_default_risk_advisor, RiskAdvisor, RiskInputs, RiskRule, DEFAULT_ADVICE};

use crate::ledger::{amount_out_of_range, Ledger, TransCode, TransactionRecord};
use crate::models::Table;
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::info;

lazy_static! {
    static ref EXPIRATION_PATTERN: Regex =
        Regex::new(r"Option Expiration for (.*)").expect("expiration pattern is valid");
}

/// Name referenced by an `OEXP` description, if it follows the export's pattern
pub fn expiration_target(description: &str) -> Option<&str> {
    EXPIRATION_PATTERN
        .captures(description)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Immutable snapshot of every derived view of one ledger
#[derive(Debug, Clone)]
pub struct TradeAnalytics {
    ledger: Ledger,
    pnl: BTreeMap<String, Decimal>,
    expiration_loss: BTreeMap<String, Decimal>,
    expiration_loss_percentage: Decimal,
    ach_sum: Decimal,
    risk_advice: Vec<String>,
}

impl TradeAnalytics {
    pub fn new(ledger: Ledger) -> Result<Self> {
        let pnl = compute_pnl(&ledger)?;
        let expiration_loss = compute_expiration_loss(&ledger)?;
        let expiration_loss_percentage =
            compute_expiration_loss_percentage(&ledger, &expiration_loss)?;
        let ach_sum = ledger.sum_code(&TransCode::Ach)?;
        let total_pnl = checked_total(&pnl, "portfolio PnL")?;

        let risk_advice = create_default_risk_advisor().advise(&RiskInputs {
            ledger: &ledger,
            pnl: &pnl,
            total_pnl,
            expiration_loss_percentage,
        });

        info!(
            instruments = pnl.len(),
            expired_instruments = expiration_loss.len(),
            %expiration_loss_percentage,
            %ach_sum,
            advice_count = risk_advice.len(),
            "Trade analytics computed"
        );

        Ok(Self {
            ledger,
            pnl,
            expiration_loss,
            expiration_loss_percentage,
            ach_sum,
            risk_advice,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(Ledger::from_path(path)?)
    }

    pub fn from_csv_str(data: &str) -> Result<Self> {
        Self::new(Ledger::from_csv_str(data)?)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// PnL per instrument, lexically ordered
    pub fn pnl(&self) -> &BTreeMap<String, Decimal> {
        &self.pnl
    }

    /// Realised PnL of one instrument; zero when it never traded
    pub fn profit_for_instrument(&self, instrument: &str) -> Decimal {
        self.pnl.get(instrument).copied().unwrap_or(Decimal::ZERO)
    }

    /// Best per-instrument PnL; zero for an empty ledger
    pub fn max_pnl(&self) -> Decimal {
        self.pnl.values().max().copied().unwrap_or(Decimal::ZERO)
    }

    pub fn ach_sum(&self) -> Decimal {
        self.ach_sum
    }

    /// `lossAmount` per instrument
    pub fn expiration_loss(&self) -> &BTreeMap<String, Decimal> {
        &self.expiration_loss
    }

    pub fn expiration_loss_percentage(&self) -> Decimal {
        self.expiration_loss_percentage
    }

    pub fn risk_advice(&self) -> &[String] {
        &self.risk_advice
    }

    pub fn pnl_table(&self) -> Table {
        to_table(&self.pnl, "PnL")
    }

    pub fn expiration_loss_table(&self) -> Table {
        to_table(&self.expiration_loss, "lossAmount")
    }
}

fn to_table(view: &BTreeMap<String, Decimal>, value_column: &str) -> Table {
    let mut table = Table::new(["Instrument", value_column]);
    for (instrument, value) in view {
        table.push_row(vec![instrument.clone(), value.to_string()]);
    }
    table
}

/// Sum amounts per instrument; rows without an instrument are not grouped
fn group_sum<'a, I, F>(records: I, amount_of: F) -> Result<BTreeMap<String, Decimal>>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
    F: Fn(&TransactionRecord) -> Option<Decimal>,
{
    let mut groups: BTreeMap<String, Decimal> = BTreeMap::new();
    for record in records {
        if record.instrument.is_empty() {
            continue;
        }
        let total = groups.entry(record.instrument.clone()).or_default();
        if let Some(amount) = amount_of(record) {
            *total = total
                .checked_add(amount)
                .ok_or_else(|| amount_out_of_range(&format!("{} total", record.instrument)))?;
        }
    }
    Ok(groups)
}

fn checked_total(view: &BTreeMap<String, Decimal>, what: &str) -> Result<Decimal> {
    view.values()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(*value))
        .ok_or_else(|| amount_out_of_range(what))
}

/// STC total minus BTO total, per instrument
fn compute_pnl(ledger: &Ledger) -> Result<BTreeMap<String, Decimal>> {
    group_sum(ledger.records(), |record| match record.trans_code {
        TransCode::Stc => record.amount,
        TransCode::Bto => record.amount.map(|amount| -amount),
        _ => None,
    })
}

/// Sum of every row whose description is named by some `OEXP` row.
///
/// Matching is exact string equality; formatting differences between the
/// expiration text and the original description are not reconciled.
fn compute_expiration_loss(ledger: &Ledger) -> Result<BTreeMap<String, Decimal>> {
    let matched: HashSet<&str> = ledger
        .with_code(&TransCode::Oexp)
        .filter_map(|record| expiration_target(&record.description))
        .collect();

    if matched.is_empty() {
        return Ok(BTreeMap::new());
    }

    group_sum(
        ledger
            .records()
            .iter()
            .filter(|record| matched.contains(record.description.as_str())),
        |record| record.amount,
    )
}

/// `100 * loss / BTO total`; zero only when the BTO total is zero
fn compute_expiration_loss_percentage(
    ledger: &Ledger,
    expiration_loss: &BTreeMap<String, Decimal>,
) -> Result<Decimal> {
    let bto_total = ledger.sum_code(&TransCode::Bto)?;
    if bto_total.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let total_loss = checked_total(expiration_loss, "expiration loss")?;

    total_loss
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(bto_total))
        .ok_or_else(|| amount_out_of_range("expiration-loss percentage"))
}
