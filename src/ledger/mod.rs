//! Ledger loading and normalization
//!
//! Reads a brokerage transaction export (CSV), checks the required columns,
//! drops fully empty rows and cleans the `Amount` column.

pub mod amount;

pub use amount::{clean_amount, sum_present};

use crate::error::LedgerAgentError;
use crate::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

pub const INSTRUMENT_COLUMN: &str = "Instrument";
pub const TRANS_CODE_COLUMN: &str = "Trans Code";
pub const AMOUNT_COLUMN: &str = "Amount";
pub const DESCRIPTION_COLUMN: &str = "Description";

//
// ================= Transaction Codes =================
//

/// Transaction code tag. The set is open: unknown codes are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransCode {
    /// Buy to open
    Bto,
    /// Sell to close
    Stc,
    /// Bank transfer
    Ach,
    /// Option expiration
    Oexp,
    Other(String),
}

impl TransCode {
    pub fn as_str(&self) -> &str {
        match self {
            TransCode::Bto => "BTO",
            TransCode::Stc => "STC",
            TransCode::Ach => "ACH",
            TransCode::Oexp => "OEXP",
            TransCode::Other(code) => code,
        }
    }
}

impl From<&str> for TransCode {
    fn from(raw: &str) -> Self {
        match raw {
            "BTO" => TransCode::Bto,
            "STC" => TransCode::Stc,
            "ACH" => TransCode::Ach,
            "OEXP" => TransCode::Oexp,
            other => TransCode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TransCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Records =================
//

/// One cleaned row of the export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub instrument: String,
    pub trans_code: TransCode,
    /// `None` when the raw cell could not be parsed
    pub amount: Option<Decimal>,
    pub raw_amount: String,
    pub description: String,
}

impl TransactionRecord {
    pub fn new(instrument: &str, trans_code: &str, raw_amount: &str, description: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            trans_code: TransCode::from(trans_code),
            amount: clean_amount(raw_amount),
            raw_amount: raw_amount.to_string(),
            description: description.to_string(),
        }
    }
}

/// Column positions resolved from the header row
struct ColumnIndex {
    instrument: usize,
    trans_code: usize,
    amount: usize,
    description: usize,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        // Exports saved from spreadsheets may start with a byte-order mark.
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };

        let positions = [
            INSTRUMENT_COLUMN,
            TRANS_CODE_COLUMN,
            AMOUNT_COLUMN,
            DESCRIPTION_COLUMN,
        ]
        .map(|name| (name, find(name)));

        match positions {
            [(_, Some(instrument)), (_, Some(trans_code)), (_, Some(amount)), (_, Some(description))] => {
                Ok(Self {
                    instrument,
                    trans_code,
                    amount,
                    description,
                })
            }
            _ => {
                let missing: Vec<&str> = positions
                    .iter()
                    .filter(|(_, position)| position.is_none())
                    .map(|(name, _)| *name)
                    .collect();

                Err(LedgerAgentError::MalformedLedger(format!(
                    "missing required column(s): {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// Error for a total that leaves the supported amount range
pub(crate) fn amount_out_of_range(what: &str) -> LedgerAgentError {
    LedgerAgentError::MalformedLedger(format!(
        "{} is outside the supported amount range",
        what
    ))
}

//
// ================= Ledger =================
//

/// Ordered, cleaned transaction ledger
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<TransactionRecord>,
}

impl Ledger {
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading trade ledger");
        Self::from_reader(File::open(path)?)
    }

    pub fn from_csv_str(data: &str) -> Result<Self> {
        Self::from_reader(data.as_bytes())
    }

    /// Parse a CSV export. Fails fast if a required column is absent.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let columns = ColumnIndex::resolve(&headers)?;

        let mut records = Vec::new();
        let mut dropped_rows = 0usize;

        for row in csv_reader.records() {
            let row = row?;

            if row.iter().all(|field| field.trim().is_empty()) {
                dropped_rows += 1;
                continue;
            }

            // Cells are kept verbatim; description matching is exact.
            let field = |idx: usize| row.get(idx).unwrap_or("");

            records.push(TransactionRecord::new(
                field(columns.instrument),
                field(columns.trans_code),
                field(columns.amount),
                field(columns.description),
            ));
        }

        let ledger = Self { records };

        info!(
            rows = ledger.len(),
            dropped_rows,
            missing_amounts = ledger.missing_amount_count(),
            "Trade ledger loaded"
        );

        Ok(ledger)
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows whose amount could not be parsed
    pub fn missing_amount_count(&self) -> usize {
        self.records.iter().filter(|r| r.amount.is_none()).count()
    }

    /// Iterate rows carrying the given code
    pub fn with_code<'a>(
        &'a self,
        code: &'a TransCode,
    ) -> impl Iterator<Item = &'a TransactionRecord> + 'a {
        self.records.iter().filter(move |r| &r.trans_code == code)
    }

    pub fn count_code(&self, code: &TransCode) -> usize {
        self.with_code(code).count()
    }

    /// Total of the parseable amounts of one code
    pub fn sum_code(&self, code: &TransCode) -> Result<Decimal> {
        sum_present(self.with_code(code).map(|r| r.amount))
            .ok_or_else(|| amount_out_of_range(&format!("{} total", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_loads_required_columns_and_ignores_extras() {
        let csv = "Activity Date,Instrument,Description,Trans Code,Quantity,Amount\n\
                   1/2/2024,AAPL,Apple Inc,BTO,1,\"($100.00)\"\n\
                   1/3/2024,AAPL,Apple Inc,STC,1,\"$150.00\"\n";

        let ledger = Ledger::from_csv_str(csv).unwrap();
        assert_eq!(ledger.len(), 2);

        let first = &ledger.records()[0];
        assert_eq!(first.instrument, "AAPL");
        assert_eq!(first.trans_code, TransCode::Bto);
        assert_eq!(first.amount, Some(Decimal::from_str("-100.00").unwrap()));
        assert_eq!(first.description, "Apple Inc");
    }

    #[test]
    fn test_missing_columns_fail_fast() {
        let csv = "Instrument,Trans Code,Description\nAAPL,BTO,Apple\n";
        let err = Ledger::from_csv_str(csv).unwrap_err();
        match err {
            LedgerAgentError::MalformedLedger(msg) => assert!(msg.contains("Amount")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fully_empty_rows_are_dropped() {
        let csv = "Instrument,Trans Code,Amount,Description\n\
                   AAPL,BTO,$1.00,Apple\n\
                   ,,,\n\
                   ,ACH,$5.00,\n";

        let ledger = Ledger::from_csv_str(csv).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.records()[1].trans_code, TransCode::Ach);
    }

    #[test]
    fn test_unknown_codes_pass_through() {
        let csv = "Instrument,Trans Code,Amount,Description\nSPY,CDIV,$3.10,Cash Div\n";
        let ledger = Ledger::from_csv_str(csv).unwrap();
        assert_eq!(
            ledger.records()[0].trans_code,
            TransCode::Other("CDIV".to_string())
        );
        assert_eq!(ledger.records()[0].trans_code.to_string(), "CDIV");
    }

    #[test]
    fn test_unparseable_amount_is_kept_as_missing() {
        let csv = "Instrument,Trans Code,Amount,Description\n\
                   ,ACH,abc,Deposit\n\
                   ,ACH,$20.00,Deposit\n";

        let ledger = Ledger::from_csv_str(csv).unwrap();
        assert_eq!(ledger.missing_amount_count(), 1);
        assert_eq!(ledger.count_code(&TransCode::Ach), 2);
        assert_eq!(
            ledger.sum_code(&TransCode::Ach).unwrap(),
            Decimal::from_str("20.00").unwrap()
        );
    }

    #[test]
    fn test_sum_code_out_of_range_is_an_error() {
        let csv = "Instrument,Trans Code,Amount,Description\n\
                   ,ACH,\"$50,000,000,000,000,000,000,000,000,000\",Deposit\n\
                   ,ACH,\"$50,000,000,000,000,000,000,000,000,000\",Deposit\n";

        let ledger = Ledger::from_csv_str(csv).unwrap();
        match ledger.sum_code(&TransCode::Ach) {
            Err(LedgerAgentError::MalformedLedger(msg)) => assert!(msg.contains("ACH total")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_header_byte_order_mark_is_ignored() {
        let csv = "\u{feff}Instrument,Trans Code,Amount,Description\n\
                   AAPL,BTO,$1.00,Apple\n";

        let ledger = Ledger::from_csv_str(csv).unwrap();
        assert_eq!(ledger.records()[0].instrument, "AAPL");
    }

    #[test]
    fn test_every_missing_column_is_named() {
        let csv = "Trans Code,Description,Instrument\nBTO,Apple,AAPL\n";
        match Ledger::from_csv_str(csv).unwrap_err() {
            LedgerAgentError::MalformedLedger(msg) => {
                assert_eq!(msg, "missing required column(s): Amount")
            }
            other => panic!("unexpected error: {other}"),
        }

        let csv = "Notes,Amount\nx,$1.00\n";
        match Ledger::from_csv_str(csv).unwrap_err() {
            LedgerAgentError::MalformedLedger(msg) => assert_eq!(
                msg,
                "missing required column(s): Instrument, Trans Code, Description"
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_columns_resolve_to_their_own_positions() {
        let csv = "Description,Amount,Trans Code,Instrument\n\
                   Tesla Inc,$12.00,STC,TSLA\n";

        let ledger = Ledger::from_csv_str(csv).unwrap();
        let record = &ledger.records()[0];
        assert_eq!(record.instrument, "TSLA");
        assert_eq!(record.trans_code, TransCode::Stc);
        assert_eq!(record.raw_amount, "$12.00");
        assert_eq!(record.description, "Tesla Inc");
    }
}
