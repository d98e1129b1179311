//! Ledger CSV ingestion.
//!
//! Every input is read into [`RawRecord`]s keyed by lower-cased column name, then resolved into
//! [`LedgerRecord`]s by the importer matching its header.

use crate::imports::fields::MalformedValue;
use crate::model::{LedgerRecord, Stats};
use std::collections::HashMap;
use std::{io::Read, path::Path, rc::Rc};
use thiserror::Error;
use tracing::{debug, info};

pub mod fields;
pub mod generic;
pub mod kraken;
pub mod wallet;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV Error")]
    Csv(#[from] csv::Error),

    #[error("FS Error")]
    Fs(#[from] std::io::Error),
}

/// One CSV row before any column has been interpreted.
#[derive(Clone, Debug)]
pub struct RawRecord {
    pub source: Rc<str>,
    /// Zero-based position among the data rows of the input.
    pub index: usize,
    pub fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// The first of `columns` holding a non-blank value.
    pub fn first_non_empty(&self, columns: &[&str]) -> Option<&str> {
        columns
            .iter()
            .filter_map(|column| self.get(column))
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

/// Column layout of an input, chosen from its header.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Format {
    /// Kraken ledger exports.
    Kraken,
    /// Any other CSV with recognizable column names.
    Generic,
}

impl Format {
    /// `headers` must already be lower-cased.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Self {
        let has = |name: &str| headers.iter().any(|header| header.as_ref() == name);

        if has("txid") && has("time") && has("type") {
            Self::Kraken
        } else {
            Self::Generic
        }
    }

    pub fn resolve(self, raw: &RawRecord) -> Result<LedgerRecord, MalformedValue> {
        match self {
            Self::Kraken => kraken::resolve(raw),
            Self::Generic => generic::resolve(raw),
        }
    }
}

/// Read one CSV input. The file name becomes the source tag of every record.
pub fn read_records(
    s: &mut Stats,
    path: impl AsRef<Path>,
) -> Result<Vec<LedgerRecord>, ImportError> {
    let path = path.as_ref();
    let source = path
        .file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy();
    let file = std::fs::File::open(path)?;

    read_records_from(s, &source, file)
}

/// Read CSV rows from any reader.
///
/// Rows whose required fields are missing or unparseable are skipped and counted as malformed.
/// Reading stops on the first I/O or CSV framing error.
pub fn read_records_from<R: Read>(
    s: &mut Stats,
    source: &str,
    reader: R,
) -> Result<Vec<LedgerRecord>, ImportError> {
    let source: Rc<str> = Rc::from(source);
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_lowercase())
        .collect();
    let format = Format::detect(&headers);
    info!(%source, ?format, "Reading ledger rows");

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = result?;
        s.inc_records();

        let raw = RawRecord {
            source: Rc::clone(&source),
            index,
            fields: headers
                .iter()
                .cloned()
                .zip(row.iter().map(String::from))
                .collect(),
        };
        debug!("Deserialized: {raw:?}");

        match format.resolve(&raw) {
            Ok(record) => {
                debug!("Parsed: {record:?}");
                records.push(record);
            }
            Err(err) => {
                debug!(%source, index, %err, "Skipping malformed row");
                s.inc_malformed_records();
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::wallet::DefaultWallets;
    use crate::model::{group_records, merge_chronologically, normalize, State, Value, Warnings};
    use tracing_test::traced_test;

    const KRAKEN: &str = "\
txid,refid,time,type,subtype,aclass,asset,amount,fee,balance
L1,T1,2021-03-01 10:00:00,trade,,currency,ZUSD,-10000.00,10.00,0
L2,T1,2021-03-01 10:00:00,trade,,currency,XXBT,0.5,0,0.5
# a comment line
L3,S1,2021-04-01 10:00:00,staking,,currency,DOT,10,0,10
L4,T2,not a time,trade,,currency,XXBT,-0.1,0,0.4
L5,T3,2022-05-01 10:00:00,trade,,currency,ZUSD,8000.00,8.00,0
L6,T3,2022-05-01 10:00:00,trade,,currency,XXBT,-0.25,0,0.25
";

    #[test]
    fn test_detect_format() {
        assert_eq!(Format::detect(&["txid", "refid", "time", "type"]), Format::Kraken);
        assert_eq!(Format::detect(&["date", "type", "asset", "amount"]), Format::Generic);
        assert_eq!(Format::detect::<&str>(&[]), Format::Generic);
    }

    #[test]
    #[traced_test]
    fn test_read_counts_malformed_rows() {
        let mut stats = Stats::default();
        let records = read_records_from(&mut stats, "ledgers.csv", KRAKEN.as_bytes()).unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(stats.records(), 6);
        assert_eq!(stats.malformed_records(), 1);
        assert!(logs_contain("Skipping malformed row"));

        assert_eq!(&*records[0].source, "ledgers.csv");
        assert_eq!(records[0].group_key.as_deref(), Some("T1"));
        assert_eq!(records[0].reference, "L1");
        assert_eq!(records[2].tx_type, "staking");
    }

    #[test]
    #[traced_test]
    fn test_kraken_ledger_end_to_end() {
        let mut stats = Stats::default();
        let records = read_records_from(&mut stats, "ledgers.csv", KRAKEN.as_bytes()).unwrap();

        let groups = group_records(records);
        assert_eq!(groups.len(), 3);

        let mut warnings = Warnings::new();
        let lookup = DefaultWallets::new(["kraken"]);
        let transactions = merge_chronologically([normalize(&groups, &lookup, &mut warnings)]);
        assert_eq!(transactions.len(), 3);

        let mut state = State::new();
        state.resolve(&transactions);

        // Bought 0.5 XXBT for 10010 with the fee, sold half for 8000 less 8.
        let btc = state.gains.get(2022, "kraken", "XXBT").unwrap();
        assert_eq!(btc.long_term, "2987".parse::<Value>().unwrap());
        assert_eq!(btc.short_term, Value::ZERO);

        // Unvalued staking reward.
        let dot = state.gains.get(2021, "kraken", "DOT").unwrap();
        assert_eq!(dot.income, Value::ZERO);
        assert_eq!(state.warnings.len(), 1);
        assert!(warnings.is_empty());
    }
}
