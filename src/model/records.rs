use crate::model::constants::SINGLETON_KEY_PREFIX;
use crate::model::{Fiat, Quantity, Value};
use crate::util::year_ext::GetYear;
use chrono::{DateTime, Datelike as _, Utc};
use std::rc::Rc;

/// One ledger row, with its columns already resolved into typed fields by an importer.
#[derive(Clone, Debug)]
pub struct LedgerRecord {
    /// Name of the input the row came from.
    pub source: Rc<str>,
    /// Position of the row within its input.
    pub index: usize,
    pub time: DateTime<Utc>,
    /// Lower-cased.
    pub tx_type: String,
    /// Lower-cased.
    pub subtype: String,
    pub asset: String,
    /// Signed. Positive quantities flow into the wallet.
    pub quantity: Quantity,
    pub fee: Value,
    /// Total value recorded on the row itself. Zero when the input has none.
    pub cost: Value,
    pub wallet: Option<String>,
    /// Identifier shared by every row of one economic event.
    pub group_key: Option<String>,
    /// Identifier of the row itself, used in reports.
    pub reference: String,
}

impl LedgerRecord {
    /// The key that groups this record with the other rows of its event.
    ///
    /// Records without a group key form their own singleton group.
    pub fn correlation_key(&self) -> String {
        match &self.group_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => format!("{SINGLETON_KEY_PREFIX}{}", self.index),
        }
    }

    pub fn is_fiat(&self) -> bool {
        Fiat::is_fiat(&self.asset)
    }
}

impl GetYear for LedgerRecord {
    fn get_year(&self) -> i32 {
        self.time.year()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone as _;

    /// Build a record timestamped `index` minutes after 2020-01-01.
    pub(crate) fn record(
        index: usize,
        group_key: Option<&str>,
        tx_type: &str,
        subtype: &str,
        asset: &str,
        quantity: &str,
        fee: &str,
    ) -> LedgerRecord {
        LedgerRecord {
            source: Rc::from("ledger.csv"),
            index,
            time: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
                + chrono::TimeDelta::minutes(index as i64),
            tx_type: tx_type.to_string(),
            subtype: subtype.to_string(),
            asset: asset.to_string(),
            quantity: quantity.parse().unwrap(),
            fee: fee.parse().unwrap(),
            cost: Value::ZERO,
            wallet: None,
            group_key: group_key.map(String::from),
            reference: format!("row-{index}"),
        }
    }

    #[test]
    fn test_correlation_key() {
        let grouped = record(4, Some("L123"), "trade", "", "XXBT", "1", "0");
        let singleton = record(7, None, "buy", "", "BTC", "1", "0");
        let blank = record(9, Some(""), "buy", "", "BTC", "1", "0");

        assert_eq!(grouped.correlation_key(), "L123");
        assert_eq!(singleton.correlation_key(), "ridx-7");
        assert_eq!(blank.correlation_key(), "ridx-9");
        assert!(!grouped.is_fiat());
        assert!(record(1, None, "trade", "", "ZEUR", "-1", "0").is_fiat());
    }
}
