//! Ledgers exported by anything else, matched by common column names.

use crate::imports::fields::{parse_time, MalformedValue};
use crate::imports::kraken::{cost, decimal, lower};
use crate::imports::RawRecord;
use crate::model::constants::SELL_TYPES;
use crate::model::{LedgerRecord, Quantity, Value};
use rust_decimal::Decimal;

const TIME: &[&str] = &["time", "date", "datetime", "timestamp"];
const TYPE: &[&str] = &["type", "tx_type", "category"];
const ASSET: &[&str] = &["asset", "symbol", "commodity", "pair"];
const QUANTITY: &[&str] = &["amount", "qty", "vol"];
const COST: &[&str] = &["cost", "value", "proceeds"];
const WALLET: &[&str] = &["wallet", "account"];
const GROUP_KEY: &[&str] = &["refid", "txid"];
const REFERENCE: &[&str] = &["id", "txid", "refid"];

pub(crate) fn resolve(raw: &RawRecord) -> Result<LedgerRecord, MalformedValue> {
    let time = parse_time(raw.first_non_empty(TIME).ok_or(MalformedValue::Missing("time"))?)?;
    let asset = raw
        .first_non_empty(ASSET)
        .ok_or(MalformedValue::Missing("asset"))?;
    let tx_type = lower(raw, TYPE);

    // Sells are often exported with an unsigned quantity.
    let mut quantity = decimal(raw, QUANTITY)?;
    if quantity > Decimal::ZERO && SELL_TYPES.contains(&tx_type.as_str()) {
        quantity = -quantity;
    }

    Ok(LedgerRecord {
        source: raw.source.clone(),
        index: raw.index,
        time,
        tx_type,
        subtype: lower(raw, &["subtype"]),
        asset: asset.to_string(),
        quantity: Quantity::new(quantity),
        fee: Value::new(decimal(raw, &["fee"])?),
        cost: Value::new(cost(raw, COST, quantity)?),
        wallet: raw.first_non_empty(WALLET).map(String::from),
        group_key: raw.first_non_empty(GROUP_KEY).map(String::from),
        reference: raw.first_non_empty(REFERENCE).unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::wallet::DefaultWallets;
    use crate::model::{group_records, normalize, TxKind, Warnings};
    use std::collections::HashMap;
    use std::rc::Rc;

    fn raw(index: usize, pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord {
            source: Rc::from("coinbase.csv"),
            index,
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_sell_with_unsigned_quantity_is_negated() {
        let record = resolve(&raw(
            0,
            &[
                ("timestamp", "2022-02-02T10:00:00Z"),
                ("category", "Sell"),
                ("symbol", "BTC"),
                ("qty", "0.5"),
                ("proceeds", "20000"),
                ("id", "cb-1"),
            ],
        ))
        .unwrap();

        assert_eq!(record.tx_type, "sell");
        assert_eq!(record.quantity, "-0.5".parse().unwrap());
        assert_eq!(record.cost, "20000".parse().unwrap());
        assert_eq!(record.reference, "cb-1");
        assert!(record.group_key.is_none());

        let already_signed = resolve(&raw(
            1,
            &[("date", "2022-02-02"), ("type", "sale"), ("asset", "BTC"), ("amount", "-1")],
        ))
        .unwrap();
        assert_eq!(already_signed.quantity, "-1".parse().unwrap());
    }

    #[test]
    fn test_rows_value_themselves_without_fiat() {
        let rows = [
            raw(
                0,
                &[
                    ("date", "01/15/2022 09:30"),
                    ("type", "buy"),
                    ("asset", "ETH"),
                    ("amount", "2"),
                    ("price", "3000"),
                    ("fee", "4.5"),
                    ("wallet", "Ledger"),
                ],
            ),
            raw(
                1,
                &[
                    ("date", "02/15/2022 09:30"),
                    ("type", "sell"),
                    ("asset", "ETH"),
                    ("amount", "1"),
                    ("value", "3500"),
                ],
            ),
        ];
        let records: Vec<_> = rows.iter().map(|row| resolve(row).unwrap()).collect();

        let groups = group_records(records);
        let mut warnings = Warnings::new();
        let transactions = normalize(&groups, &DefaultWallets::new(["hot"]), &mut warnings);

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].kind, TxKind::Buy);
        assert_eq!(transactions[0].wallet, "Ledger");
        assert_eq!(transactions[0].consideration, "6000".parse().unwrap());
        assert_eq!(transactions[0].fee, "4.5".parse().unwrap());
        assert_eq!(transactions[1].kind, TxKind::Sell);
        assert_eq!(transactions[1].wallet, "hot");
        assert_eq!(transactions[1].consideration, "3500".parse().unwrap());
    }
}
