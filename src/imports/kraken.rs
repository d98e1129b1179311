//! Kraken ledger exports: `txid,refid,time,type,subtype,aclass,asset,amount,fee,balance`.

use crate::imports::fields::{parse_decimal, parse_time, MalformedValue};
use crate::imports::RawRecord;
use crate::model::{LedgerRecord, Quantity, Value};
use rust_decimal::Decimal;

const TIME: &[&str] = &["time", "date", "datetime"];
const TYPE: &[&str] = &["type", "tx_type"];
const ASSET: &[&str] = &["asset", "pair", "symbol"];
const QUANTITY: &[&str] = &["vol", "amount", "qty"];
const COST: &[&str] = &["cost", "value"];
const WALLET: &[&str] = &["wallet", "account"];
const GROUP_KEY: &[&str] = &["refid", "txid"];
const REFERENCE: &[&str] = &["txid", "refid", "orderno"];

pub(crate) fn resolve(raw: &RawRecord) -> Result<LedgerRecord, MalformedValue> {
    let time = parse_time(raw.first_non_empty(TIME).ok_or(MalformedValue::Missing("time"))?)?;
    let asset = raw
        .first_non_empty(ASSET)
        .ok_or(MalformedValue::Missing("asset"))?;
    let quantity = decimal(raw, QUANTITY)?;

    Ok(LedgerRecord {
        source: raw.source.clone(),
        index: raw.index,
        time,
        tx_type: lower(raw, TYPE),
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

/// A missing column reads as zero, like a blank cell.
pub(crate) fn decimal(raw: &RawRecord, columns: &[&str]) -> Result<Decimal, MalformedValue> {
    parse_decimal(raw.first_non_empty(columns).unwrap_or_default())
}

pub(crate) fn lower(raw: &RawRecord, columns: &[&str]) -> String {
    raw.first_non_empty(columns)
        .unwrap_or_default()
        .to_lowercase()
}

/// Total value of the row, or `price * |quantity|` when only a unit price was recorded.
pub(crate) fn cost(
    raw: &RawRecord,
    columns: &[&str],
    quantity: Decimal,
) -> Result<Decimal, MalformedValue> {
    let cost = decimal(raw, columns)?;
    if !cost.is_zero() {
        return Ok(cost);
    }

    let price = decimal(raw, &["price"])?;

    Ok(price * quantity.abs())
}
