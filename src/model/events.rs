use crate::model::constants::{ALLOCATION_MARKERS, INCOME_MARKERS};
use crate::model::{LedgerRecord, Quantity, Value};
use std::collections::HashMap;
use tracing::trace;

/// What an event group means economically.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EventKind {
    /// Commodities exchanged for fiat or for each other.
    Trade,

    /// Staking rewards, earn programs and other receipts with no disposal.
    Income,

    /// Movement between two wallets of the same owner.
    Transfer,
}

impl EventKind {
    /// Classify a group from all of its records.
    ///
    /// Income markers are matched on the type and win over allocation markers, which are matched
    /// on the subtype. Everything else is a trade.
    pub fn classify(records: &[LedgerRecord]) -> Self {
        let has_marker = |field: &str, markers: &[&str]| {
            markers.iter().any(|marker| field.contains(marker))
        };

        if records
            .iter()
            .any(|record| has_marker(&record.tx_type, INCOME_MARKERS))
        {
            Self::Income
        } else if records
            .iter()
            .any(|record| has_marker(&record.subtype, ALLOCATION_MARKERS))
        {
            Self::Transfer
        } else {
            Self::Trade
        }
    }
}

/// The fiat side of an event, shared out over its commodity legs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settlement {
    /// Asset of the first fiat leg.
    pub currency: String,
    /// Sum of the absolute fiat amounts.
    pub consideration: Value,
    /// Sum of the fiat fees.
    pub fee: Value,
}

/// All records of one input that share a correlation key.
#[derive(Clone, Debug)]
pub struct EventGroup {
    key: String,
    kind: EventKind,
    records: Vec<LedgerRecord>,
}

impl EventGroup {
    fn new(key: String, records: Vec<LedgerRecord>) -> Self {
        let kind = EventKind::classify(&records);

        Self { key, kind, records }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn records(&self) -> &[LedgerRecord] {
        &self.records
    }

    pub fn fiat_legs(&self) -> impl Iterator<Item = &LedgerRecord> {
        self.records.iter().filter(|record| record.is_fiat())
    }

    pub fn commodity_legs(&self) -> impl Iterator<Item = &LedgerRecord> {
        self.records.iter().filter(|record| !record.is_fiat())
    }

    /// The fiat settlement, if the event has any fiat legs.
    pub fn settlement(&self) -> Option<Settlement> {
        let mut legs = self.fiat_legs().peekable();
        let currency = legs.peek()?.asset.clone();
        let (consideration, fee) = legs.fold((Value::ZERO, Value::ZERO), |(total, fee), leg| {
            (total + Value::new(leg.quantity.abs().to_decimal()), fee + leg.fee)
        });

        Some(Settlement {
            currency,
            consideration,
            fee,
        })
    }

    /// Sum of the absolute commodity quantities. This is the denominator for allocating the
    /// settlement over the commodity legs.
    pub fn commodity_quantity(&self) -> Quantity {
        self.commodity_legs().map(|leg| leg.quantity.abs()).sum()
    }
}

/// Partition the records of one input into event groups.
///
/// Groups appear in the order their first record appeared, and records keep their input order
/// within each group.
pub fn group_records(records: Vec<LedgerRecord>) -> Vec<EventGroup> {
    let mut order = Vec::<(String, Vec<LedgerRecord>)>::new();
    let mut index = HashMap::<String, usize>::new();

    for record in records {
        let key = record.correlation_key();
        match index.get(&key) {
            Some(&i) => order[i].1.push(record),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, vec![record]));
            }
        }
    }

    order
        .into_iter()
        .map(|(key, records)| {
            let group = EventGroup::new(key, records);
            trace!(
                key = group.key(),
                kind = ?group.kind(),
                records = group.records().len(),
                "Grouped event"
            );
            group
        })
        .collect()
}
