use crate::model::constants::{CONVERT_MARKER, CONVERT_TYPES};
use crate::model::{DataWarning, EventGroup, EventKind, LedgerRecord, Price, Quantity, Value};
use crate::model::{Settlement, Warnings};
use crate::util::year_ext::GetYear;
use chrono::{DateTime, Datelike as _, Utc};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Resolves the wallet that holds a record's quantity.
pub trait WalletLookup {
    fn lookup_wallet(&self, record: &LedgerRecord) -> String;
}

/// What a normalized transaction does to the ledger.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TxKind {
    Buy,
    Sell,
    Income,
    /// Move inventory into `wallet` from `source_wallet`. Never realizes a gain.
    Transfer { source_wallet: String },
    /// Explicit conversion. The sign of the quantity decides whether it acquires or disposes.
    Convert,
}

/// A single movement of one commodity in one wallet, ready to be applied to the ledger.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NormalizedTransaction {
    pub wallet: String,
    pub commodity: String,
    pub time: DateTime<Utc>,
    pub kind: TxKind,
    /// Signed, never zero.
    pub quantity: Quantity,
    /// Total value exchanged, sign-agnostic. Zero when unknown.
    pub consideration: Value,
    pub fee: Value,
    pub correlation_id: String,
    /// Name of the input the transaction came from.
    pub source: Rc<str>,
    /// Fiat currency of the settlement, when there was one.
    pub currency: Option<String>,
}

impl NormalizedTransaction {
    /// Consideration per unit of quantity. Only used for reporting.
    pub fn unit_consideration(&self) -> Price {
        self.consideration.per_unit(self.quantity)
    }

    pub fn source_wallet(&self) -> Option<&str> {
        match &self.kind {
            TxKind::Transfer { source_wallet } => Some(source_wallet.as_str()),
            _ => None,
        }
    }

    /// Ledger processing order: timestamp, then source, then correlation id.
    fn sort_key(&self) -> (DateTime<Utc>, &str, &str) {
        (self.time, self.source.as_ref(), self.correlation_id.as_str())
    }
}

impl GetYear for NormalizedTransaction {
    fn get_year(&self) -> i32 {
        self.time.year()
    }
}

/// Turn the event groups of one input into normalized transactions.
///
/// Unpairable transfer legs are dropped and reported through `warnings`.
pub fn normalize<L>(
    groups: &[EventGroup],
    lookup: &L,
    warnings: &mut Warnings,
) -> Vec<NormalizedTransaction>
where
    L: WalletLookup + ?Sized,
{
    let mut transactions = Vec::new();

    for group in groups {
        let before = transactions.len();
        match group.kind() {
            EventKind::Trade => normalize_trade(group, lookup, &mut transactions),
            EventKind::Income => normalize_income(group, lookup, &mut transactions),
            EventKind::Transfer => normalize_transfer(group, lookup, warnings, &mut transactions),
        }
        trace!(
            key = group.key(),
            kind = ?group.kind(),
            transactions = transactions.len() - before,
            "Normalized event"
        );
    }

    transactions
}

/// Merge the transactions of several inputs into one sequence in ledger processing order.
///
/// The sort is stable, so transactions with identical keys keep their input order.
pub fn merge_chronologically(
    inputs: impl IntoIterator<Item = Vec<NormalizedTransaction>>,
) -> Vec<NormalizedTransaction> {
    let mut merged: Vec<_> = inputs.into_iter().flatten().collect();
    merged.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    merged
}

/// Consideration and fee for one commodity leg.
///
/// With a fiat settlement the leg gets its proportional share of it. Otherwise the leg keeps
/// whatever valuation its own row recorded.
fn allocate(
    leg: &LedgerRecord,
    settlement: Option<&Settlement>,
    denominator: Quantity,
) -> (Value, Value) {
    match settlement {
        Some(settlement) if !denominator.is_zero() => {
            let share = leg.quantity.abs();
            (
                settlement.consideration.prorate(share, denominator),
                settlement.fee.prorate(share, denominator),
            )
        }
        _ => (leg.cost.abs(), leg.fee.abs()),
    }
}

fn is_explicit_convert(record: &LedgerRecord) -> bool {
    record.tx_type.contains(CONVERT_MARKER) || CONVERT_TYPES.contains(&record.tx_type.as_str())
}

fn transaction<L>(
    leg: &LedgerRecord,
    group: &EventGroup,
    lookup: &L,
    kind: TxKind,
    settlement: Option<&Settlement>,
) -> NormalizedTransaction
where
    L: WalletLookup + ?Sized,
{
    let (consideration, fee) = allocate(leg, settlement, group.commodity_quantity());

    NormalizedTransaction {
        wallet: lookup.lookup_wallet(leg),
        commodity: leg.asset.clone(),
        time: leg.time,
        kind,
        quantity: leg.quantity,
        consideration,
        fee,
        correlation_id: group.key().to_string(),
        source: leg.source.clone(),
        currency: settlement.map(|settlement| settlement.currency.clone()),
    }
}

fn normalize_trade<L>(group: &EventGroup, lookup: &L, out: &mut Vec<NormalizedTransaction>)
where
    L: WalletLookup + ?Sized,
{
    let settlement = group.settlement();

    for leg in group.commodity_legs() {
        if leg.quantity.is_zero() {
            debug!(key = group.key(), asset = %leg.asset, "Dropping zero-quantity leg");
            continue;
        }
        let kind = if is_explicit_convert(leg) {
            TxKind::Convert
        } else if leg.quantity.is_positive() {
            TxKind::Buy
        } else {
            TxKind::Sell
        };

        out.push(transaction(leg, group, lookup, kind, settlement.as_ref()));
    }
}

fn normalize_income<L>(group: &EventGroup, lookup: &L, out: &mut Vec<NormalizedTransaction>)
where
    L: WalletLookup + ?Sized,
{
    let settlement = group.settlement();

    for leg in group.commodity_legs() {
        if !leg.quantity.is_positive() {
            trace!(key = group.key(), asset = %leg.asset, "Skipping non-positive income leg");
            continue;
        }

        out.push(transaction(leg, group, lookup, TxKind::Income, settlement.as_ref()));
    }
}

fn normalize_transfer<L>(
    group: &EventGroup,
    lookup: &L,
    warnings: &mut Warnings,
    out: &mut Vec<NormalizedTransaction>,
) where
    L: WalletLookup + ?Sized,
{
    // Legs by commodity, in group order.
    let mut incoming = BTreeMap::<String, Vec<&LedgerRecord>>::new();
    let mut outgoing = BTreeMap::<String, Vec<&LedgerRecord>>::new();
    let mut commodities = Vec::new();
    for leg in group.commodity_legs() {
        let commodity = leg.asset.trim().to_lowercase();
        if !commodities.contains(&commodity) {
            commodities.push(commodity.clone());
        }
        if leg.quantity.is_positive() {
            incoming.entry(commodity).or_default().push(leg);
        } else if leg.quantity.is_negative() {
            outgoing.entry(commodity).or_default().push(leg);
        }
    }

    for commodity in commodities {
        let Some(incoming) = incoming.get(&commodity) else {
            continue;
        };
        let outgoing = outgoing.get(&commodity).map(Vec::as_slice).unwrap_or_default();

        for &leg in incoming {
            let to_wallet = lookup.lookup_wallet(leg);
            let from_wallet = pair_outgoing(leg, outgoing)
                .map(|source| lookup.lookup_wallet(source))
                .filter(|wallet| !wallet.is_empty());

            let Some(source_wallet) = from_wallet else {
                warnings.push(DataWarning::UnresolvedTransferSource {
                    reference: group.key().to_string(),
                    to_wallet,
                    commodity: leg.asset.clone(),
                    time: leg.time,
                    quantity: leg.quantity,
                });
                continue;
            };

            out.push(NormalizedTransaction {
                wallet: to_wallet,
                commodity: leg.asset.clone(),
                time: leg.time,
                kind: TxKind::Transfer { source_wallet },
                quantity: leg.quantity.abs(),
                consideration: Value::ZERO,
                fee: Value::ZERO,
                correlation_id: group.key().to_string(),
                source: leg.source.clone(),
                currency: None,
            });
        }
    }
}

/// Choose the outgoing leg that funds `incoming`.
///
/// Prefers a leg with exactly the same absolute quantity, else the first leg. Legs may fund more
/// than one incoming leg. This is a best-effort heuristic for exchanges that do not link transfer
/// legs explicitly.
fn pair_outgoing<'a>(
    incoming: &LedgerRecord,
    outgoing: &[&'a LedgerRecord],
) -> Option<&'a LedgerRecord> {
    let wanted = incoming.quantity.abs();

    outgoing
        .iter()
        .find(|leg| leg.quantity.abs() == wanted)
        .or_else(|| outgoing.first())
        .copied()
}
