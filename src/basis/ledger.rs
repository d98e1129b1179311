use crate::basis::lot::Lot;
use crate::model::constants::SHORTFALL_EPSILON;
use crate::model::{Disposal, GainTerm, IncomeEvent, Quantity, Value};
use crate::util::fifo::FIFO;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::trace;

/// Inventory is segregated by wallet and commodity.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BucketKey {
    pub wallet: String,
    pub commodity: String,
}

impl BucketKey {
    pub fn new(wallet: &str, commodity: &str) -> Self {
        Self {
            wallet: wallet.to_string(),
            commodity: commodity.to_string(),
        }
    }
}

/// Open lots of one (wallet, commodity), oldest acquisition first.
#[derive(Debug, Default)]
pub struct LedgerBucket {
    lots: FIFO<Lot>,
}

impl LedgerBucket {
    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    pub fn quantity(&self) -> Quantity {
        self.lots.iter().map(|lot| lot.quantity).sum()
    }

    pub fn total_cost(&self) -> Value {
        self.lots.iter().map(Lot::total_cost).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }
}

/// Outcome of [`Ledger::apply_sell`].
#[derive(Debug)]
pub struct Sale {
    pub disposals: Vec<Disposal>,
    /// Quantity that had no inventory behind it. Its proceeds are not recognized.
    pub shortfall: Option<Quantity>,
}

/// Outcome of [`Ledger::apply_transfer`].
#[derive(Debug)]
pub struct Moved {
    pub quantity: Quantity,
    pub shortfall: Option<Quantity>,
}

/// Reportable shortfalls are those above the tolerance for rounding noise.
fn reportable(shortfall: Quantity) -> Option<Quantity> {
    (shortfall.to_decimal() > SHORTFALL_EPSILON).then_some(shortfall)
}

/// The FIFO lot ledger. All lot state lives here and only these operations change it.
#[derive(Debug, Default)]
pub struct Ledger {
    buckets: BTreeMap<BucketKey, LedgerBucket>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, wallet: &str, commodity: &str) -> Option<&LedgerBucket> {
        self.buckets.get(&BucketKey::new(wallet, commodity))
    }

    /// All open lots, ordered by bucket and then by acquisition time.
    pub fn open_lots(&self) -> impl Iterator<Item = (&BucketKey, &Lot)> {
        self.buckets
            .iter()
            .flat_map(|(key, bucket)| bucket.lots().map(move |lot| (key, lot)))
    }

    fn bucket_mut(&mut self, key: &BucketKey) -> &mut LedgerBucket {
        self.buckets.entry(key.clone()).or_default()
    }

    /// Acquire `quantity` for `total_cost`. The fee is capitalized into the lot's basis.
    pub fn apply_buy(
        &mut self,
        key: &BucketKey,
        time: DateTime<Utc>,
        quantity: Quantity,
        total_cost: Value,
        fee: Value,
        origin: &str,
    ) {
        if !quantity.is_positive() {
            trace!(?key, %quantity, "Ignoring non-positive buy");
            return;
        }

        let lot = Lot {
            acquired: time,
            quantity,
            unit_cost: (total_cost + fee).per_unit(quantity),
            origin: origin.to_string(),
        };
        trace!(?key, %quantity, unit_cost = %lot.unit_cost, "Open lot");
        self.bucket_mut(key).lots.insert_lot(lot);
    }

    /// Receive `quantity` as income worth `value`, which also becomes the lot's basis.
    pub fn apply_income(
        &mut self,
        key: &BucketKey,
        time: DateTime<Utc>,
        quantity: Quantity,
        value: Value,
        origin: &str,
    ) -> Option<IncomeEvent> {
        if !quantity.is_positive() {
            trace!(?key, %quantity, "Ignoring non-positive income");
            return None;
        }

        self.apply_buy(key, time, quantity, value, Value::ZERO, origin);

        Some(IncomeEvent {
            wallet: key.wallet.clone(),
            commodity: key.commodity.clone(),
            time,
            quantity,
            value,
            correlation_id: origin.to_string(),
        })
    }

    /// Dispose of `quantity` oldest-first for `proceeds` less `fee`.
    ///
    /// Net proceeds are allocated to each consumed slice in proportion to its share of the full
    /// requested quantity, so proceeds belonging to any shortfall are never recognized.
    pub fn apply_sell(
        &mut self,
        key: &BucketKey,
        time: DateTime<Utc>,
        quantity: Quantity,
        proceeds: Value,
        fee: Value,
        correlation_id: &str,
    ) -> Sale {
        let net = proceeds - fee;
        let taken = self.bucket_mut(key).lots.take_oldest(quantity);

        let disposals = taken
            .takes
            .into_iter()
            .map(|lot| {
                let disposal = Disposal {
                    wallet: key.wallet.clone(),
                    commodity: key.commodity.clone(),
                    acquired: lot.acquired,
                    disposed: time,
                    quantity: lot.quantity,
                    basis: lot.total_cost(),
                    proceeds: net.prorate(lot.quantity, quantity),
                    term: GainTerm::classify(lot.acquired, time),
                    origin: lot.origin,
                    correlation_id: correlation_id.to_string(),
                };
                trace!(
                    ?key,
                    quantity = %disposal.quantity,
                    gain = %disposal.gain(),
                    term = %disposal.term,
                    "Close lot"
                );
                disposal
            })
            .collect();

        Sale {
            disposals,
            shortfall: reportable(taken.shortfall),
        }
    }

    /// Move `quantity` oldest-first from `source` into the same commodity in `destination`.
    ///
    /// Lots arrive with their acquisition time, unit cost and origin intact.
    pub fn apply_transfer(
        &mut self,
        source: &BucketKey,
        destination: &str,
        quantity: Quantity,
    ) -> Moved {
        let taken = self.bucket_mut(source).lots.take_oldest(quantity);
        let destination = BucketKey::new(destination, &source.commodity);
        let bucket = self.bucket_mut(&destination);

        let mut moved = Quantity::ZERO;
        for lot in taken.takes {
            moved += lot.quantity;
            bucket.lots.insert_lot(lot);
        }
        trace!(?source, ?destination, %moved, "Moved lots");

        Moved {
            quantity: moved,
            shortfall: reportable(taken.shortfall),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Price;
    use arbtest::arbtest;
    use chrono::{TimeDelta, TimeZone as _};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + TimeDelta::days(n)
    }

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    fn v(s: &str) -> Value {
        s.parse().unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let key = BucketKey::new("main", "BTC");
        let mut ledger = Ledger::new();
        ledger.apply_buy(&key, day(0), q("2"), v("200"), Value::ZERO, "B1");
        ledger.apply_buy(&key, day(1), q("3"), v("450"), Value::ZERO, "B2");

        let sale = ledger.apply_sell(&key, day(2), q("2"), v("400"), Value::ZERO, "S1");
        assert!(sale.shortfall.is_none());
        assert_eq!(sale.disposals.len(), 1);
        assert_eq!(sale.disposals[0].origin, "B1");
        assert_eq!(sale.disposals[0].basis, v("200"));
        assert_eq!(sale.disposals[0].gain(), v("200"));

        let bucket = ledger.bucket("main", "BTC").unwrap();
        assert_eq!(bucket.quantity(), q("3"));
        assert_eq!(bucket.total_cost(), v("450"));
    }

    #[test]
    fn test_proportional_proceeds() {
        let key = BucketKey::new("main", "BTC");
        let mut ledger = Ledger::new();
        ledger.apply_buy(&key, day(0), q("2"), v("100"), Value::ZERO, "B1");
        ledger.apply_buy(&key, day(1), q("3"), v("100"), Value::ZERO, "B2");

        let sale = ledger.apply_sell(&key, day(2), q("5"), v("500"), Value::ZERO, "S1");
        let proceeds: Vec<_> = sale.disposals.iter().map(|d| d.proceeds).collect();
        assert_eq!(proceeds, [v("200"), v("300")]);
        assert!(ledger.bucket("main", "BTC").unwrap().is_empty());
    }

    #[test]
    fn test_fee_is_capitalized_and_deducted() {
        let key = BucketKey::new("main", "ETH");
        let mut ledger = Ledger::new();
        ledger.apply_buy(&key, day(0), q("2"), v("1000"), v("10"), "B1");

        let lot = ledger.bucket("main", "ETH").unwrap().lots().next().unwrap();
        assert_eq!(lot.unit_cost, "505".parse().unwrap());

        let sale = ledger.apply_sell(&key, day(1), q("1"), v("600"), v("6"), "S1");
        assert_eq!(sale.disposals[0].proceeds, v("594"));
        assert_eq!(sale.disposals[0].gain(), v("89"));
    }

    #[test]
    fn test_holding_period_boundary() {
        let key = BucketKey::new("main", "BTC");
        let mut ledger = Ledger::new();
        ledger.apply_buy(&key, day(0), q("1"), v("1"), Value::ZERO, "B1");
        ledger.apply_buy(&key, day(0), q("1"), v("1"), Value::ZERO, "B2");

        let long = ledger.apply_sell(&key, day(365), q("1"), v("2"), Value::ZERO, "S1");
        assert_eq!(long.disposals[0].term, GainTerm::Long);

        let key = BucketKey::new("other", "BTC");
        ledger.apply_buy(&key, day(0), q("1"), v("1"), Value::ZERO, "B3");
        let short = ledger.apply_sell(&key, day(364), q("1"), v("2"), Value::ZERO, "S2");
        assert_eq!(short.disposals[0].term, GainTerm::Short);
    }

    #[test]
    fn test_oversell_recognizes_matched_portion_only() {
        let key = BucketKey::new("main", "ETH");
        let mut ledger = Ledger::new();
        ledger.apply_buy(&key, day(0), q("1"), v("1000"), Value::ZERO, "B1");

        let sale = ledger.apply_sell(&key, day(100), q("2"), v("3000"), Value::ZERO, "S1");
        assert_eq!(sale.shortfall, Some(q("1")));
        assert_eq!(sale.disposals.len(), 1);
        assert_eq!(sale.disposals[0].proceeds, v("1500"));
        assert_eq!(sale.disposals[0].gain(), v("500"));
        assert_eq!(ledger.bucket("main", "ETH").unwrap().quantity(), Quantity::ZERO);
    }

    #[test]
    fn test_tiny_shortfall_is_not_reported() {
        let key = BucketKey::new("main", "ETH");
        let mut ledger = Ledger::new();
        ledger.apply_buy(&key, day(0), q("1"), v("1000"), Value::ZERO, "B1");

        let sale = ledger.apply_sell(&key, day(1), q("1.0000000001"), v("1000"), Value::ZERO, "S");
        assert!(sale.shortfall.is_none());
    }

    #[test]
    fn test_income_basis() {
        let key = BucketKey::new("staking", "DOT");
        let mut ledger = Ledger::new();

        let income = ledger.apply_income(&key, day(0), q("4"), v("20"), "I1").unwrap();
        assert_eq!(income.value, v("20"));

        let unvalued = ledger.apply_income(&key, day(1), q("1"), Value::ZERO, "I2").unwrap();
        assert_eq!(unvalued.value, Value::ZERO);

        let costs: Vec<_> = ledger
            .bucket("staking", "DOT")
            .unwrap()
            .lots()
            .map(|lot| lot.unit_cost)
            .collect();
        assert_eq!(costs, ["5".parse::<Price>().unwrap(), Price::ZERO]);
    }

    #[test]
    fn test_transfer_preserves_basis_and_acquisition() {
        let from = BucketKey::new("exchange", "BTC");
        let mut ledger = Ledger::new();
        ledger.apply_buy(&from, day(0), q("1"), v("100"), Value::ZERO, "B1");
        ledger.apply_buy(&from, day(10), q("1"), v("300"), Value::ZERO, "B2");
        let cold = BucketKey::new("cold", "BTC");
        ledger.apply_buy(&cold, day(5), q("1"), v("200"), Value::ZERO, "B3");

        let moved = ledger.apply_transfer(&from, "cold", q("1.5"));
        assert_eq!(moved.quantity, q("1.5"));
        assert!(moved.shortfall.is_none());

        let total: Value = [&from, &cold]
            .iter()
            .map(|key| ledger.bucket(&key.wallet, &key.commodity).unwrap().total_cost())
            .sum();
        assert_eq!(total, v("600"));

        let origins: Vec<_> = ledger
            .bucket("cold", "BTC")
            .unwrap()
            .lots()
            .map(|lot| (lot.origin.as_str(), lot.acquired))
            .collect();
        assert_eq!(origins, [("B1", day(0)), ("B3", day(5)), ("B2", day(10))]);
    }

    #[test]
    fn test_transfer_shortfall_creates_no_negative_lots() {
        let from = BucketKey::new("exchange", "BTC");
        let mut ledger = Ledger::new();
        ledger.apply_buy(&from, day(0), q("1"), v("100"), Value::ZERO, "B1");

        let moved = ledger.apply_transfer(&from, "cold", q("3"));
        assert_eq!(moved.quantity, q("1"));
        assert_eq!(moved.shortfall, Some(q("2")));
        assert!(ledger.open_lots().all(|(_, lot)| lot.quantity.is_positive()));
    }

    #[test]
    fn prop_test_transfers_conserve_basis() {
        arbtest(|u| {
            let wallets = ["a", "b", "c"];
            let mut ledger = Ledger::new();
            let mut expected_cost = Value::ZERO;

            for n in 0..u.int_in_range(1..=16u8)? {
                let wallet = *u.choose(&wallets)?;
                let quantity = Quantity::new(u.int_in_range(1..=1_000u32)?.into());
                let cost = Value::new(u.int_in_range(0..=100_000u32)?.into());
                let time = day(u.int_in_range(0..=1_000)?);
                ledger.apply_buy(
                    &BucketKey::new(wallet, "BTC"),
                    time,
                    quantity,
                    cost,
                    Value::ZERO,
                    &format!("B{n}"),
                );
                expected_cost += cost;
            }
            let expected_quantity: Quantity =
                ledger.open_lots().map(|(_, lot)| lot.quantity).sum();

            for _ in 0..u.int_in_range(0..=16u8)? {
                let from = *u.choose(&wallets)?;
                let to = *u.choose(&wallets)?;
                let quantity = Quantity::new(u.int_in_range(1..=2_000u32)?.into());
                ledger.apply_transfer(&BucketKey::new(from, "BTC"), to, quantity);
            }

            let quantity: Quantity = ledger.open_lots().map(|(_, lot)| lot.quantity).sum();
            let cost: Value = ledger.open_lots().map(|(_, lot)| lot.total_cost()).sum();
            assert_eq!(quantity, expected_quantity);
            assert!(cost.is_fuzzy_eq(expected_cost), "{cost} != {expected_cost}");

            for wallet in wallets {
                if let Some(bucket) = ledger.bucket(wallet, "BTC") {
                    assert!(bucket.lots.is_ordered_by_key(|lot| lot.acquired));
                }
            }
            Ok(())
        });
    }
}
