use crate::model::{Price, Quantity, Value};
use crate::util::{fifo::FIFO, HasSplit};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

// Not `Clone`: basis moves between buckets and is never duplicated.
#[derive(Debug, Eq, PartialEq)]
pub struct Lot {
    pub acquired: DateTime<Utc>,
    pub quantity: Quantity,
    pub unit_cost: Price,
    /// Correlation id of the transaction that acquired the lot.
    pub origin: String,
}

impl Lot {
    pub fn total_cost(&self) -> Value {
        self.unit_cost.value_of(self.quantity)
    }

    /// Split off `take` units. Both halves keep the acquisition time, unit cost and origin.
    pub(crate) fn split(self, take: Quantity) -> HasSplit<Lot> {
        let leave = Lot {
            acquired: self.acquired,
            quantity: self.quantity - take,
            unit_cost: self.unit_cost,
            origin: self.origin.clone(),
        };
        let take = Lot {
            quantity: take,
            ..self
        };

        HasSplit { take, leave }
    }
}

/// Lots consumed by [`FIFO::take_oldest`].
#[derive(Debug)]
pub(crate) struct LotTake {
    pub(crate) takes: Vec<Lot>,
    /// Requested quantity that no lot could cover.
    pub(crate) shortfall: Quantity,
}

impl FIFO<Lot> {
    /// Consume `amount` from the oldest lots first, splitting the last lot if needed.
    ///
    /// A remainder left at or below the dust threshold is discarded rather than kept as a lot.
    pub(crate) fn take_oldest(&mut self, amount: Quantity) -> LotTake {
        let mut takes = Vec::new(); // build up the return vector here
        let mut so_far = Quantity::ZERO;

        // Taking nothing must not pop any lots.
        if !amount.is_positive() {
            return LotTake {
                takes,
                shortfall: Quantity::ZERO,
            };
        }

        while let Some(lot) = self.pop_front() {
            let sum = so_far + lot.quantity;

            match sum.cmp(&amount) {
                Ordering::Equal => {
                    takes.push(lot);
                    so_far = sum;
                    break;
                }
                Ordering::Greater => {
                    let split = lot.split(amount - so_far);

                    takes.push(split.take);
                    if !split.leave.quantity.is_dust() {
                        self.push_front(split.leave);
                    }
                    so_far = amount;
                    break;
                }
                Ordering::Less => {
                    // Consuming the entire lot and continuing the loop.
                    takes.push(lot);
                    so_far = sum;
                }
            }
        }

        LotTake {
            takes,
            shortfall: amount - so_far,
        }
    }

    /// Insert a lot, keeping the queue ordered by acquisition time.
    pub(crate) fn insert_lot(&mut self, lot: Lot) {
        self.insert_ordered_by_key(lot, |lot| lot.acquired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone as _};

    fn lot(day: i64, quantity: &str, unit_cost: &str) -> Lot {
        Lot {
            acquired: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + TimeDelta::days(day),
            quantity: quantity.parse().unwrap(),
            unit_cost: unit_cost.parse().unwrap(),
            origin: format!("lot-{day}"),
        }
    }

    #[test]
    fn test_take_oldest_splits_last_lot() {
        let mut lots: FIFO<Lot> = [lot(0, "2", "100"), lot(1, "3", "150")].into_iter().collect();

        let taken = lots.take_oldest("2.5".parse().unwrap());
        assert_eq!(taken.shortfall, Quantity::ZERO);
        assert_eq!(taken.takes.len(), 2);
        assert_eq!(taken.takes[0].origin, "lot-0");
        assert_eq!(taken.takes[1].quantity, "0.5".parse().unwrap());
        assert_eq!(taken.takes[1].total_cost(), "75".parse().unwrap());

        assert_eq!(lots.len(), 1);
        let rest = lots.peek_front().unwrap();
        assert_eq!(rest.quantity, "2.5".parse().unwrap());
        assert_eq!(rest.origin, "lot-1");
        assert_eq!(rest.unit_cost, "150".parse().unwrap());
    }

    #[test]
    fn test_take_oldest_reports_shortfall() {
        let mut lots: FIFO<Lot> = [lot(0, "1", "1000")].into_iter().collect();

        let taken = lots.take_oldest("2".parse().unwrap());
        assert_eq!(taken.takes.len(), 1);
        assert_eq!(taken.shortfall, "1".parse().unwrap());
        assert!(lots.is_empty());
    }

    #[test]
    fn test_take_oldest_drops_dust_remainder() {
        let mut lots: FIFO<Lot> = [lot(0, "1.0000000000005", "10")].into_iter().collect();

        let taken = lots.take_oldest("1".parse().unwrap());
        assert_eq!(taken.takes.len(), 1);
        assert!(lots.is_empty());
    }

    #[test]
    fn test_take_nothing() {
        let mut lots: FIFO<Lot> = [lot(0, "1", "10")].into_iter().collect();

        let taken = lots.take_oldest(Quantity::ZERO);
        assert!(taken.takes.is_empty());
        assert_eq!(lots.len(), 1);
    }

    #[test]
    fn test_insert_lot_orders_by_acquisition() {
        let mut lots = FIFO::new();
        lots.insert_lot(lot(5, "1", "1"));
        lots.insert_lot(lot(1, "1", "1"));
        lots.insert_lot(lot(3, "1", "1"));

        let days: Vec<_> = lots.iter().map(|lot| lot.origin.as_str()).collect();
        assert_eq!(days, ["lot-1", "lot-3", "lot-5"]);
    }
}
