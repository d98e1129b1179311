use rust_decimal::Decimal;

/// Holding periods of at least this many days are long-term.
pub const LONG_TERM_DAYS: i64 = 365;

/// Lots whose quantity falls at or below this threshold are removed from inventory.
pub const LOT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 12);

/// Sells and transfers short of inventory by more than this are reported.
pub const SHORTFALL_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Tolerance for comparing fiat values after repeated proration.
pub(crate) const VALUE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 7);

/// Markers on a record's type that make its whole event income.
pub const INCOME_MARKERS: &[&str] = &["earn", "reward", "staking", "income"];

/// Markers on a record's subtype that make its whole event an internal transfer.
pub const ALLOCATION_MARKERS: &[&str] = &["allocation", "autoallocation"];

/// A record type containing this marker is an explicit conversion between commodities.
pub const CONVERT_MARKER: &str = "convert";

/// Record types treated as conversions when matched exactly.
pub const CONVERT_TYPES: &[&str] = &["trade"];

/// Record types that denote a disposal even when the row carries an unsigned quantity.
pub const SELL_TYPES: &[&str] = &["sell", "sale"];

/// Prefix for correlation keys of records that have no reference of their own.
pub const SINGLETON_KEY_PREFIX: &str = "ridx-";
