pub use self::ledger::{BucketKey, Ledger, LedgerBucket, Moved, Sale};
pub use self::lot::Lot;

mod ledger;
mod lot;
