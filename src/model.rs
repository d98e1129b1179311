pub use self::amount::{ConvertAmountError, Price, Quantity, Value};
pub use self::events::{group_records, EventGroup, EventKind, Settlement};
pub use self::fiat::{Fiat, FiatError};
pub use self::gains::{Disposal, GainAccumulator, GainKey, GainRecord, GainTerm, GainsSummary};
pub use self::gains::{IncomeEvent, ReportFilter};
pub use self::records::LedgerRecord;
pub use self::state::State;
pub use self::stats::Stats;
pub use self::transactions::{merge_chronologically, normalize};
pub use self::transactions::{NormalizedTransaction, TxKind, WalletLookup};
pub use self::warnings::{DataWarning, Warnings};

pub mod amount;
pub mod constants;
mod events;
mod fiat;
mod gains;
pub(crate) mod records;
mod state;
mod stats;
mod transactions;
pub mod worksheets;
mod warnings;
