use crate::model::{Quantity, Value};
use chrono::{DateTime, Utc};
use std::fmt::{self, Display};
use thiserror::Error;
use tracing::{info, warn};

/// Data-quality problems found while processing. None of them stop the run.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DataWarning {
    /// A sell needed more inventory than the bucket held. Only the matched part realized a gain.
    #[error(
        "Sell of {requested} {commodity} from `{wallet}` at {time} exceeds inventory by {shortfall}"
    )]
    InsufficientInventory {
        wallet: String,
        commodity: String,
        time: DateTime<Utc>,
        requested: Quantity,
        shortfall: Quantity,
    },

    /// A transfer moved less than it asked for because the sending wallet ran out of lots.
    #[error(
        "Transfer of {requested} {commodity} from `{from_wallet}` to `{to_wallet}` at {time} \
         was short by {shortfall}"
    )]
    IncompleteTransfer {
        from_wallet: String,
        to_wallet: String,
        commodity: String,
        time: DateTime<Utc>,
        requested: Quantity,
        shortfall: Quantity,
    },

    /// A transfer leg could not be paired with a sending wallet and was dropped.
    #[error(
        "Transfer `{reference}` of {quantity} {commodity} into `{to_wallet}` at {time} has no \
         source wallet"
    )]
    UnresolvedTransferSource {
        reference: String,
        to_wallet: String,
        commodity: String,
        time: DateTime<Utc>,
        quantity: Quantity,
    },

    /// Income without a valuation. Recorded as zero income with zero-basis inventory.
    #[error(
        "Income `{reference}` of {quantity} {commodity} in `{wallet}` at {time} has no value \
         (recorded as {value})"
    )]
    UnvaluedIncome {
        reference: String,
        wallet: String,
        commodity: String,
        time: DateTime<Utc>,
        quantity: Quantity,
        value: Value,
    },
}

impl DataWarning {
    /// Advisories describe incomplete inputs that were still handled in full.
    pub fn is_advisory(&self) -> bool {
        matches!(self, Self::UnvaluedIncome { .. })
    }
}

/// Collects data-quality warnings for the end-of-run report.
#[derive(Debug, Default)]
pub struct Warnings {
    inner: Vec<DataWarning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log the warning and keep it for the report.
    pub fn push(&mut self, warning: DataWarning) {
        if warning.is_advisory() {
            info!("{warning}");
        } else {
            warn!("{warning}");
        }
        self.inner.push(warning);
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataWarning> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Data Quality CheckList")?;
        writeln!(f, "==== ======= =========")?;
        writeln!(f)?;

        if self.is_empty() {
            writeln!(f, "No issues detected! 🎉")?;
        } else {
            for warning in &self.inner {
                let marker = if warning.is_advisory() { "ℹ️" } else { "⚠️" };
                writeln!(f, "  {marker} {warning}")?;
            }
        }

        Ok(())
    }
}
