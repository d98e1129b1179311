use crate::basis::{BucketKey, Ledger};
use crate::model::{DataWarning, Disposal, GainAccumulator, IncomeEvent, NormalizedTransaction};
use crate::model::{Quantity, TxKind, Warnings};
use tracing::debug;

/// Everything one processing pass produces: the ledger, realized gains and income, the detail
/// behind them, and the data-quality warnings raised along the way.
#[derive(Debug, Default)]
pub struct State {
    pub ledger: Ledger,
    pub gains: GainAccumulator,
    pub disposals: Vec<Disposal>,
    pub income: Vec<IncomeEvent>,
    pub warnings: Warnings,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply transactions strictly in the given order.
    ///
    /// Callers provide them sorted with [`merge_chronologically`].
    ///
    /// [`merge_chronologically`]: crate::model::merge_chronologically
    pub fn resolve(&mut self, transactions: &[NormalizedTransaction]) {
        for tx in transactions {
            self.apply(tx);
        }
    }

    pub fn apply(&mut self, tx: &NormalizedTransaction) {
        let key = BucketKey::new(&tx.wallet, &tx.commodity);
        let quantity = tx.quantity.abs();
        debug!(
            time = %tx.time,
            kind = ?tx.kind,
            wallet = %tx.wallet,
            commodity = %tx.commodity,
            %quantity,
            consideration = %tx.consideration,
            fee = %tx.fee,
            "Processing transaction"
        );

        match &tx.kind {
            TxKind::Buy => self.buy(&key, tx, quantity),
            TxKind::Sell => self.sell(&key, tx, quantity),
            TxKind::Convert if tx.quantity.is_positive() => self.buy(&key, tx, quantity),
            TxKind::Convert => self.sell(&key, tx, quantity),
            TxKind::Income => self.income(&key, tx, quantity),
            TxKind::Transfer { source_wallet } => self.transfer(source_wallet, tx, quantity),
        }
    }

    fn buy(&mut self, key: &BucketKey, tx: &NormalizedTransaction, quantity: Quantity) {
        self.ledger.apply_buy(
            key,
            tx.time,
            quantity,
            tx.consideration,
            tx.fee,
            &tx.correlation_id,
        );
    }

    fn sell(&mut self, key: &BucketKey, tx: &NormalizedTransaction, quantity: Quantity) {
        let sale = self.ledger.apply_sell(
            key,
            tx.time,
            quantity,
            tx.consideration,
            tx.fee,
            &tx.correlation_id,
        );

        for disposal in &sale.disposals {
            self.gains.record_disposal(disposal);
        }
        self.disposals.extend(sale.disposals);

        if let Some(shortfall) = sale.shortfall {
            self.warnings.push(DataWarning::InsufficientInventory {
                wallet: tx.wallet.clone(),
                commodity: tx.commodity.clone(),
                time: tx.time,
                requested: quantity,
                shortfall,
            });
        }
    }

    fn income(&mut self, key: &BucketKey, tx: &NormalizedTransaction, quantity: Quantity) {
        let value = tx.consideration;
        let Some(income) =
            self.ledger
                .apply_income(key, tx.time, quantity, value, &tx.correlation_id)
        else {
            return;
        };

        if value.is_zero() {
            self.warnings.push(DataWarning::UnvaluedIncome {
                reference: tx.correlation_id.clone(),
                wallet: tx.wallet.clone(),
                commodity: tx.commodity.clone(),
                time: tx.time,
                quantity,
                value,
            });
        }

        self.gains.record_income(&income);
        self.income.push(income);
    }

    fn transfer(&mut self, source_wallet: &str, tx: &NormalizedTransaction, quantity: Quantity) {
        let source = BucketKey::new(source_wallet, &tx.commodity);
        let moved = self.ledger.apply_transfer(&source, &tx.wallet, quantity);

        if let Some(shortfall) = moved.shortfall {
            self.warnings.push(DataWarning::IncompleteTransfer {
                from_wallet: source_wallet.to_string(),
                to_wallet: tx.wallet.clone(),
                commodity: tx.commodity.clone(),
                time: tx.time,
                requested: quantity,
                shortfall,
            });
        }
    }
}
