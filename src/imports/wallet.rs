use crate::model::{LedgerRecord, WalletLookup};

/// Wallet resolution for imported rows.
///
/// A row's own wallet column wins. Otherwise the first configured default applies, and without
/// one the row is attributed to the input it came from.
#[derive(Clone, Debug, Default)]
pub struct DefaultWallets {
    defaults: Vec<String>,
}

impl DefaultWallets {
    pub fn new<I>(defaults: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            defaults: defaults
                .into_iter()
                .map(|wallet| wallet.as_ref().trim().to_string())
                .filter(|wallet| !wallet.is_empty())
                .collect(),
        }
    }
}

impl WalletLookup for DefaultWallets {
    fn lookup_wallet(&self, record: &LedgerRecord) -> String {
        record
            .wallet
            .as_deref()
            .map(str::trim)
            .filter(|wallet| !wallet.is_empty())
            .or_else(|| self.defaults.first().map(String::as_str))
            .unwrap_or(&*record.source)
            .to_string()
    }
}
