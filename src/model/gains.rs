use crate::model::constants::LONG_TERM_DAYS;
use crate::model::{Quantity, Value};
use crate::util::year_ext::GetYear;
use chrono::{DateTime, Datelike as _, TimeDelta, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

/// Capital gains are classified as either short-term or long-term, based on whether the asset has
/// been held for shorter or longer than one year until date of sale.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GainTerm {
    Short,
    Long,
}

impl GainTerm {
    /// Holding periods of 365 days or more are long-term.
    pub fn classify(acquired: DateTime<Utc>, disposed: DateTime<Utc>) -> Self {
        if disposed - acquired >= TimeDelta::days(LONG_TERM_DAYS) {
            Self::Long
        } else {
            Self::Short
        }
    }
}

impl Display for GainTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Short => "short",
            Self::Long => "long",
        })
    }
}

/// One lot slice consumed by a sale.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Disposal {
    pub wallet: String,
    pub commodity: String,
    pub acquired: DateTime<Utc>,
    pub disposed: DateTime<Utc>,
    pub quantity: Quantity,
    pub basis: Value,
    pub proceeds: Value,
    pub term: GainTerm,
    /// Correlation id of the transaction that acquired the lot.
    pub origin: String,
    /// Correlation id of the sale.
    pub correlation_id: String,
}

impl Disposal {
    pub fn gain(&self) -> Value {
        self.proceeds - self.basis
    }
}

impl GetYear for Disposal {
    fn get_year(&self) -> i32 {
        self.disposed.year()
    }
}

/// Income recognized on receipt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IncomeEvent {
    pub wallet: String,
    pub commodity: String,
    pub time: DateTime<Utc>,
    pub quantity: Quantity,
    pub value: Value,
    pub correlation_id: String,
}

impl GetYear for IncomeEvent {
    fn get_year(&self) -> i32 {
        self.time.year()
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct GainKey {
    pub year: i32,
    pub wallet: String,
    pub commodity: String,
}

impl GainKey {
    pub fn new(year: i32, wallet: &str, commodity: &str) -> Self {
        Self {
            year,
            wallet: wallet.to_string(),
            commodity: commodity.to_string(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct GainRecord {
    pub short_term: Value,
    pub long_term: Value,
    pub income: Value,
}

impl std::ops::AddAssign for GainRecord {
    fn add_assign(&mut self, rhs: Self) {
        self.short_term += rhs.short_term;
        self.long_term += rhs.long_term;
        self.income += rhs.income;
    }
}

/// Realized gains and income by (tax year, wallet, commodity). Entries only ever grow.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GainAccumulator {
    records: BTreeMap<GainKey, GainRecord>,
}

impl GainAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, year: i32, wallet: &str, commodity: &str) -> &mut GainRecord {
        self.records
            .entry(GainKey::new(year, wallet, commodity))
            .or_default()
    }

    pub fn add_short(&mut self, year: i32, wallet: &str, commodity: &str, value: Value) {
        self.entry(year, wallet, commodity).short_term += value;
    }

    pub fn add_long(&mut self, year: i32, wallet: &str, commodity: &str, value: Value) {
        self.entry(year, wallet, commodity).long_term += value;
    }

    pub fn add_income(&mut self, year: i32, wallet: &str, commodity: &str, value: Value) {
        self.entry(year, wallet, commodity).income += value;
    }

    /// Route a disposal's gain to the short-term or long-term column of its sale year.
    pub fn record_disposal(&mut self, disposal: &Disposal) {
        let year = disposal.get_year();
        match disposal.term {
            GainTerm::Short => {
                self.add_short(year, &disposal.wallet, &disposal.commodity, disposal.gain())
            }
            GainTerm::Long => {
                self.add_long(year, &disposal.wallet, &disposal.commodity, disposal.gain())
            }
        }
    }

    pub fn record_income(&mut self, income: &IncomeEvent) {
        self.add_income(
            income.get_year(),
            &income.wallet,
            &income.commodity,
            income.value,
        );
    }

    pub fn get(&self, year: i32, wallet: &str, commodity: &str) -> Option<&GainRecord> {
        self.records.get(&GainKey::new(year, wallet, commodity))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GainKey, &GainRecord)> {
        self.records.iter()
    }

    pub fn years(&self) -> BTreeSet<i32> {
        self.records.keys().map(|key| key.year).collect()
    }

    /// Project the buckets that pass `filter`, ordered by year, wallet, commodity.
    pub fn select<'a>(&'a self, filter: &'a ReportFilter) -> GainsSummary<'a> {
        GainsSummary {
            rows: self
                .records
                .iter()
                .filter(|(key, _)| filter.matches(key))
                .collect(),
        }
    }
}

/// Read-time projection of the accumulator.
///
/// Wallet and commodity names compare case-insensitively after trimming. Empty sets match
/// everything.
#[derive(Clone, Debug, Default)]
pub struct ReportFilter {
    year: Option<i32>,
    wallets: BTreeSet<String>,
    commodities: BTreeSet<String>,
}

fn normalize_names<I, S>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

impl ReportFilter {
    pub fn new<W, C>(year: Option<i32>, wallets: W, commodities: C) -> Self
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            year,
            wallets: normalize_names(wallets),
            commodities: normalize_names(commodities),
        }
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn matches_year(&self, year: i32) -> bool {
        self.year.is_none_or(|wanted| wanted == year)
    }

    pub fn matches_wallet(&self, wallet: &str) -> bool {
        self.wallets.is_empty() || self.wallets.contains(&wallet.trim().to_lowercase())
    }

    pub fn matches_commodity(&self, commodity: &str) -> bool {
        self.commodities.is_empty() || self.commodities.contains(&commodity.trim().to_lowercase())
    }

    pub fn matches(&self, key: &GainKey) -> bool {
        self.matches_year(key.year)
            && self.matches_wallet(&key.wallet)
            && self.matches_commodity(&key.commodity)
    }
}

/// Text summary of selected gain buckets.
#[derive(Debug)]
pub struct GainsSummary<'a> {
    rows: Vec<(&'a GainKey, &'a GainRecord)>,
}

impl<'a> GainsSummary<'a> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column totals over every selected bucket.
    pub fn totals(&self) -> GainRecord {
        let mut totals = GainRecord::default();
        for (_, record) in &self.rows {
            totals += **record;
        }

        totals
    }

    pub fn rows(&self) -> impl Iterator<Item = (&'a GainKey, &'a GainRecord)> + '_ {
        self.rows.iter().copied()
    }
}

impl Display for GainsSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut year = None;
        let mut wallet = None;

        for (key, record) in &self.rows {
            if year != Some(key.year) {
                writeln!(f, "Year {}:", key.year)?;
                year = Some(key.year);
                wallet = None;
            }
            if wallet != Some(key.wallet.as_str()) {
                writeln!(f, "  Wallet: {}", key.wallet)?;
                wallet = Some(key.wallet.as_str());
            }
            writeln!(
                f,
                "    {}: short={} long={} income={}",
                key.commodity, record.short_term, record.long_term, record.income,
            )?;
        }

        Ok(())
    }
}
