//! CSV worksheets behind the text summary.

use crate::basis::Ledger;
use crate::model::{Disposal, GainTerm, GainsSummary, IncomeEvent, Price, Quantity};
use crate::model::{ReportFilter, Value};
use crate::util::year_ext::GetYear as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorksheetError {
    #[error("CSV error")]
    Csv(#[from] csv::Error),

    #[error("I/O error")]
    Io(#[from] io::Error),
}

#[derive(Debug)]
pub struct Worksheet<R> {
    name: &'static str,
    rows: Vec<R>,
}

impl<R: Serialize> Worksheet<R> {
    /// Short name, also used as the file name stem.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the header and every row.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), WorksheetError> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct GainRow<'a> {
    year: i32,
    wallet: &'a str,
    commodity: &'a str,
    short_term: Value,
    long_term: Value,
    income: Value,
}

#[derive(Debug, Serialize)]
pub struct TradeRow<'a> {
    date_acquired: DateTime<Utc>,
    date_sold: DateTime<Utc>,
    wallet: &'a str,
    commodity: &'a str,
    quantity: Quantity,
    basis: Value,
    proceeds: Value,
    gain: Value,
    term: GainTerm,
    acquired_by: &'a str,
    sold_by: &'a str,
}

#[derive(Debug, Serialize)]
pub struct IncomeRow<'a> {
    date: DateTime<Utc>,
    wallet: &'a str,
    commodity: &'a str,
    quantity: Quantity,
    value: Value,
    reference: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OpenLotRow<'a> {
    wallet: &'a str,
    commodity: &'a str,
    date_acquired: DateTime<Utc>,
    quantity: Quantity,
    unit_cost: Price,
    total_cost: Value,
    acquired_by: &'a str,
}

/// One row per (year, wallet, commodity) bucket of the summary.
pub fn gains<'a>(summary: &GainsSummary<'a>) -> Worksheet<GainRow<'a>> {
    let rows = summary
        .rows()
        .map(|(key, record)| GainRow {
            year: key.year,
            wallet: &key.wallet,
            commodity: &key.commodity,
            short_term: record.short_term,
            long_term: record.long_term,
            income: record.income,
        })
        .collect();

    Worksheet { name: "gains", rows }
}

/// One row per lot slice consumed by a sale.
pub fn trade_details<'a>(
    disposals: &'a [Disposal],
    filter: &ReportFilter,
) -> Worksheet<TradeRow<'a>> {
    let rows = disposals
        .iter()
        .filter(|disposal| {
            filter.matches_year(disposal.get_year())
                && filter.matches_wallet(&disposal.wallet)
                && filter.matches_commodity(&disposal.commodity)
        })
        .map(|disposal| TradeRow {
            date_acquired: disposal.acquired,
            date_sold: disposal.disposed,
            wallet: &disposal.wallet,
            commodity: &disposal.commodity,
            quantity: disposal.quantity,
            basis: disposal.basis,
            proceeds: disposal.proceeds,
            gain: disposal.gain(),
            term: disposal.term,
            acquired_by: &disposal.origin,
            sold_by: &disposal.correlation_id,
        })
        .collect();

    Worksheet {
        name: "trade-details",
        rows,
    }
}

pub fn income_details<'a>(
    income: &'a [IncomeEvent],
    filter: &ReportFilter,
) -> Worksheet<IncomeRow<'a>> {
    let rows = income
        .iter()
        .filter(|event| {
            filter.matches_year(event.get_year())
                && filter.matches_wallet(&event.wallet)
                && filter.matches_commodity(&event.commodity)
        })
        .map(|event| IncomeRow {
            date: event.time,
            wallet: &event.wallet,
            commodity: &event.commodity,
            quantity: event.quantity,
            value: event.value,
            reference: &event.correlation_id,
        })
        .collect();

    Worksheet {
        name: "income-details",
        rows,
    }
}

/// Inventory left at the end of the run. The year filter does not apply to open lots.
pub fn open_lots<'a>(ledger: &'a Ledger, filter: &ReportFilter) -> Worksheet<OpenLotRow<'a>> {
    let rows = ledger
        .open_lots()
        .filter(|(key, _)| {
            filter.matches_wallet(&key.wallet) && filter.matches_commodity(&key.commodity)
        })
        .map(|(key, lot)| OpenLotRow {
            wallet: &key.wallet,
            commodity: &key.commodity,
            date_acquired: lot.acquired,
            quantity: lot.quantity,
            unit_cost: lot.unit_cost,
            total_cost: lot.total_cost(),
            acquired_by: &lot.origin,
        })
        .collect();

    Worksheet {
        name: "open-lots",
        rows,
    }
}
