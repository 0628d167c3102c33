use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use crate::error::DashboardError;
use crate::models::{
    is_known_status, Dashboard, DailyStatusCount, MonthSlice, Record, StatusTotals, Table,
};

pub const PREVIOUS_MONTH_MARKER: &str = " (Previous Month)";

pub fn status_totals(table: &Table) -> StatusTotals {
    let mut totals = StatusTotals::new();
    for record in &table.records {
        *totals.entry(record.status.clone()).or_insert(0) += 1;
    }
    totals
}

pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month > 1 {
        (year, month - 1)
    } else {
        (year - 1, 12)
    }
}

pub fn month_name(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|date| date.format("%B").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

fn records_in_month(table: &Table, year: i32, month: u32) -> Vec<Record> {
    table
        .records
        .iter()
        .filter(|record| record.created.year() == year && record.created.month() == month)
        .cloned()
        .collect()
}

/// Picks the month containing `today`, or the one before it when that month
/// has no records. Never looks further back.
pub fn select_month(table: &Table, today: NaiveDate) -> Result<MonthSlice, DashboardError> {
    let (year, month) = (today.year(), today.month());

    let current = records_in_month(table, year, month);
    if !current.is_empty() {
        info!(year, month, rows = current.len(), "using current month");
        return Ok(MonthSlice {
            year,
            month,
            label: month_name(year, month),
            previous: false,
            records: current,
        });
    }

    let (prev_year, prev_month) = previous_month(year, month);
    let previous = records_in_month(table, prev_year, prev_month);
    if previous.is_empty() {
        return Err(DashboardError::NoDataForPeriod { year, month });
    }

    warn!(
        year = prev_year,
        month = prev_month,
        rows = previous.len(),
        "current month is empty, falling back to previous month"
    );
    Ok(MonthSlice {
        year: prev_year,
        month: prev_month,
        label: format!("{}{PREVIOUS_MONTH_MARKER}", month_name(prev_year, prev_month)),
        previous: true,
        records: previous,
    })
}

pub fn daily_status_counts(slice: &MonthSlice) -> Vec<DailyStatusCount> {
    let mut counts: BTreeMap<(u32, &str), usize> = BTreeMap::new();
    for record in &slice.records {
        *counts
            .entry((record.created.day(), record.status.as_str()))
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|((day, status), count)| DailyStatusCount {
            day,
            status: status.to_string(),
            count,
        })
        .collect()
}

pub fn build_dashboard(table: &Table, today: NaiveDate) -> Result<Dashboard, DashboardError> {
    let totals = status_totals(table);
    for status in totals.keys().filter(|status| !is_known_status(status)) {
        warn!(status = %status, "status has no tile");
    }

    let slice = select_month(table, today)?;
    let daily = daily_status_counts(&slice);

    Ok(Dashboard {
        dataset: table.name.clone(),
        year: slice.year,
        month: slice.month,
        month_label: slice.label,
        previous_month: slice.previous,
        totals,
        daily,
    })
}
