use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub created: NaiveDateTime,
    pub status: String,
}

/// A dataset loaded once per run, carried by value between stages.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub records: Vec<Record>,
}

pub type StatusTotals = BTreeMap<String, usize>;

#[derive(Debug, Clone)]
pub struct MonthSlice {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub previous: bool,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStatusCount {
    pub day: u32,
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub dataset: String,
    pub year: i32,
    pub month: u32,
    pub month_label: String,
    pub previous_month: bool,
    pub totals: StatusTotals,
    pub daily: Vec<DailyStatusCount>,
}

/// Display settings for a known onboarding status.
#[derive(Debug, Clone, Copy)]
pub struct StatusStyle {
    pub key: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

/// Known statuses in tile order. New categories only need a row here.
pub const STATUS_STYLES: &[StatusStyle] = &[
    StatusStyle {
        key: "ACTIVE",
        label: "Active",
        color: "#33bd33",
    },
    StatusStyle {
        key: "SUSPENDED",
        label: "Suspended",
        color: "#fc8b8b",
    },
    StatusStyle {
        key: "PENDINGIDVERIFICATION",
        label: "Pending Verification",
        color: "#e3cb14",
    },
    StatusStyle {
        key: "TERMINATED",
        label: "Terminated",
        color: "#000000",
    },
    StatusStyle {
        key: "PENDINGKYC",
        label: "Pending KYC",
        color: "#ff8800",
    },
];

pub fn status_style(status: &str) -> Option<&'static StatusStyle> {
    STATUS_STYLES.iter().find(|style| style.key == status)
}

pub fn is_known_status(status: &str) -> bool {
    status_style(status).is_some()
}
