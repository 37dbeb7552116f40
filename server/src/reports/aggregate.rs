use rust_decimal::Decimal;

use crate::models::{BillRecord, StatusCount, TypeStatusCount};

/// Exact sums over a set of bills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevenueTotals {
    pub revenue: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
}

impl RevenueTotals {
    pub fn from_bills(bills: &[BillRecord]) -> Self {
        bills.iter().fold(Self::default(), |acc, record| Self {
            revenue: acc.revenue + record.bill.total,
            tax: acc.tax + record.bill.tax,
            discount: acc.discount + record.bill.discount,
        })
    }
}

/// Order breakdown rows by the status enum's declaration order.
pub fn sort_status_counts<S: Ord>(counts: &mut [StatusCount<S>]) {
    counts.sort_by(|a, b| a.status.cmp(&b.status));
}

pub fn sort_type_status_counts(counts: &mut [TypeStatusCount]) {
    counts.sort_by(|a, b| {
        a.encounter_type
            .cmp(&b.encounter_type)
            .then(a.status.cmp(&b.status))
    });
}
