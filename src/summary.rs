//! Fee totals and payment statuses derived from snapshots of the three collections.
//!
//! Nothing here touches storage; callers pass in what they read from the store.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::academic::ACADEMIC_MONTHS;
use crate::model::{sum_amounts, ClassFee, Payment, Student, MAX_CLASS_LEVEL, MIN_CLASS_LEVEL};

/// Months of unpaid fee after which a partly paying student is a defaulter.
pub const DEFAULTER_MONTHS: f64 = 3.0;
pub const RECENT_PAYMENTS: usize = 5;
pub const UNKNOWN_STUDENT: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FeeStatus {
    Paid,
    Partial,
    Defaulter,
    Unpaid,
}

impl FeeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeeStatus::Paid => "Paid",
            FeeStatus::Partial => "Partial",
            FeeStatus::Defaulter => "Defaulter",
            FeeStatus::Unpaid => "Unpaid",
        }
    }

    pub fn parse(s: &str) -> Option<FeeStatus> {
        match s {
            "Paid" => Some(FeeStatus::Paid),
            "Partial" => Some(FeeStatus::Partial),
            "Defaulter" => Some(FeeStatus::Defaulter),
            "Unpaid" => Some(FeeStatus::Unpaid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonthStatus {
    Paid,
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
    Unpaid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub student: Student,
    pub total_fee: f64,
    pub paid: f64,
    pub pending: f64,
    pub status: FeeStatus,
    pub last_payment_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRow {
    pub month: &'static str,
    pub fee: f64,
    pub paid_amount: f64,
    pub status: MonthStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub paid: usize,
    pub partial: usize,
    pub unpaid: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassBucket {
    pub name: String,
    pub paid: f64,
    pub pending: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPayment {
    pub name: String,
    pub student_id: String,
    pub amount: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_students: usize,
    pub total_collection: f64,
    pub pending_payments: f64,
    pub status_counts: StatusCounts,
    pub class_wise: Vec<ClassBucket>,
    pub recent_payments: Vec<RecentPayment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub total_collection: f64,
    pub payments: usize,
}

fn fee_for<'a>(fees: &'a [ClassFee], class_level: u8) -> Option<&'a ClassFee> {
    fees.iter().find(|f| f.class_level == class_level)
}

fn paid_by(payments: &[Payment], student_id: &str) -> f64 {
    sum_amounts(
        payments
            .iter()
            .filter(|p| p.student_id == student_id)
            .map(|p| p.amount),
    )
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Twelve monthly fees plus every one-time fee; zero when the class has no fee record.
pub fn annual_fee(fee: Option<&ClassFee>) -> f64 {
    match fee {
        Some(f) => f.monthly_fee * 12.0 + f.other_fees_total(),
        None => 0.0,
    }
}

pub fn classify(total_fee: f64, paid: f64, monthly_fee: f64) -> FeeStatus {
    let pending = total_fee - paid;
    if pending <= 0.0 && total_fee > 0.0 {
        FeeStatus::Paid
    } else if paid > 0.0 {
        if monthly_fee > 0.0 && pending >= monthly_fee * DEFAULTER_MONTHS {
            FeeStatus::Defaulter
        } else {
            FeeStatus::Partial
        }
    } else {
        FeeStatus::Unpaid
    }
}

pub fn student_record(student: &Student, payments: &[Payment], fees: &[ClassFee]) -> StudentRecord {
    let fee = fee_for(fees, student.class_level);
    let total_fee = annual_fee(fee);
    let paid = paid_by(payments, &student.id);
    let monthly_fee = fee.map(|f| f.monthly_fee).unwrap_or(0.0);

    let last_payment_date = payments
        .iter()
        .filter(|p| p.student_id == student.id)
        .filter_map(|p| parse_date(&p.date).map(|d| (d, &p.date)))
        .max_by_key(|(d, _)| *d)
        .map(|(_, raw)| raw.clone());

    StudentRecord {
        student: student.clone(),
        total_fee,
        paid,
        pending: total_fee - paid,
        status: classify(total_fee, paid, monthly_fee),
        last_payment_date,
    }
}

pub fn student_records(
    students: &[Student],
    payments: &[Payment],
    fees: &[ClassFee],
) -> Vec<StudentRecord> {
    students
        .iter()
        .map(|s| student_record(s, payments, fees))
        .collect()
}

/// Keep records whose name or id contains `term` (case-insensitive) and whose status matches.
pub fn filter_records(
    records: Vec<StudentRecord>,
    term: &str,
    status: Option<FeeStatus>,
) -> Vec<StudentRecord> {
    let term = term.to_lowercase();
    records
        .into_iter()
        .filter(|r| {
            r.student.name.to_lowercase().contains(&term)
                || r.student.id.to_lowercase().contains(&term)
        })
        .filter(|r| status.map(|st| r.status == st).unwrap_or(true))
        .collect()
}

/// Per-month view for one student. `None` when the student's class has no fee record.
pub fn monthly_breakdown(
    student: &Student,
    payments: &[Payment],
    fees: &[ClassFee],
) -> Option<Vec<MonthRow>> {
    let fee = fee_for(fees, student.class_level)?;
    let rows = ACADEMIC_MONTHS
        .iter()
        .map(|&month| {
            let paid_amount = sum_amounts(
                payments
                    .iter()
                    .filter(|p| p.student_id == student.id && p.month == month)
                    .map(|p| p.amount),
            );
            let status = if fee.monthly_fee > 0.0 && paid_amount >= fee.monthly_fee {
                MonthStatus::Paid
            } else if paid_amount > 0.0 {
                MonthStatus::PartiallyPaid
            } else {
                MonthStatus::Unpaid
            };
            MonthRow {
                month,
                fee: fee.monthly_fee,
                paid_amount,
                status,
            }
        })
        .collect();
    Some(rows)
}

pub fn dashboard(students: &[Student], payments: &[Payment], fees: &[ClassFee]) -> Dashboard {
    let mut potential = 0.0;
    let mut counts = StatusCounts::default();
    let mut by_class: BTreeMap<u8, (f64, f64)> = (MIN_CLASS_LEVEL..=MAX_CLASS_LEVEL)
        .map(|c| (c, (0.0, 0.0)))
        .collect();

    for student in students {
        let total = annual_fee(fee_for(fees, student.class_level));
        let paid = paid_by(payments, &student.id);
        potential += total;

        if let Some((class_paid, class_total)) = by_class.get_mut(&student.class_level) {
            *class_paid += paid;
            *class_total += total;
        }

        // A class without fees owes nothing.
        if total <= 0.0 || paid >= total {
            counts.paid += 1;
        } else if paid > 0.0 {
            counts.partial += 1;
        } else {
            counts.unpaid += 1;
        }
    }

    let class_wise = by_class
        .into_iter()
        .map(|(class_level, (paid, total))| ClassBucket {
            name: format!("Class {}", class_level),
            paid,
            pending: (total - paid).max(0.0),
        })
        .collect();

    let total_collection = sum_amounts(payments.iter().map(|p| p.amount));

    Dashboard {
        total_students: students.len(),
        total_collection,
        pending_payments: potential - total_collection,
        status_counts: counts,
        class_wise,
        recent_payments: recent_payments(students, payments, RECENT_PAYMENTS),
    }
}

/// Newest payments first, named after their student.
pub fn recent_payments(students: &[Student], payments: &[Payment], limit: usize) -> Vec<RecentPayment> {
    let mut sorted: Vec<&Payment> = payments.iter().collect();
    sorted.sort_by_key(|p| std::cmp::Reverse(parse_date(&p.date)));
    sorted
        .into_iter()
        .take(limit)
        .map(|p| RecentPayment {
            name: students
                .iter()
                .find(|s| s.id == p.student_id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| UNKNOWN_STUDENT.to_string()),
            student_id: p.student_id.clone(),
            amount: p.amount,
            date: p.date.clone(),
        })
        .collect()
}

/// Payments dated from the start of `start` through the end of `end` (UTC days).
pub fn collection_summary(payments: &[Payment], start: NaiveDate, end: NaiveDate) -> CollectionSummary {
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let until = end
        .and_hms_milli_opt(23, 59, 59, 999)
        .map(|d| d.and_utc())
        .unwrap_or(from);

    let in_range: Vec<&Payment> = payments
        .iter()
        .filter(|p| match parse_date(&p.date) {
            Some(d) => d >= from && d <= until,
            None => false,
        })
        .collect();

    CollectionSummary {
        total_collection: sum_amounts(in_range.iter().map(|p| p.amount)),
        payments: in_range.len(),
    }
}

/// Students still owing money, largest balance first.
pub fn defaulter_list(
    students: &[Student],
    payments: &[Payment],
    fees: &[ClassFee],
    class_level: Option<u8>,
) -> Vec<StudentRecord> {
    let mut out: Vec<StudentRecord> = students
        .iter()
        .filter(|s| class_level.map(|c| s.class_level == c).unwrap_or(true))
        .map(|s| student_record(s, payments, fees))
        .filter(|r| r.pending > 0.0)
        .collect();
    out.sort_by(|a, b| b.pending.total_cmp(&a.pending));
    out
}

pub fn search_students<'a>(
    students: &'a [Student],
    term: &str,
    class_level: Option<u8>,
    section: Option<&str>,
) -> Vec<&'a Student> {
    let term = term.to_lowercase();
    students
        .iter()
        .filter(|s| {
            term.is_empty()
                || s.name.to_lowercase().contains(&term)
                || s.id.to_lowercase().contains(&term)
        })
        .filter(|s| class_level.map(|c| s.class_level == c).unwrap_or(true))
        .filter(|s| section.map(|sec| s.section == sec).unwrap_or(true))
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow<'a> {
    id: &'a str,
    name: &'a str,
    class: u8,
    section: &'a str,
    total_fee: f64,
    paid: f64,
    pending: f64,
    status: &'static str,
    last_payment: &'a str,
}

/// Write records as CSV with a header row. Negative pending amounts are written as 0.
pub fn export_records_csv<W: std::io::Write>(writer: W, records: &[StudentRecord]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(CsvRow {
            id: &r.student.id,
            name: &r.student.name,
            class: r.student.class_level,
            section: &r.student.section,
            total_fee: r.total_fee,
            paid: r.paid,
            pending: r.pending.max(0.0),
            status: r.status.as_str(),
            last_payment: r.last_payment_date.as_deref().unwrap_or("N/A"),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
