//! Typed access to the students, payments and fees collections.
//!
//! Every operation reads the whole collection from storage, changes it in memory and
//! writes it back once. Nothing is cached between calls, so a second process writing the
//! same workspace is seen on the next read (and can be overwritten by the next write).

mod error;
pub mod seed;
mod storage;

pub use error::{StoreError, StoreResult};
#[cfg(test)]
pub use storage::MemoryStorage;
pub use storage::{CollectionKey, KeyValueStorage, SqliteStorage};

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::academic::{academic_month_index, academic_year_start, is_academic_month, payment_year};
use crate::model::{
    format_student_id, student_id_number, ClassFee, NewPayment, NewStudent, Payment, Student,
    MAX_CLASS_LEVEL, MIN_CLASS_LEVEL, SECTIONS,
};

pub type Clock = Box<dyn Fn() -> DateTime<Utc>>;
pub type Subscriber = Box<dyn FnMut(CollectionKey)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Which collections `initialize` had to create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub students: bool,
    pub fees: bool,
    pub payments: bool,
}

/// A full copy of the three collections, as written to and read from a backup bundle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collections {
    pub students: Vec<Student>,
    pub payments: Vec<Payment>,
    pub fees: Vec<ClassFee>,
}

impl Collections {
    pub fn count(&self, key: CollectionKey) -> usize {
        match key {
            CollectionKey::Students => self.students.len(),
            CollectionKey::Payments => self.payments.len(),
            CollectionKey::Fees => self.fees.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedStudent {
    pub student_removed: bool,
    pub payments_removed: usize,
}

pub struct FeeStore<S> {
    storage: S,
    clock: Clock,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl<S: KeyValueStorage> FeeStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, Box::new(Utc::now))
    }

    pub fn with_clock(storage: S, clock: Clock) -> Self {
        Self {
            storage,
            clock,
            subscribers: Vec::new(),
            next_subscription: 1,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Register a callback invoked with the key of every collection written.
    pub fn subscribe(&mut self, callback: impl FnMut(CollectionKey) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self, key: CollectionKey) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(key);
        }
    }

    fn read<T: DeserializeOwned>(&self, key: CollectionKey) -> StoreResult<Vec<T>> {
        match self.storage.get(key.as_str())? {
            Some(value) => serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
                key: key.as_str(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    fn write<T: Serialize>(&mut self, key: CollectionKey, items: &[T]) -> StoreResult<()> {
        let value = serde_json::to_value(items).map_err(anyhow::Error::from)?;
        self.storage.set(key.as_str(), &value)?;
        debug!(key = key.as_str(), count = items.len(), "collection written");
        self.notify(key);
        Ok(())
    }

    fn timestamp(&self) -> (DateTime<Utc>, String) {
        let now = self.now();
        (now, now.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Seed missing collections. A present `students` key means students are left alone;
    /// `fees` and `payments` are checked independently.
    pub fn initialize(&mut self) -> StoreResult<SeedReport> {
        self.initialize_with_rng(&mut rand::thread_rng())
    }

    pub fn initialize_with_rng<R: Rng>(&mut self, rng: &mut R) -> StoreResult<SeedReport> {
        let mut report = SeedReport::default();

        if !self.storage.contains(CollectionKey::Students.as_str())? {
            let mut students = seed::fixed_students();
            students.extend(seed::generated_roster(rng));
            self.write(CollectionKey::Students, &students)?;
            report.students = true;
        }
        if !self.storage.contains(CollectionKey::Fees.as_str())? {
            self.write(CollectionKey::Fees, &seed::initial_fees())?;
            report.fees = true;
        }
        if !self.storage.contains(CollectionKey::Payments.as_str())? {
            let payments = seed::initial_payments(self.now());
            self.write(CollectionKey::Payments, &payments)?;
            report.payments = true;
        }

        if report != SeedReport::default() {
            info!(
                students = report.students,
                fees = report.fees,
                payments = report.payments,
                "seeded missing collections"
            );
        }
        Ok(report)
    }

    pub fn get_students(&self) -> StoreResult<Vec<Student>> {
        self.read(CollectionKey::Students)
    }

    pub fn get_student_by_id(&self, id: &str) -> StoreResult<Option<Student>> {
        Ok(self.get_students()?.into_iter().find(|s| s.id == id))
    }

    /// Store a new student under the next free `HCS` number.
    pub fn add_student(&mut self, new: NewStudent) -> StoreResult<Student> {
        validate_profile(
            &new.name,
            new.class_level,
            &new.section,
            &new.guardian_name,
            &new.contact,
        )?;

        let mut students = self.get_students()?;
        let max = students
            .iter()
            .map(|s| student_id_number(&s.id))
            .max()
            .unwrap_or(0);
        let next = max
            .checked_add(1)
            .ok_or_else(|| StoreError::Conflict(format_student_id(max)))?;
        let id = format_student_id(next);
        if students.iter().any(|s| s.id == id) {
            return Err(StoreError::Conflict(id));
        }

        let student = new.with_id(id);
        students.push(student.clone());
        self.write(CollectionKey::Students, &students)?;
        info!(student_id = %student.id, class = student.class_level, "student added");
        Ok(student)
    }

    /// Replace the stored record with the same id, keeping its position.
    pub fn update_student(&mut self, student: Student) -> StoreResult<()> {
        validate_profile(
            &student.name,
            student.class_level,
            &student.section,
            &student.guardian_name,
            &student.contact,
        )?;

        let mut students = self.get_students()?;
        let Some(slot) = students.iter_mut().find(|s| s.id == student.id) else {
            return Err(StoreError::StudentNotFound(student.id));
        };
        *slot = student;
        self.write(CollectionKey::Students, &students)
    }

    /// Remove a student and every payment that references them. Absent ids are a no-op.
    pub fn delete_student(&mut self, id: &str) -> StoreResult<DeletedStudent> {
        let mut students = self.get_students()?;
        let before = students.len();
        students.retain(|s| s.id != id);
        let student_removed = students.len() != before;
        self.write(CollectionKey::Students, &students)?;

        let mut payments = self.get_payments()?;
        let before = payments.len();
        payments.retain(|p| p.student_id != id);
        let payments_removed = before - payments.len();
        self.write(CollectionKey::Payments, &payments)?;

        info!(student_id = id, student_removed, payments_removed, "student deleted");
        Ok(DeletedStudent {
            student_removed,
            payments_removed,
        })
    }

    pub fn get_payments(&self) -> StoreResult<Vec<Payment>> {
        self.read(CollectionKey::Payments)
    }

    pub fn get_payments_by_student_id(&self, student_id: &str) -> StoreResult<Vec<Payment>> {
        let mut payments = self.get_payments()?;
        payments.retain(|p| p.student_id == student_id);
        Ok(payments)
    }

    pub fn record_payment(&mut self, new: NewPayment) -> StoreResult<Payment> {
        validate_amount("amount", new.amount)?;

        let (now, date) = self.timestamp();
        let payment = Payment {
            id: format!("P{}", now.timestamp_millis()),
            student_id: new.student_id,
            amount: new.amount,
            month: new.month,
            year: new.year,
            date,
        };

        let mut payments = self.get_payments()?;
        payments.push(payment.clone());
        self.write(CollectionKey::Payments, &payments)?;
        info!(payment_id = %payment.id, student_id = %payment.student_id, amount = payment.amount, "payment recorded");
        Ok(payment)
    }

    pub fn get_fee_structures(&self) -> StoreResult<Vec<ClassFee>> {
        self.read(CollectionKey::Fees)
    }

    /// First fee record for the class; duplicates are not rejected on write.
    pub fn get_fee_structure(&self, class_level: u8) -> StoreResult<Option<ClassFee>> {
        Ok(self
            .get_fee_structures()?
            .into_iter()
            .find(|f| f.class_level == class_level))
    }

    /// Overwrite the whole fee collection.
    pub fn update_fee_structure(&mut self, fees: Vec<ClassFee>) -> StoreResult<()> {
        self.write(CollectionKey::Fees, &fees)
    }

    /// Make `paid_months` the complete set of academic-month payments for a student.
    ///
    /// Every existing payment of the student tagged with an academic month is dropped and
    /// one full-fee payment per requested month is created for the current session.
    /// Payments under other labels (lump sums) are kept.
    pub fn update_monthly_payments<I, M>(
        &mut self,
        student_id: &str,
        paid_months: I,
    ) -> StoreResult<Vec<Payment>>
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        let student = self
            .get_student_by_id(student_id)?
            .ok_or_else(|| StoreError::StudentNotFound(student_id.to_string()))?;
        let fee = self
            .get_fee_structure(student.class_level)?
            .ok_or(StoreError::FeeStructureNotFound(student.class_level))?;

        // Keyed by session position so output follows April..March and duplicates collapse.
        let mut months: BTreeMap<usize, String> = BTreeMap::new();
        for m in paid_months {
            let name = m.as_ref();
            let Some(idx) = academic_month_index(name) else {
                return Err(StoreError::validation(
                    "months",
                    format!("'{}' is not an academic month", name),
                ));
            };
            months.insert(idx, name.to_string());
        }

        let mut payments = self.get_payments()?;
        payments.retain(|p| p.student_id != student_id || !is_academic_month(&p.month));

        let (now, date) = self.timestamp();
        let start_year = academic_year_start(now.date_naive());
        let created: Vec<Payment> = months
            .into_values()
            .map(|month| Payment {
                id: format!(
                    "P{}-{}",
                    now.timestamp_millis(),
                    &Uuid::new_v4().simple().to_string()[..8]
                ),
                student_id: student_id.to_string(),
                amount: fee.monthly_fee,
                year: payment_year(&month, start_year),
                month,
                date: date.clone(),
            })
            .collect();

        payments.extend(created.iter().cloned());
        self.write(CollectionKey::Payments, &payments)?;
        info!(
            student_id,
            months = created.len(),
            academic_year = start_year,
            "monthly payments reconciled"
        );
        Ok(created)
    }

    pub fn export_collections(&self) -> StoreResult<Collections> {
        Ok(Collections {
            students: self.get_students()?,
            payments: self.get_payments()?,
            fees: self.get_fee_structures()?,
        })
    }

    /// Overwrite all three collections with `collections`.
    pub fn restore(&mut self, collections: Collections) -> StoreResult<()> {
        self.write(CollectionKey::Students, &collections.students)?;
        self.write(CollectionKey::Fees, &collections.fees)?;
        self.write(CollectionKey::Payments, &collections.payments)?;
        info!(
            students = collections.students.len(),
            payments = collections.payments.len(),
            fees = collections.fees.len(),
            "collections restored"
        );
        Ok(())
    }
}

fn validate_profile(
    name: &str,
    class_level: u8,
    section: &str,
    guardian_name: &str,
    contact: &str,
) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::validation("name", "must not be empty"));
    }
    if !(MIN_CLASS_LEVEL..=MAX_CLASS_LEVEL).contains(&class_level) {
        return Err(StoreError::validation(
            "class",
            format!("must be between {} and {}", MIN_CLASS_LEVEL, MAX_CLASS_LEVEL),
        ));
    }
    if !SECTIONS.contains(&section) {
        return Err(StoreError::validation(
            "section",
            format!("must be one of {}", SECTIONS.join(", ")),
        ));
    }
    if guardian_name.trim().is_empty() {
        return Err(StoreError::validation("guardianName", "must not be empty"));
    }
    if contact.trim().is_empty() {
        return Err(StoreError::validation("contact", "must not be empty"));
    }
    Ok(())
}

fn validate_amount(field: &'static str, amount: f64) -> StoreResult<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(StoreError::validation(field, "must be a non-negative number"));
    }
    Ok(())
}
