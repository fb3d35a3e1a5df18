use serde::{Deserialize, Serialize};

pub const STUDENT_ID_PREFIX: &str = "HCS";
pub const SECTIONS: [&str; 4] = ["A", "B", "C", "D"];
pub const MIN_CLASS_LEVEL: u8 = 1;
pub const MAX_CLASS_LEVEL: u8 = 12;

/// Month label carried by lump-sum payments that predate per-month tracking.
pub const BULK_MONTH: &str = "Multiple";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(rename = "class")]
    pub class_level: u8,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub guardian_name: String,
    pub contact: String,
}

/// A student as submitted for creation; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    #[serde(rename = "class")]
    pub class_level: u8,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub guardian_name: String,
    pub contact: String,
}

impl NewStudent {
    pub fn with_id(self, id: String) -> Student {
        Student {
            id,
            name: self.name,
            class_level: self.class_level,
            section: self.section,
            password: self.password,
            guardian_name: self.guardian_name,
            contact: self.contact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub student_id: String,
    pub amount: f64,
    pub month: String,
    pub year: i32,
    /// ISO 8601 creation timestamp.
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub student_id: String,
    pub amount: f64,
    pub month: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherFee {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassFee {
    pub class_level: u8,
    pub monthly_fee: f64,
    #[serde(default)]
    pub other_fees: Vec<OtherFee>,
}

impl ClassFee {
    pub fn other_fees_total(&self) -> f64 {
        sum_amounts(self.other_fees.iter().map(|f| f.amount))
    }
}

/// Add up money amounts starting from `+0.0`; an empty `Iterator::sum` of f64 is `-0.0`.
pub fn sum_amounts<I: IntoIterator<Item = f64>>(amounts: I) -> f64 {
    amounts.into_iter().fold(0.0, |acc, a| acc + a)
}

/// Numeric suffix of an `HCS` id; ids that do not parse count as zero.
pub fn student_id_number(id: &str) -> u32 {
    id.strip_prefix(STUDENT_ID_PREFIX)
        .unwrap_or(id)
        .parse::<u32>()
        .unwrap_or(0)
}

pub fn format_student_id(n: u32) -> String {
    format!("{}{:04}", STUDENT_ID_PREFIX, n)
}
