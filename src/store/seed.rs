//! First-run data for a new workspace.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::{ClassFee, OtherFee, Payment, Student, BULK_MONTH, SECTIONS};

const DEFAULT_PASSWORD: &str = "0000";
const FIRST_GENERATED_ID: u32 = 3001;
const STUDENTS_PER_SECTION: usize = 5;

const FIRST_NAMES: [&str; 20] = [
    "Aarav", "Vivaan", "Aditya", "Vihaan", "Arjun", "Sai", "Reyansh", "Ayaan", "Krishna",
    "Ishaan", "Ananya", "Diya", "Saanvi", "Aadhya", "Myra", "Aarohi", "Siya", "Pari", "Riya",
    "Ira",
];

const LAST_NAMES: [&str; 16] = [
    "Sharma", "Verma", "Gupta", "Singh", "Patel", "Kumar", "Reddy", "Mehta", "Jain", "Shah",
    "Mishra", "Yadav", "Das", "Roy", "Khan", "Ali",
];

fn student(id: &str, name: &str, class_level: u8, section: &str, guardian: &str, contact: &str) -> Student {
    Student {
        id: id.to_string(),
        name: name.to_string(),
        class_level,
        section: section.to_string(),
        password: Some(DEFAULT_PASSWORD.to_string()),
        guardian_name: guardian.to_string(),
        contact: contact.to_string(),
    }
}

/// Named students referenced by the seeded payments.
pub fn fixed_students() -> Vec<Student> {
    vec![
        student("HCS1234", "Rahul Sharma", 10, "A", "Ramesh Sharma", "1234567890"),
        student("HCS1235", "Priya Patel", 9, "B", "Sunil Patel", "0987654321"),
        student("HCS1236", "Amit Kumar", 11, "A", "Anil Kumar", "1122334455"),
        student("HCS2341", "Sneha Gupta", 8, "C", "Rajesh Gupta", "2233445566"),
        student("HCS2342", "Rohan Das", 12, "B", "Suresh Das", "3344556677"),
        student("HCS0003", "Michael Johnson", 10, "B", "Mary Johnson", "1122334455"),
    ]
}

/// Five students for every section of every class, ids counting up from `HCS3001`.
pub fn generated_roster<R: Rng>(rng: &mut R) -> Vec<Student> {
    let mut out = Vec::with_capacity(12 * SECTIONS.len() * STUDENTS_PER_SECTION);
    let mut next_id = FIRST_GENERATED_ID;
    for class_level in 1..=12u8 {
        for section in SECTIONS {
            for _ in 0..STUDENTS_PER_SECTION {
                let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Aarav");
                let last = LAST_NAMES.choose(rng).copied().unwrap_or("Sharma");
                let guardian_first = FIRST_NAMES.choose(rng).copied().unwrap_or("Aarav");
                let contact = format!("9{}", rng.gen_range(100_000_000u32..1_000_000_000));
                out.push(Student {
                    id: format!("HCS{}", next_id),
                    name: format!("{} {}", first, last),
                    class_level,
                    section: section.to_string(),
                    password: Some(DEFAULT_PASSWORD.to_string()),
                    guardian_name: format!("{} {}", guardian_first, last),
                    contact,
                });
                next_id += 1;
            }
        }
    }
    out
}

/// Two tiers: classes 1-10 and 11-12. Other fees split 60/40 into admission and annual.
pub fn initial_fees() -> Vec<ClassFee> {
    (1..=12u8)
        .map(|class_level| {
            let (monthly_fee, other_total) = if class_level >= 11 {
                (12_000.0, 36_000.0)
            } else {
                (10_000.0, 24_000.0)
            };
            ClassFee {
                class_level,
                monthly_fee,
                other_fees: vec![
                    OtherFee {
                        name: "Admission Fee".to_string(),
                        amount: (other_total * 6.0 / 10.0_f64).floor(),
                    },
                    OtherFee {
                        name: "Annual Fee".to_string(),
                        amount: (other_total * 4.0 / 10.0_f64).floor(),
                    },
                ],
            }
        })
        .collect()
}

/// Lump-sum payments for the named students. HCS0003 is left unpaid.
pub fn initial_payments(now: DateTime<Utc>) -> Vec<Payment> {
    let date = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let year = now.year();
    [
        ("P001", "HCS1234", 120_000.0),
        ("P002", "HCS1235", 144_000.0),
        ("P003", "HCS1236", 145_000.0),
        ("P004", "HCS2341", 96_000.0),
        ("P005", "HCS2342", 180_000.0),
    ]
    .into_iter()
    .map(|(id, student_id, amount)| Payment {
        id: id.to_string(),
        student_id: student_id.to_string(),
        amount,
        month: BULK_MONTH.to_string(),
        year,
        date: date.clone(),
    })
    .collect()
}
