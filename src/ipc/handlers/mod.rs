pub mod auth;
pub mod backup;
pub mod core;
pub mod fees;
pub mod payments;
pub mod reports;
pub mod students;
