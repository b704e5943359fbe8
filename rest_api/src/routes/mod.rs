// rest_api/src/routes/mod.rs

pub mod admin;
pub mod doctors;
pub mod password_reset;
pub mod prescriptions;
pub mod uploads;
