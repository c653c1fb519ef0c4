pub mod accounts;
pub mod admin;
