pub mod activity;
pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod leads;
pub mod tasks;
