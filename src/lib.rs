pub mod config;
pub mod domain;
pub mod email_client;
pub mod otp_store;
mod routes;
mod startup;
pub mod telemetry;
mod util;

pub use startup::run;
