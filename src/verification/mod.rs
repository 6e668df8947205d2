//! Email ownership proof: one-time codes, their delivery and their consumption.

pub mod email;
mod services;

pub use services::{DeliveryStatus, VerificationService};
