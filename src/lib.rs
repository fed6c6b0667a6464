//! Shipment lifecycle core for a parcel logistics business.
//!
//! The crate prices shipments, mints tracking numbers, drives each shipment
//! through its status state machine while appending to an append-only
//! tracking ledger, and gates every operation behind explicit permission
//! predicates. Storage and the payment gateway are reached through the async
//! ports in [`domain::ports`].

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod telemetry;
