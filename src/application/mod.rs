//! Application layer orchestrating the shipment lifecycle.
//!
//! [`service::ShipmentService`] is the single entry point used by the CLI
//! and by any API layer: it sequences pricing, tracking-number minting,
//! authorization and atomic store updates for each operation.

pub mod service;
