//! Domain layer: entities, value objects, rules and the ports the
//! application layer depends on. Nothing in here performs I/O.

pub mod authorization;
pub mod ids;
pub mod payment;
pub mod ports;
pub mod query;
pub mod rate;
pub mod shipment;
pub mod status;
pub mod tracking;
pub mod tracking_number;
