//! Outbound adapters implementing the domain's storage port.

pub mod memory;
pub mod persistence;
