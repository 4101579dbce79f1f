//! Domain types and the ports the adapter talks through.

pub mod entitlement;
pub mod event;
pub mod ports;
pub mod purchase;
pub mod response;
