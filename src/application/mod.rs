//! Application layer coordinating the billing connection and purchase flows.
//!
//! This module defines the `PurchaseAdapter`, the single entry point a host
//! application uses to check, buy and consume products. Vendor callbacks are
//! delivered to it as events over a `tokio` channel, so all state changes
//! happen on whichever task owns the adapter.

pub mod adapter;
pub mod connection;
