pub mod entitlement_writer;
pub mod event_reporter;
