use super::purchase::Purchase;
use super::response::BillingResult;
use tokio::sync::mpsc;

/// Asynchronous notifications raised by the vendor SDK.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    SetupFinished(BillingResult),
    ServiceDisconnected,
    PurchasesUpdated {
        result: BillingResult,
        purchases: Option<Vec<Purchase>>,
    },
}

pub type EventSender = mpsc::UnboundedSender<BillingEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<BillingEvent>;

/// Creates the channel a `BillingClient` uses to hand events to the adapter's owner.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
