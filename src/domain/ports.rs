use super::entitlement::Entitlement;
use super::purchase::{ProductDetails, ProductType, Purchase};
use super::response::{BillingResult, ResponseCode};
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Capability set of the vendor billing SDK.
///
/// Request/response calls resolve in place. Connection completion and
/// purchase-flow results arrive later as `BillingEvent`s on the channel the
/// implementation was built with.
#[async_trait]
pub trait BillingClient: Send + Sync {
    /// Begins connecting; the outcome is delivered as `BillingEvent::SetupFinished`.
    async fn start_connection(&self) -> Result<()>;
    async fn end_connection(&self);
    fn is_ready(&self) -> bool;
    async fn query_purchases(
        &self,
        product_type: ProductType,
    ) -> (BillingResult, Option<Vec<Purchase>>);
    async fn query_product_details(
        &self,
        product_ids: &[String],
        product_type: ProductType,
    ) -> (BillingResult, Vec<ProductDetails>);
    /// Shows the purchase UI; the outcome is delivered as `BillingEvent::PurchasesUpdated`.
    async fn launch_billing_flow(&self, details: &ProductDetails) -> BillingResult;
    async fn consume(&self, purchase_token: &str) -> BillingResult;
    async fn acknowledge(&self, purchase_token: &str) -> BillingResult;
}

/// Flat key-value cache of entitlement flags, two per product id.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn is_bought(&self, product_id: &str) -> Result<bool>;
    async fn was_checked(&self, product_id: &str) -> Result<bool>;
    async fn set_bought(&self, product_id: &str, bought: bool) -> Result<()>;
    async fn set_checked(&self, product_id: &str, checked: bool) -> Result<()>;
    async fn all(&self) -> Result<Vec<Entitlement>>;

    async fn get(&self, product_id: &str) -> Result<Entitlement> {
        Ok(Entitlement {
            product_id: product_id.to_string(),
            is_purchased: self.is_bought(product_id).await?,
            was_checked: self.was_checked(product_id).await?,
        })
    }

    /// Stores a verdict and marks the product as checked.
    async fn record(&self, product_id: &str, bought: bool) -> Result<()> {
        self.set_bought(product_id, bought).await?;
        self.set_checked(product_id, true).await
    }
}

/// Receives the outcome of purchase checks and purchase flows.
pub trait PurchaseListener: Send + Sync {
    fn on_item_bought(&self, product_id: &str);
    fn on_item_not_bought(&self, product_id: Option<&str>);
    fn on_payments_error(&self, error: &BillingError);
    fn on_purchased_items_loaded(&self, purchases: &[Purchase]);
}

/// Receives the outcome of a consumption request.
pub trait ConsumeListener: Send + Sync {
    fn on_item_consumed(&self, result: ResponseCode, purchase_token: &str);
}

pub type BillingClientBox = Box<dyn BillingClient>;
pub type EntitlementStoreBox = Box<dyn EntitlementStore>;
pub type PurchaseListenerRef = Arc<dyn PurchaseListener>;
pub type ConsumeListenerRef = Arc<dyn ConsumeListener>;
