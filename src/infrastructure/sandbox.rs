use crate::domain::event::{BillingEvent, EventSender};
use crate::domain::ports::BillingClient;
use crate::domain::purchase::{ProductDetails, ProductType, Purchase, test_products};
use crate::domain::response::{BillingResult, ResponseCode};
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// An in-process billing service answering with the vendor's static test
/// responses.
///
/// Purchasing `android.test.canceled` ends in `USER_CANCELED`,
/// `android.test.item_unavailable` is refused at launch, and any other product
/// is granted as an unacknowledged purchase whose token is
/// `inapp:{package}:{product}`.
#[derive(Clone)]
pub struct SandboxBillingClient {
    package_name: String,
    events: EventSender,
    setup_result: ResponseCode,
    ready: Arc<AtomicBool>,
    owned: Arc<Mutex<Vec<Purchase>>>,
}

impl SandboxBillingClient {
    pub fn new(package_name: impl Into<String>, events: EventSender) -> Self {
        Self {
            package_name: package_name.into(),
            events,
            setup_result: ResponseCode::Ok,
            ready: Arc::new(AtomicBool::new(false)),
            owned: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Makes every connection attempt finish with `code`.
    pub fn with_setup_result(mut self, code: ResponseCode) -> Self {
        self.setup_result = code;
        self
    }

    /// Seeds a purchase the account already owns.
    pub async fn grant(&self, product_id: &str) -> Purchase {
        let purchase = Purchase::new(product_id, self.token_for(product_id));
        self.owned.lock().await.push(purchase.clone());
        purchase
    }

    pub async fn owned(&self) -> Vec<Purchase> {
        self.owned.lock().await.clone()
    }

    fn token_for(&self, product_id: &str) -> String {
        test_products::consume_token(&self.package_name, product_id)
    }

    fn emit(&self, event: BillingEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|e| BillingError::InternalError(Box::new(e)))
    }
}

#[async_trait]
impl BillingClient for SandboxBillingClient {
    async fn start_connection(&self) -> Result<()> {
        let connected = self.setup_result.is_ok();
        self.ready.store(connected, Ordering::SeqCst);
        self.emit(BillingEvent::SetupFinished(BillingResult::new(
            self.setup_result.raw(),
            "sandbox setup",
        )))
    }

    async fn end_connection(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn query_purchases(
        &self,
        _product_type: ProductType,
    ) -> (BillingResult, Option<Vec<Purchase>>) {
        (BillingResult::ok(), Some(self.owned().await))
    }

    async fn query_product_details(
        &self,
        product_ids: &[String],
        product_type: ProductType,
    ) -> (BillingResult, Vec<ProductDetails>) {
        let details = product_ids
            .iter()
            .map(|id| ProductDetails {
                product_id: id.clone(),
                product_type,
                title: format!("Sandbox {}", id),
                description: String::new(),
                price_amount_micros: 990_000,
                price_currency_code: "USD".to_string(),
                formatted_price: "$0.99".to_string(),
            })
            .collect();
        (BillingResult::ok(), details)
    }

    async fn launch_billing_flow(&self, details: &ProductDetails) -> BillingResult {
        let product_id = details.product_id.as_str();
        debug!(product_id, "Sandbox purchase flow");
        let update = match product_id {
            test_products::ITEM_UNAVAILABLE => {
                return BillingResult::new(ResponseCode::ItemUnavailable.raw(), "sandbox refusal");
            }
            test_products::CANCELED => BillingEvent::PurchasesUpdated {
                result: BillingResult::from_code(ResponseCode::UserCanceled),
                purchases: None,
            },
            _ => {
                let mut owned = self.owned.lock().await;
                if owned.iter().any(|p| p.contains(product_id)) {
                    BillingEvent::PurchasesUpdated {
                        result: BillingResult::from_code(ResponseCode::ItemAlreadyOwned),
                        purchases: None,
                    }
                } else {
                    let purchase = Purchase::new(product_id, self.token_for(product_id));
                    owned.push(purchase.clone());
                    BillingEvent::PurchasesUpdated {
                        result: BillingResult::ok(),
                        purchases: Some(vec![purchase]),
                    }
                }
            }
        };
        match self.emit(update) {
            Ok(()) => BillingResult::ok(),
            Err(e) => BillingResult::new(ResponseCode::Error.raw(), e.to_string()),
        }
    }

    async fn consume(&self, purchase_token: &str) -> BillingResult {
        let mut owned = self.owned.lock().await;
        let before = owned.len();
        owned.retain(|p| p.purchase_token != purchase_token);
        if owned.len() < before {
            BillingResult::ok()
        } else {
            BillingResult::from_code(ResponseCode::ItemNotOwned)
        }
    }

    async fn acknowledge(&self, purchase_token: &str) -> BillingResult {
        let mut owned = self.owned.lock().await;
        match owned.iter_mut().find(|p| p.purchase_token == purchase_token) {
            Some(purchase) => {
                purchase.acknowledged = true;
                BillingResult::ok()
            }
            None => BillingResult::from_code(ResponseCode::ItemNotOwned),
        }
    }
}
