#![allow(dead_code)]

use async_trait::async_trait;
use billing_bridge::application::adapter::{AdapterConfig, PurchaseAdapter};
use billing_bridge::domain::event::BillingEvent;
use billing_bridge::domain::entitlement::Entitlement;
use billing_bridge::domain::ports::{
    BillingClient, ConsumeListener, EntitlementStore, PurchaseListener,
};
use billing_bridge::domain::purchase::{ProductDetails, ProductType, Purchase};
use billing_bridge::domain::response::{BillingResult, ResponseCode};
use billing_bridge::error::{BillingError, Result};
use billing_bridge::infrastructure::in_memory::InMemoryEntitlementStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted vendor client. Records every call; connection results are fed by
/// the test through `PurchaseAdapter::handle_event`.
#[derive(Clone, Default)]
pub struct MockBillingClient {
    state: Arc<Mutex<MockState>>,
}

pub struct MockState {
    pub calls: Vec<String>,
    pub ready: bool,
    pub purchases_result: BillingResult,
    pub purchases: Option<Vec<Purchase>>,
    pub details_result: BillingResult,
    /// Products the metadata query knows about; `None` answers for every id.
    pub known_products: Option<Vec<String>>,
    pub launch_result: BillingResult,
    pub consume_results: VecDeque<BillingResult>,
    pub ack_result: BillingResult,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            ready: false,
            purchases_result: BillingResult::ok(),
            purchases: Some(Vec::new()),
            details_result: BillingResult::ok(),
            known_products: None,
            launch_result: BillingResult::ok(),
            consume_results: VecDeque::new(),
            ack_result: BillingResult::ok(),
        }
    }
}

impl MockBillingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn with<F: FnOnce(&mut MockState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl BillingClient for MockBillingClient {
    async fn start_connection(&self) -> Result<()> {
        self.record("start_connection".to_string());
        Ok(())
    }

    async fn end_connection(&self) {
        self.record("end_connection".to_string());
        self.state.lock().unwrap().ready = false;
    }

    fn is_ready(&self) -> bool {
        self.state.lock().unwrap().ready
    }

    async fn query_purchases(
        &self,
        _product_type: ProductType,
    ) -> (BillingResult, Option<Vec<Purchase>>) {
        self.record("query_purchases".to_string());
        let state = self.state.lock().unwrap();
        (state.purchases_result.clone(), state.purchases.clone())
    }

    async fn query_product_details(
        &self,
        product_ids: &[String],
        product_type: ProductType,
    ) -> (BillingResult, Vec<ProductDetails>) {
        self.record(format!("query_product_details:{}", product_ids.join(",")));
        let state = self.state.lock().unwrap();
        let details = product_ids
            .iter()
            .filter(|id| {
                state
                    .known_products
                    .as_ref()
                    .is_none_or(|known| known.contains(*id))
            })
            .map(|id| sample_details(id, product_type))
            .collect();
        (state.details_result.clone(), details)
    }

    async fn launch_billing_flow(&self, details: &ProductDetails) -> BillingResult {
        self.record(format!("launch:{}", details.product_id));
        self.state.lock().unwrap().launch_result.clone()
    }

    async fn consume(&self, purchase_token: &str) -> BillingResult {
        self.record(format!("consume:{}", purchase_token));
        self.state
            .lock()
            .unwrap()
            .consume_results
            .pop_front()
            .unwrap_or_else(BillingResult::ok)
    }

    async fn acknowledge(&self, purchase_token: &str) -> BillingResult {
        self.record(format!("acknowledge:{}", purchase_token));
        self.state.lock().unwrap().ack_result.clone()
    }
}

pub fn sample_details(product_id: &str, product_type: ProductType) -> ProductDetails {
    ProductDetails {
        product_id: product_id.to_string(),
        product_type,
        title: product_id.to_string(),
        description: String::new(),
        price_amount_micros: 1_990_000,
        price_currency_code: "USD".to_string(),
        formatted_price: "$1.99".to_string(),
    }
}

/// In-memory store whose reads or writes can be switched to fail.
#[derive(Clone, Default)]
pub struct FailingEntitlementStore {
    inner: InMemoryEntitlementStore,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl FailingEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(BillingError::Storage(format!("{} failed", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl EntitlementStore for FailingEntitlementStore {
    async fn is_bought(&self, product_id: &str) -> Result<bool> {
        self.check(&self.fail_reads, "read")?;
        self.inner.is_bought(product_id).await
    }

    async fn was_checked(&self, product_id: &str) -> Result<bool> {
        self.check(&self.fail_reads, "read")?;
        self.inner.was_checked(product_id).await
    }

    async fn set_bought(&self, product_id: &str, bought: bool) -> Result<()> {
        self.check(&self.fail_writes, "write")?;
        self.inner.set_bought(product_id, bought).await
    }

    async fn set_checked(&self, product_id: &str, checked: bool) -> Result<()> {
        self.check(&self.fail_writes, "write")?;
        self.inner.set_checked(product_id, checked).await
    }

    async fn all(&self) -> Result<Vec<Entitlement>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.all().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Bought(String),
    NotBought(Option<String>),
    Error(ResponseCode),
    Loaded(usize),
    Consumed(ResponseCode, String),
}

#[derive(Default)]
pub struct RecordingListener {
    outcomes: Mutex<Vec<Outcome>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().unwrap().clone()
    }

    fn push(&self, outcome: Outcome) {
        self.outcomes.lock().unwrap().push(outcome);
    }
}

impl PurchaseListener for RecordingListener {
    fn on_item_bought(&self, product_id: &str) {
        self.push(Outcome::Bought(product_id.to_string()));
    }

    fn on_item_not_bought(&self, product_id: Option<&str>) {
        self.push(Outcome::NotBought(product_id.map(str::to_string)));
    }

    fn on_payments_error(&self, error: &BillingError) {
        self.push(Outcome::Error(error.category()));
    }

    fn on_purchased_items_loaded(&self, purchases: &[Purchase]) {
        self.push(Outcome::Loaded(purchases.len()));
    }
}

impl ConsumeListener for RecordingListener {
    fn on_item_consumed(&self, result: ResponseCode, purchase_token: &str) {
        self.push(Outcome::Consumed(result, purchase_token.to_string()));
    }
}

pub struct Harness<S = InMemoryEntitlementStore> {
    pub adapter: PurchaseAdapter,
    pub client: MockBillingClient,
    pub store: S,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AdapterConfig::default())
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        Harness::with_store(InMemoryEntitlementStore::new(), config)
    }
}

impl<S: EntitlementStore + Clone + 'static> Harness<S> {
    pub fn with_store(store: S, config: AdapterConfig) -> Self {
        let client = MockBillingClient::new();
        let adapter =
            PurchaseAdapter::with_config(Box::new(client.clone()), Box::new(store.clone()), config);
        Self {
            adapter,
            client,
            store,
        }
    }

    /// Completes a pending connection attempt successfully.
    pub async fn connect(&mut self) {
        self.client.with(|s| s.ready = true);
        self.adapter
            .handle_event(BillingEvent::SetupFinished(BillingResult::ok()))
            .await;
    }

    pub async fn fail_setup(&mut self, code: ResponseCode) {
        self.adapter
            .handle_event(BillingEvent::SetupFinished(BillingResult::new(
                code.raw(),
                "setup failed",
            )))
            .await;
    }

    pub async fn purchases_updated(&mut self, code: ResponseCode, purchases: Option<Vec<Purchase>>) {
        self.adapter
            .handle_event(BillingEvent::PurchasesUpdated {
                result: BillingResult::from_code(code),
                purchases,
            })
            .await;
    }
}
