use super::connection::{ConnectionState, PendingOperation, PendingQueue};
use crate::domain::event::BillingEvent;
use crate::domain::ports::{
    BillingClientBox, ConsumeListenerRef, EntitlementStore, EntitlementStoreBox,
    PurchaseListenerRef,
};
use crate::domain::purchase::test_products::{self, TestProduct};
use crate::domain::purchase::{ProductDetails, ProductType, Purchase};
use crate::domain::response::{BillingResult, ResponseCode};
use crate::error::{BillingError, Result};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Tunables of a `PurchaseAdapter`.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub product_type: ProductType,
    /// Product ids fetched together when metadata for one of them is needed.
    pub catalog: Vec<String>,
    /// Maximum number of operations waiting for the connection.
    pub max_pending: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            product_type: ProductType::InApp,
            catalog: Vec::new(),
            max_pending: 8,
        }
    }
}

struct InFlightPurchase {
    product_id: String,
    listener: PurchaseListenerRef,
    launched: bool,
}

/// Facade over the vendor billing client.
///
/// `PurchaseAdapter` connects lazily, defers requests until the connection is
/// up, answers entitlement checks from the local cache when it can, and
/// matches purchase updates against the purchase flow it launched.
///
/// Outcomes are only ever delivered through listeners. Vendor callbacks must
/// be fed back through [`PurchaseAdapter::handle_event`].
pub struct PurchaseAdapter {
    client: BillingClientBox,
    store: EntitlementStoreBox,
    config: AdapterConfig,
    state: ConnectionState,
    pending: PendingQueue,
    in_flight: Option<InFlightPurchase>,
    details: HashMap<String, ProductDetails>,
}

impl PurchaseAdapter {
    /// Creates an adapter with the default configuration.
    ///
    /// # Arguments
    ///
    /// * `client` - The vendor billing client.
    /// * `store` - The local entitlement cache.
    pub fn new(client: BillingClientBox, store: EntitlementStoreBox) -> Self {
        Self::with_config(client, store, AdapterConfig::default())
    }

    pub fn with_config(
        client: BillingClientBox,
        store: EntitlementStoreBox,
        config: AdapterConfig,
    ) -> Self {
        let pending = PendingQueue::new(config.max_pending.max(1));
        Self {
            client,
            store,
            config,
            state: ConnectionState::Disconnected,
            pending,
            in_flight: None,
            details: HashMap::new(),
        }
    }

    /// Uses the vendor's static test products as the metadata catalog.
    pub fn with_test_catalog(mut self) -> Self {
        self.config.catalog = test_products::ALL.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn store(&self) -> &dyn EntitlementStore {
        self.store.as_ref()
    }

    /// True once nothing is waiting on the billing service.
    pub fn is_idle(&self) -> bool {
        self.state != ConnectionState::Connecting
            && self.pending.is_empty()
            && self.in_flight.is_none()
    }

    /// Fetches pricing metadata for `product_id` and launches the purchase flow.
    ///
    /// Only one purchase may be outstanding; a second one is rejected with
    /// `BillingError::PurchaseInProgress`.
    pub async fn initiate_purchase(&mut self, product_id: &str, listener: PurchaseListenerRef) {
        if let Some(current) = &self.in_flight {
            listener.on_payments_error(&BillingError::PurchaseInProgress(
                current.product_id.clone(),
            ));
            return;
        }
        self.in_flight = Some(InFlightPurchase {
            product_id: product_id.to_string(),
            listener: listener.clone(),
            launched: false,
        });
        self.submit(PendingOperation::Purchase {
            product_id: product_id.to_string(),
            listener,
        })
        .await;
    }

    /// Reports whether `product_id` is owned, from the cache when it was checked before.
    pub async fn is_item_purchased(&mut self, product_id: &str, listener: PurchaseListenerRef) {
        match self.store.get(product_id).await {
            Ok(record) => {
                if let Some(bought) = record.verdict() {
                    debug!(product_id, bought, "Entitlement served from cache");
                    if bought {
                        listener.on_item_bought(product_id);
                    } else {
                        listener.on_item_not_bought(Some(product_id));
                    }
                    return;
                }
            }
            Err(e) => {
                listener.on_payments_error(&e);
                return;
            }
        }
        self.submit(PendingOperation::Query {
            product_id: product_id.to_string(),
            listener,
        })
        .await;
    }

    /// Consumes the purchase identified by `purchase_token`.
    pub async fn consume(&mut self, purchase_token: &str, listener: ConsumeListenerRef) {
        self.submit(PendingOperation::Consume {
            purchase_token: purchase_token.to_string(),
            listener,
            retried: false,
        })
        .await;
    }

    pub async fn initiate_test_purchase(
        &mut self,
        product: TestProduct,
        listener: PurchaseListenerRef,
    ) {
        self.initiate_purchase(product.product_id(), listener).await;
    }

    pub async fn consume_test_purchase(
        &mut self,
        package_name: &str,
        product: TestProduct,
        listener: ConsumeListenerRef,
    ) {
        let token = test_products::consume_token(package_name, product.product_id());
        self.consume(&token, listener).await;
    }

    /// Releases the billing connection and fails everything still waiting on it.
    ///
    /// Safe to call repeatedly. A later request reconnects.
    pub async fn shutdown(&mut self) {
        if self.state != ConnectionState::Disconnected || self.client.is_ready() {
            info!("Closing billing service connection");
            self.client.end_connection().await;
        }
        self.state = ConnectionState::Disconnected;
        self.abandon(&BillingError::response(
            ResponseCode::ServiceDisconnected,
            "billing adapter shut down",
        ));
    }

    /// Applies a vendor callback to the adapter state.
    pub async fn handle_event(&mut self, event: BillingEvent) {
        match event {
            BillingEvent::SetupFinished(result) => self.on_setup_finished(result).await,
            BillingEvent::ServiceDisconnected => {
                warn!("Billing service disconnected");
                self.state = ConnectionState::Disconnected;
                self.abandon(&BillingError::response(
                    ResponseCode::ServiceDisconnected,
                    "billing service disconnected",
                ));
            }
            BillingEvent::PurchasesUpdated { result, purchases } => {
                self.on_purchases_updated(result, purchases).await
            }
        }
    }

    async fn submit(&mut self, op: PendingOperation) {
        if self.state == ConnectionState::Connected {
            if self.client.is_ready() {
                self.execute(op).await;
                return;
            }
            warn!("Billing client is no longer ready, reconnecting");
            self.state = ConnectionState::Disconnected;
        }
        debug!(operation = op.kind(), "Deferring until billing service connects");
        self.enqueue(op);
        if self.state == ConnectionState::Disconnected {
            self.connect().await;
        }
    }

    fn enqueue(&mut self, op: PendingOperation) {
        if let Err(op) = self.pending.push(op) {
            let error = BillingError::QueueFull(self.pending.len());
            self.fail_operation(op, &error);
        }
    }

    async fn connect(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        info!("Connecting to billing service");
        self.state = ConnectionState::Connecting;
        if let Err(e) = self.client.start_connection().await {
            warn!(error = %e, "Billing connection could not be started");
            self.state = ConnectionState::Disconnected;
            self.fail_pending(&e);
        }
    }

    async fn on_setup_finished(&mut self, result: BillingResult) {
        if self.state != ConnectionState::Connecting {
            debug!(state = ?self.state, "Ignoring stale setup result");
            return;
        }
        if !result.is_ok() {
            let error = response_error(result);
            warn!(%error, "Billing service connection failed");
            self.state = ConnectionState::Disconnected;
            self.fail_pending(&error);
            return;
        }

        info!(pending = self.pending.len(), "Billing service connected");
        self.state = ConnectionState::Connected;
        while self.state == ConnectionState::Connected {
            let Some(op) = self.pending.pop() else {
                break;
            };
            debug!(operation = op.kind(), "Running deferred operation");
            self.execute(op).await;
        }
    }

    async fn execute(&mut self, op: PendingOperation) {
        match op {
            PendingOperation::Purchase {
                product_id,
                listener,
            } => self.launch_purchase(product_id, listener).await,
            PendingOperation::Query {
                product_id,
                listener,
            } => self.query_entitlement(product_id, listener).await,
            PendingOperation::Consume {
                purchase_token,
                listener,
                retried,
            } => self.consume_now(purchase_token, listener, retried).await,
        }
    }

    async fn launch_purchase(&mut self, product_id: String, listener: PurchaseListenerRef) {
        let details = match self.product_details(&product_id).await {
            Ok(details) => details,
            Err(e) => {
                self.in_flight = None;
                listener.on_payments_error(&e);
                return;
            }
        };

        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.launched = true;
        }
        let result = self.client.launch_billing_flow(&details).await;
        if !result.is_ok() {
            self.in_flight = None;
            listener.on_payments_error(&response_error(result));
        }
    }

    async fn product_details(&mut self, product_id: &str) -> Result<ProductDetails> {
        if let Some(details) = self.details.get(product_id) {
            return Ok(details.clone());
        }

        let ids = if self.config.catalog.iter().any(|id| id == product_id) {
            self.config.catalog.clone()
        } else {
            vec![product_id.to_string()]
        };
        let (result, details) = self
            .client
            .query_product_details(&ids, self.config.product_type)
            .await;
        if !result.is_ok() {
            return Err(response_error(result));
        }
        for item in details {
            self.details.insert(item.product_id.clone(), item);
        }
        self.details
            .get(product_id)
            .cloned()
            .ok_or_else(|| BillingError::ProductNotFound(product_id.to_string()))
    }

    async fn query_entitlement(&mut self, product_id: String, listener: PurchaseListenerRef) {
        let (result, purchases) = self.client.query_purchases(self.config.product_type).await;
        if !result.is_ok() {
            listener.on_payments_error(&response_error(result));
            return;
        }

        // A missing list means nothing is owned.
        let purchases = purchases.unwrap_or_default();
        listener.on_purchased_items_loaded(&purchases);

        let mut found = false;
        let mut awaiting_payment = false;
        for purchase in purchases.iter().filter(|p| p.contains(&product_id)) {
            if !purchase.is_purchased() {
                awaiting_payment = true;
                continue;
            }
            found = true;
            if let Err(e) = self.store.record(&product_id, true).await {
                listener.on_payments_error(&e);
            }
            listener.on_item_bought(&product_id);
            self.acknowledge(purchase).await;
        }
        if found {
            return;
        }

        // A purchase still awaiting payment may clear later; keep it unchecked.
        if awaiting_payment {
            debug!(product_id, "Purchase awaiting payment, verdict not cached");
        } else if let Err(e) = self.store.record(&product_id, false).await {
            listener.on_payments_error(&e);
        }
        listener.on_item_not_bought(Some(&product_id));
    }

    async fn consume_now(
        &mut self,
        purchase_token: String,
        listener: ConsumeListenerRef,
        retried: bool,
    ) {
        let result = self.client.consume(&purchase_token).await;
        let code = result.code();
        if code == ResponseCode::ServiceDisconnected && !retried {
            warn!("Service disconnected while consuming, retrying after reconnect");
            self.state = ConnectionState::Disconnected;
            self.enqueue(PendingOperation::Consume {
                purchase_token,
                listener,
                retried: true,
            });
            self.connect().await;
            return;
        }
        debug!(%code, "Consume finished");
        listener.on_item_consumed(code, &purchase_token);
    }

    async fn on_purchases_updated(
        &mut self,
        result: BillingResult,
        purchases: Option<Vec<Purchase>>,
    ) {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.launched => in_flight,
            other => {
                self.in_flight = other;
                self.record_unsolicited(result, purchases).await;
                return;
            }
        };
        let InFlightPurchase {
            product_id,
            listener,
            ..
        } = in_flight;

        match result.code() {
            ResponseCode::Ok => {}
            ResponseCode::ItemAlreadyOwned => {
                if let Err(e) = self.store.record(&product_id, true).await {
                    listener.on_payments_error(&e);
                }
                listener.on_item_bought(&product_id);
                return;
            }
            _ => {
                listener.on_payments_error(&response_error(result));
                return;
            }
        }

        let Some(purchases) = purchases else {
            listener.on_item_not_bought(Some(&product_id));
            return;
        };
        listener.on_purchased_items_loaded(&purchases);

        let mut bought = false;
        for purchase in purchases.iter().filter(|p| p.is_purchased()) {
            bought |= purchase.contains(&product_id);
            if let Err(e) = self.record_owned(purchase).await {
                listener.on_payments_error(&e);
            }
            self.acknowledge(purchase).await;
        }

        if bought {
            listener.on_item_bought(&product_id);
        } else {
            listener.on_item_not_bought(Some(&product_id));
        }
    }

    /// Purchases that completed outside a flow we launched, e.g. a pending
    /// payment that cleared later. Cached and acknowledged, never reported.
    async fn record_unsolicited(
        &mut self,
        result: BillingResult,
        purchases: Option<Vec<Purchase>>,
    ) {
        let Some(purchases) = purchases.filter(|_| result.is_ok()) else {
            debug!(code = %result.code(), "Ignoring purchase update without purchases");
            return;
        };
        for purchase in purchases.iter().filter(|p| p.is_purchased()) {
            info!(products = ?purchase.product_ids, "Recording unsolicited purchase");
            if let Err(e) = self.record_owned(purchase).await {
                warn!(error = %e, "Failed to cache unsolicited purchase");
            }
            self.acknowledge(purchase).await;
        }
    }

    async fn record_owned(&self, purchase: &Purchase) -> Result<()> {
        for product_id in &purchase.product_ids {
            self.store.record(product_id, true).await?;
        }
        Ok(())
    }

    /// Acknowledges `purchase` if it still needs it. The outcome is only logged.
    async fn acknowledge(&self, purchase: &Purchase) {
        if !purchase.needs_acknowledgement() {
            return;
        }
        let result = self.client.acknowledge(&purchase.purchase_token).await;
        if result.is_ok() {
            debug!(products = ?purchase.product_ids, "Purchase acknowledged");
        } else {
            warn!(
                code = %result.code(),
                message = %result.debug_message,
                "Purchase acknowledgement failed"
            );
        }
    }

    /// Fails queued operations and the outstanding purchase with `error`.
    fn abandon(&mut self, error: &BillingError) {
        self.fail_pending(error);
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.listener.on_payments_error(error);
        }
    }

    fn fail_pending(&mut self, error: &BillingError) {
        let ops: Vec<PendingOperation> = self.pending.drain().collect();
        for op in ops {
            self.fail_operation(op, error);
        }
    }

    fn fail_operation(&mut self, op: PendingOperation, error: &BillingError) {
        if let PendingOperation::Purchase { product_id, .. } = &op
            && self
                .in_flight
                .as_ref()
                .is_some_and(|p| &p.product_id == product_id && !p.launched)
        {
            self.in_flight = None;
        }
        debug!(operation = op.kind(), %error, "Failing operation");
        op.fail(error);
    }
}

fn response_error(result: BillingResult) -> BillingError {
    BillingError::response(result.code(), result.debug_message)
}
