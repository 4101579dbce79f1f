use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    #[default]
    InApp,
    Subs,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseState {
    #[default]
    Unspecified,
    Purchased,
    Pending,
}

/// A purchase owned by the current account, as reported by the vendor.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Purchase {
    pub order_id: Option<String>,
    pub product_ids: Vec<String>,
    pub purchase_token: String,
    pub state: PurchaseState,
    pub acknowledged: bool,
}

impl Purchase {
    pub fn new(product_id: impl Into<String>, purchase_token: impl Into<String>) -> Self {
        Self {
            order_id: None,
            product_ids: vec![product_id.into()],
            purchase_token: purchase_token.into(),
            state: PurchaseState::Purchased,
            acknowledged: false,
        }
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.product_ids.iter().any(|id| id == product_id)
    }

    pub fn is_purchased(&self) -> bool {
        self.state == PurchaseState::Purchased
    }

    /// Completed but not yet acknowledged; the vendor refunds these if left alone.
    pub fn needs_acknowledgement(&self) -> bool {
        self.is_purchased() && !self.acknowledged
    }
}

/// Pricing metadata for a product.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ProductDetails {
    pub product_id: String,
    pub product_type: ProductType,
    pub title: String,
    pub description: String,
    pub price_amount_micros: i64,
    pub price_currency_code: String,
    pub formatted_price: String,
}

impl ProductDetails {
    pub fn price(&self) -> Decimal {
        Decimal::new(self.price_amount_micros, 6).normalize()
    }
}

/// Product ids the vendor answers with static responses, for wiring checks
/// without real charges.
pub mod test_products {
    pub const PURCHASED: &str = "android.test.purchased";
    pub const CANCELED: &str = "android.test.canceled";
    pub const ITEM_UNAVAILABLE: &str = "android.test.item_unavailable";

    pub const ALL: [&str; 3] = [PURCHASED, ITEM_UNAVAILABLE, CANCELED];

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TestProduct {
        Purchased,
        Canceled,
        ItemUnavailable,
    }

    impl TestProduct {
        pub fn product_id(self) -> &'static str {
            match self {
                Self::Purchased => PURCHASED,
                Self::Canceled => CANCELED,
                Self::ItemUnavailable => ITEM_UNAVAILABLE,
            }
        }
    }

    /// Token the vendor issues for a static test purchase.
    pub fn consume_token(package_name: &str, product_id: &str) -> String {
        format!("inapp:{}:{}", package_name, product_id)
    }
}
