use serde::{Deserialize, Serialize};

/// Suffix of the key holding the "was checked" flag of a product.
pub const WAS_CHECKED_SUFFIX: &str = "_WAS_CHECKED";

/// Cached entitlement state of a single product.
///
/// `was_checked` tells whether `is_purchased` carries a verdict at all; an
/// unchecked record always needs a round trip to the billing service.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct Entitlement {
    pub product_id: String,
    pub is_purchased: bool,
    pub was_checked: bool,
}

impl Entitlement {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            ..Default::default()
        }
    }

    /// The cached verdict, if the product was ever checked.
    pub fn verdict(&self) -> Option<bool> {
        self.was_checked.then_some(self.is_purchased)
    }
}

pub fn bought_key(product_id: &str) -> String {
    product_id.to_string()
}

pub fn checked_key(product_id: &str) -> String {
    format!("{}{}", product_id, WAS_CHECKED_SUFFIX)
}

/// Splits a flat store key into its product id and whether it is the checked flag.
///
/// The layout is ambiguous for product ids that themselves end in
/// `_WAS_CHECKED`: their bought flag reads back as the checked flag of the
/// shorter id. Point lookups through `bought_key`/`checked_key` are unaffected;
/// only `collect_entitlements` (and so `EntitlementStore::all`) misfiles them.
pub fn parse_key(key: &str) -> (&str, bool) {
    match key.strip_suffix(WAS_CHECKED_SUFFIX) {
        Some(product_id) => (product_id, true),
        None => (key, false),
    }
}

/// Folds flat `(key, flag)` pairs into records, sorted by product id.
pub fn collect_entitlements<I, K>(pairs: I) -> Vec<Entitlement>
where
    I: IntoIterator<Item = (K, bool)>,
    K: AsRef<str>,
{
    let mut records: std::collections::BTreeMap<String, Entitlement> = Default::default();
    for (key, flag) in pairs {
        let (product_id, is_checked_flag) = parse_key(key.as_ref());
        let record = records
            .entry(product_id.to_string())
            .or_insert_with(|| Entitlement::new(product_id));
        if is_checked_flag {
            record.was_checked = flag;
        } else {
            record.is_purchased = flag;
        }
    }
    records.into_values().collect()
}
