use crate::domain::entitlement::{Entitlement, bought_key, checked_key, collect_entitlements};
use crate::domain::ports::EntitlementStore;
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteOptions};
use std::path::Path;
use std::sync::Arc;

/// Column Family acting as the private namespace of the entitlement flags.
pub const CF_BILLING_PREFERENCES: &str = "billing_preferences";

/// A persistent entitlement cache backed by RocksDB.
///
/// Every write is synced before returning, so a flag that was set survives a
/// crash right after the call. Values are JSON booleans.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the `billing_preferences` column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_BILLING_PREFERENCES, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_BILLING_PREFERENCES).ok_or_else(|| {
            BillingError::InternalError(Box::new(std::io::Error::other(
                "Billing preferences column family not found",
            )))
        })
    }

    fn flag(&self, key: &str) -> Result<bool> {
        let cf = self.cf()?;
        match self.db.get_pinned_cf(&cf, key.as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(false),
        }
    }

    fn put(&self, key: &str, value: bool) -> Result<()> {
        let cf = self.cf()?;
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.db
            .put_cf_opt(&cf, key.as_bytes(), serde_json::to_vec(&value)?, &write_opts)?;
        Ok(())
    }
}

#[async_trait]
impl EntitlementStore for RocksDBStore {
    async fn is_bought(&self, product_id: &str) -> Result<bool> {
        self.flag(&bought_key(product_id))
    }

    async fn was_checked(&self, product_id: &str) -> Result<bool> {
        self.flag(&checked_key(product_id))
    }

    async fn set_bought(&self, product_id: &str, bought: bool) -> Result<()> {
        self.put(&bought_key(product_id), bought)
    }

    async fn set_checked(&self, product_id: &str, checked: bool) -> Result<()> {
        self.put(&checked_key(product_id), checked)
    }

    async fn all(&self) -> Result<Vec<Entitlement>> {
        let cf = self.cf()?;
        let mut pairs = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, value) = item?;
            let key = String::from_utf8(key.to_vec()).map_err(|e| {
                BillingError::Storage(format!("Non UTF-8 key in billing preferences: {}", e))
            })?;
            let flag: bool = serde_json::from_slice(&value)?;
            pairs.push((key, flag));
        }
        Ok(collect_entitlements(pairs))
    }
}
