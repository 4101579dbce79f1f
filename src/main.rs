use billing_bridge::application::adapter::{AdapterConfig, PurchaseAdapter};
use billing_bridge::domain::event::{EventReceiver, event_channel};
use billing_bridge::domain::ports::{EntitlementStore, EntitlementStoreBox};
use billing_bridge::domain::purchase::test_products::TestProduct;
use billing_bridge::domain::response::ResponseCode;
use billing_bridge::infrastructure::in_memory::InMemoryEntitlementStore;
use billing_bridge::infrastructure::sandbox::SandboxBillingClient;
use billing_bridge::interfaces::csv::entitlement_writer::EntitlementWriter;
use billing_bridge::interfaces::csv::event_reporter::CsvEventReporter;
use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent entitlement cache (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Application package name, used to build sandbox purchase tokens
    #[arg(long, default_value = "com.example.app")]
    package: String,

    /// Product ids whose metadata is fetched together
    #[arg(long, value_delimiter = ',')]
    catalog: Vec<String>,

    /// Products the sandbox account already owns
    #[arg(long)]
    owned: Vec<String>,

    /// Raw response code the sandbox answers connection attempts with
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    setup_response: i32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a product is owned
    Check { product_id: String },
    /// Run the purchase flow for a product
    Purchase { product_id: String },
    /// Consume a purchase token
    Consume { token: String },
    /// Consume the token of one of the static test products
    TestConsume { product: TestProductArg },
    /// Dump the entitlement cache
    Cache,
}

#[derive(Clone, Copy, ValueEnum)]
enum TestProductArg {
    Purchased,
    Canceled,
    ItemUnavailable,
}

impl From<TestProductArg> for TestProduct {
    fn from(arg: TestProductArg) -> Self {
        match arg {
            TestProductArg::Purchased => TestProduct::Purchased,
            TestProductArg::Canceled => TestProduct::Canceled,
            TestProductArg::ItemUnavailable => TestProduct::ItemUnavailable,
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<EntitlementStoreBox> {
    use billing_bridge::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => Ok(Box::new(RocksDBStore::open(path).into_diagnostic()?)),
        None => Ok(Box::new(InMemoryEntitlementStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<EntitlementStoreBox> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryEntitlementStore::new()))
}

/// Feeds vendor events to the adapter until nothing is waiting on them.
async fn pump(adapter: &mut PurchaseAdapter, events: &mut EventReceiver) {
    while !adapter.is_idle() {
        match events.recv().await {
            Some(event) => adapter.handle_event(event).await,
            None => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    let store = open_store(cli.db_path)?;

    let (tx, mut events) = event_channel();
    let client = SandboxBillingClient::new(cli.package.clone(), tx)
        .with_setup_result(ResponseCode::from_raw(cli.setup_response));
    for product_id in &cli.owned {
        client.grant(product_id).await;
    }

    let config = AdapterConfig {
        catalog: cli.catalog,
        ..AdapterConfig::default()
    };
    let mut adapter = PurchaseAdapter::with_config(Box::new(client), store, config);
    let reporter = Arc::new(CsvEventReporter::new(io::stdout()));

    match cli.command {
        Command::Check { product_id } => {
            adapter.is_item_purchased(&product_id, reporter.clone()).await;
        }
        Command::Purchase { product_id } => {
            adapter.initiate_purchase(&product_id, reporter.clone()).await;
        }
        Command::Consume { token } => {
            adapter.consume(&token, reporter.clone()).await;
        }
        Command::TestConsume { product } => {
            adapter
                .consume_test_purchase(&cli.package, product.into(), reporter.clone())
                .await;
        }
        Command::Cache => {
            let records = adapter.store().all().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = EntitlementWriter::new(stdout.lock());
            writer.write_entitlements(records).into_diagnostic()?;
        }
    }

    pump(&mut adapter, &mut events).await;
    adapter.shutdown().await;
    reporter.flush().into_diagnostic()?;

    Ok(())
}
