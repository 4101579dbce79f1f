use crate::domain::ports::{ConsumeListener, PurchaseListener};
use crate::domain::purchase::Purchase;
use crate::domain::response::ResponseCode;
use crate::error::{BillingError, Result};
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Serialize)]
struct ReportRecord<'a> {
    event: &'a str,
    product: &'a str,
    detail: String,
}

/// Listener that writes every adapter outcome as a CSV record
/// (`event,product,detail`).
pub struct CsvEventReporter<W: Write + Send> {
    writer: Mutex<csv::Writer<W>>,
}

impl<W: Write + Send> CsvEventReporter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new().from_writer(sink);
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn flush(&self) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| {
            BillingError::InternalError(Box::new(std::io::Error::other(
                "Event reporter lock poisoned",
            )))
        })?;
        writer.flush()?;
        Ok(())
    }

    fn report(&self, event: &str, product: &str, detail: String) {
        let record = ReportRecord {
            event,
            product,
            detail,
        };
        let outcome = match self.writer.lock() {
            Ok(mut writer) => writer.serialize(&record).map_err(BillingError::from),
            Err(_) => Err(BillingError::InternalError(Box::new(std::io::Error::other(
                "Event reporter lock poisoned",
            )))),
        };
        if let Err(e) = outcome {
            warn!(error = %e, event, "Failed to write report record");
        }
    }
}

impl<W: Write + Send> PurchaseListener for CsvEventReporter<W> {
    fn on_item_bought(&self, product_id: &str) {
        self.report("bought", product_id, String::new());
    }

    fn on_item_not_bought(&self, product_id: Option<&str>) {
        self.report("not_bought", product_id.unwrap_or_default(), String::new());
    }

    fn on_payments_error(&self, error: &BillingError) {
        self.report("error", "", format!("{}|{}", error.category(), error));
    }

    fn on_purchased_items_loaded(&self, purchases: &[Purchase]) {
        for purchase in purchases {
            self.report(
                "owned",
                &purchase.product_ids.join(" "),
                purchase.purchase_token.clone(),
            );
        }
    }
}

impl<W: Write + Send> ConsumeListener for CsvEventReporter<W> {
    fn on_item_consumed(&self, result: ResponseCode, purchase_token: &str) {
        self.report("consumed", "", format!("{}|{}", result, purchase_token));
    }
}
