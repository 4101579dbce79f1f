use crate::domain::entitlement::Entitlement;
use crate::error::Result;
use std::io::Write;

/// Writes cached entitlement records as CSV.
///
/// Columns are `product_id,is_purchased,was_checked`, one row per product.
pub struct EntitlementWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> EntitlementWriter<W> {
    /// Creates a new `EntitlementWriter` over any `Write` sink (e.g. Stdout, File).
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new().from_writer(sink);
        Self { writer }
    }

    pub fn write_entitlements<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Entitlement>,
    {
        let mut wrote_any = false;
        for record in records {
            self.writer.serialize(record)?;
            wrote_any = true;
        }
        if !wrote_any {
            self.writer
                .write_record(["product_id", "is_purchased", "was_checked"])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
