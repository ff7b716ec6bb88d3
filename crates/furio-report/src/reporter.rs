use tracing::{info, warn};

use crate::{ActionReport, PriceLookup, ReportSink};

/// Fills in the price and explorer links, and hands a report to every sink.
#[derive(Default)]
pub struct Reporter {
    sinks: Vec<Box<dyn ReportSink>>,
    price: Option<Box<dyn PriceLookup>>,
    explorer_url: Option<String>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn with_price_lookup(mut self, lookup: impl PriceLookup + 'static) -> Self {
        self.price = Some(Box::new(lookup));
        self
    }

    /// Link successful writes to `explorer_url`/<hash>.
    pub fn with_explorer_url(mut self, explorer_url: impl Into<String>) -> Self {
        self.explorer_url = Some(explorer_url.into());
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver `report` and return it with the price and links filled in.
    ///
    /// Price and delivery failures are logged and otherwise ignored.
    #[tracing::instrument(skip_all, fields(run_id = %report.run_id))]
    pub async fn publish(&self, mut report: ActionReport) -> ActionReport {
        if let Some(explorer_url) = &self.explorer_url {
            report.link_transactions(explorer_url);
        }

        if let Some(lookup) = &self.price {
            match lookup.fetch_price().await {
                Ok(price) => report.price = Some(price),
                Err(e) => warn!(error = %e, "price lookup failed, reporting without price"),
            }
        }

        let mut delivered = 0;
        for sink in &self.sinks {
            match sink.send(&report).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(sink = sink.name(), error = %e, "report delivery failed"),
            }
        }
        info!(
            delivered,
            sinks = self.sinks.len(),
            failures = report.failure_count(),
            "report published"
        );
        report
    }
}
