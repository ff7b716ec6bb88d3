//! Run reports for the furio compounder.
//!
//! An [`ActionReport`] collects every step's per-account outcomes with the
//! schedule snapshot and an optional token price. A [`Reporter`] delivers it
//! to each configured [`ReportSink`]; delivery problems are logged, never
//! propagated.

mod error;
mod price;
mod report;
mod reporter;
mod sink;

pub use error::ReportError;
pub use price::{HttpPriceLookup, PriceLookup};
pub use report::{ActionReport, report_title};
pub use reporter::Reporter;
pub use sink::{LogSink, ReportSink, WebhookSink};
