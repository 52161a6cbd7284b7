//! Concurrent batch extraction.
//!
//! [`BatchPipeline`] turns a sequence of paths into a stream of
//! [`ExtractionResult`]s. At most `max_parallelism` extractions run at once;
//! results are delivered in completion order, **not** input order. Callers
//! that need input order (or any deterministic order) must buffer and sort
//! downstream, e.g. with [`ReportBuilder`](crate::output::ReportBuilder).

pub mod batch;
pub mod options;
pub mod result;
pub mod sink;

pub use batch::{BatchPipeline, ResultStream};
pub use options::{ErrorPolicy, ExtractionOptions};
pub use result::ExtractionResult;
pub use sink::{ChannelErrorSink, ErrorEvent, ErrorSink, NullErrorSink, TracingErrorSink};
