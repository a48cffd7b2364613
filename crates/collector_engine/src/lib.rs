//! Collector engine: fetch pipeline, run orchestration and persistence.
mod export;
mod fetch;
mod run;
mod source;
mod store;

pub use export::{ensure_output_dir, export_dir, read_jsonlines, ExportError, SinkExporter};
pub use fetch::{FetchDescriptor, FetchError, FetchSettings, Fetcher, HttpMethod, ReqwestFetcher};
pub use run::{execute_run, Harvest, RunError, RunReport, Runner, SinkReport};
pub use source::{ParseError, ParsedItem, RequestVariant, SourceProtocol};
pub use store::{IncrementalStore, StoreError};
