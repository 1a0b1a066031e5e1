//! View report processing pipeline
//!
//! Vendor exports go through three stages: the table extractor isolates the
//! data table inside each raw sheet, the reconciler attaches `HOUSE_NUMBER`
//! identifiers from the reference map, and the populator fills a fresh copy
//! of the report template per table. The orchestrator in [`pipeline`] wires
//! the stages together and packs the results into a zip archive.

pub mod archive;
pub mod config;
pub mod excel;
pub mod extract;
pub mod month;
pub mod pipeline;
pub mod populate;
pub mod reconcile;
pub mod table;
pub mod vendors;

pub use config::Config;
pub use month::ReportMonth;
pub use pipeline::{InputFile, PipelineInput, RunOutput, RunSummary, run_pipeline};
pub use table::{CellValue, Table};
