//! # batchdoc
//!
//! Client-side core for mail-merge style document generation: upload a
//! template and a spreadsheet to a rendering backend, check that they line
//! up, preview one row, generate a document per row and fetch the archive.
//!
//! ## Usage
//!
//! ```bash
//! batchdoc generate --template receipt.docx --data students.xlsx --format pdf
//! ```
//!
//! ## Modules
//!
//! - `artifact` - Template and dataset files with type and size checks
//! - `backend` - The document backend trait, its HTTP client and a test mock
//! - `cli` - Command-line parsing and subcommands
//! - `config` - Layered configuration from files and environment
//! - `display` - Terminal rendering of reports, previews and progress
//! - `error` - Crate error type
//! - `filename` - `{{TOKEN}}` filename pattern resolution
//! - `format` - Output formats and format selection
//! - `reconcile` - Placeholder and column reconciliation
//! - `row` - Dataset rows as key/value records
//! - `workflow` - The upload, validate, generate and download state machine
pub mod artifact;
pub mod backend;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod filename;
pub mod format;
pub mod reconcile;
pub mod row;
pub mod workflow;

pub use error::{Error, Result};
