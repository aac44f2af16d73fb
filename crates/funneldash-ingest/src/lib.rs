//! Turning raw campaign text into canonical funnel records.
//!
//! [`extract`] holds the field extractors, [`csv_import`] the CSV record
//! parser, and [`upload`] ties parsing to the duplicate-date guard.

pub mod coerce;
pub mod csv_import;
pub mod error;
pub mod extract;
pub mod upload;

pub use csv_import::{CsvParser, ParsedCsv, RoiPolicy};
pub use error::CsvImportError;
pub use extract::{FieldExtractor, LandingFields, PositionalFields};
pub use upload::import_csv;
