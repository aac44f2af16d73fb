//! RedTrack report client and date-range importer.
//!
//! [`RedTrackClient`] talks to the `/report` endpoint, [`ReportNormalizer`]
//! turns report rows into funnel records and [`RedTrackImporter`] commits a
//! date range through the duplicate-date guard.

pub mod client;
pub mod error;
pub mod normalize;
pub(crate) mod retry;
pub mod sync;
pub mod types;

pub use client::{RedTrackClient, RedTrackSettings, ReportQuery};
pub use error::RedTrackError;
pub use normalize::{NormalizedReport, ReportNormalizer};
pub use sync::{FetchStrategy, RedTrackImporter};
pub use types::ReportRow;
