//! Local implementations for `overlap`: document stores (search service and
//! dump files) and the analysis engine that runs on top of them.

pub mod compare;
pub mod dump;
pub mod engine;
pub mod extract;
pub mod features;
pub mod index;
pub mod links;
pub mod loader;
pub mod pages;
pub mod render;
pub mod rollup;
pub mod run;
pub mod textprep;
pub mod typesense;

pub use dump::FileStore;
pub use engine::ScoredPair;
pub use render::{Format, Report, ReportKind};
pub use rollup::PageOverlap;
pub use run::{fragment_overlap, page_overlap, Sources};
pub use typesense::TypesenseStore;
