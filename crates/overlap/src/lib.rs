//! Public facade crate for `overlap`.
//!
//! This crate intentionally contains no IO or engine logic.
//! It re-exports the backend-agnostic types/traits from `overlap-core`.

pub use overlap_core::*;
