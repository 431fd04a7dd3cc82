//! Core library modules for butterfly-csv
//!
//! This module contains the internal implementation details of the butterfly-csv library.

pub mod error;
pub mod export;
pub mod graph;
pub mod model;
pub mod parser;
pub mod stats;
pub mod writer;
