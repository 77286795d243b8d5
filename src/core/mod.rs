//! Core Module - Business Logic
//!
//! Transfer analysis, report rendering, search history and the
//! explorer service that ties them to the providers.

pub mod analyzer;
pub mod example;
pub mod explorer;
pub mod history;
pub mod report;

pub use analyzer::*;
pub use explorer::*;
pub use history::*;
pub use report::*;
