//! Feeder transfer advisory: align forecasts, allocate transfers, classify
//! risk and rank partners.

pub mod aligner;
pub mod allocator;
pub mod engine;
pub mod ranker;
pub mod report;
pub mod risk;
pub mod session;

pub use aligner::*;
pub use allocator::*;
pub use engine::*;
pub use ranker::*;
pub use report::*;
pub use risk::*;
pub use session::*;
