pub mod envelope;
pub mod stats;

pub use envelope::*;
pub use stats::*;
