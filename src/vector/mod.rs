pub mod similarity;

// Re-export main components
pub use similarity::*;
