pub mod breakdown;
pub mod format;
