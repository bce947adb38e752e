//! CLI library components for the reporting pipeline driver.

pub mod logging;
