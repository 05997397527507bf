//! Headless simulation driver.

mod headless;
mod stats;

pub use headless::{DriverConfig, HeadlessDriver};
pub use stats::DriverStats;
