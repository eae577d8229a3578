//! Runtime adapters for driving periodic generation.

#[cfg(feature = "tokio-runtime")]
pub mod tick_driver;

#[cfg(feature = "tokio-runtime")]
pub use tick_driver::run_periodic;
