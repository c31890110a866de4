pub mod client;
pub mod indexes;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod pipeline;
pub mod selector;
pub mod store;
pub mod types;
