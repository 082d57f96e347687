pub mod executor;
pub mod processor;
pub mod summary;
pub mod types;

pub use executor::*;
pub use processor::*;
pub use summary::*;
pub use types::*;
