// Processors module
pub mod common;
pub mod executor;
pub mod json_processor;
pub mod resource_processor;
pub mod script_processor;
pub mod style_processor;

pub use executor::*;
pub use json_processor::*;
pub use resource_processor::*;
pub use script_processor::*;
pub use style_processor::*;
