// Infrastructure layer
pub mod file_system;
pub mod output;
pub mod processors;
pub mod resolver;
pub mod rule_table;
pub mod walker;

pub use file_system::*;
pub use output::*;
pub use processors::*;
pub use resolver::*;
pub use rule_table::*;
pub use walker::*;
