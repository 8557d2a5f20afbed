pub mod config;
pub mod project;
pub mod store;
pub mod task;
pub mod wire;

pub use config::*;
pub use project::*;
pub use store::*;
pub use task::*;
