//! Handlers 模块

pub mod devices;
pub mod system;

pub use devices::*;
pub use system::*;
