//! 内存存储实现模块
//!
//! 仅用于测试和本地演示。
//!
//! 包含以下实现：
//! - BitsetStore + CellStore: InMemoryPresenceStore
//! - DeviceStatusStore: InMemoryDeviceStatusStore

pub mod device_status;
pub mod presence;

pub use device_status::*;
pub use presence::*;
