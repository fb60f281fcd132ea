//! 在线状态领域模型：设备标识、状态码与系统记录。

pub mod device;

pub use device::{
    DeviceId, DeviceInfo, DeviceStatus, DeviceStatusRecord, DeviceStatusUpdate,
    ParseDeviceIdError,
};

/// 对账降级时写入的默认操作人。
pub const SYSTEM_ACTOR: &str = "system";
