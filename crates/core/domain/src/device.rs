//! 设备在线状态相关模型。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 设备标识：位图中的 bit 偏移量。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(u64);

impl DeviceId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for DeviceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 设备 ID 字符串解析失败。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid device id: {input:?}")]
pub struct ParseDeviceIdError {
    input: String,
}

impl FromStr for DeviceId {
    type Err = ParseDeviceIdError;

    /// 外部设备 ID 为十进制字符串，空白或非数字一律拒绝。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseDeviceIdError {
                input: s.to_string(),
            });
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseDeviceIdError {
                input: s.to_string(),
            })
    }
}

/// 设备在线状态。
///
/// 数值编码与系统记录表 `device_status` 字段保持一致：
/// - 0：离线
/// - 1：在线
/// - 2：未启用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Offline,
    Online,
    NotEnabled,
}

impl DeviceStatus {
    pub const fn code(self) -> i16 {
        match self {
            DeviceStatus::Offline => 0,
            DeviceStatus::Online => 1,
            DeviceStatus::NotEnabled => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(DeviceStatus::Offline),
            1 => Some(DeviceStatus::Online),
            2 => Some(DeviceStatus::NotEnabled),
            _ => None,
        }
    }

    /// 与 JSON 序列化一致的英文标识。
    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Offline => "OFFLINE",
            DeviceStatus::Online => "ONLINE",
            DeviceStatus::NotEnabled => "NOT_ENABLED",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DeviceStatus::Offline => "离线",
            DeviceStatus::Online => "在线",
            DeviceStatus::NotEnabled => "未启用",
        }
    }

    /// 由位图读取结果得到在线/离线。
    pub const fn from_presence(online: bool) -> Self {
        if online {
            DeviceStatus::Online
        } else {
            DeviceStatus::Offline
        }
    }
}

/// 系统记录中的设备状态行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatusRecord {
    pub id: DeviceId,
    pub status: DeviceStatus,
    pub last_login_time_ms: i64,
    pub offline_time_ms: Option<i64>,
    pub updated_by: Option<String>,
}

/// 批量状态更新的单个元素。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatusUpdate {
    pub id: DeviceId,
    pub status: DeviceStatus,
    pub offline_time_ms: i64,
    pub updated_by: String,
}

/// 通过 SN 解析得到的设备基本信息（可缓存）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub sn: String,
    pub status: DeviceStatus,
    pub last_login_time_ms: i64,
}

impl DeviceInfo {
    /// 作为状态记录参与“持久化状态 vs 位图状态”的判定。
    pub fn as_status_record(&self) -> DeviceStatusRecord {
        DeviceStatusRecord {
            id: self.id,
            status: self.status,
            last_login_time_ms: self.last_login_time_ms,
            offline_time_ms: None,
            updated_by: None,
        }
    }
}
