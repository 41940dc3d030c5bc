//! Device Types
//!
//! Represents attached Android devices (physical and emulated).

use std::fmt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Ids the SDK emulator registers itself under (`emulator-<console port>`)
static SDK_EMULATOR_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^emulator-\d{1,5}$").expect("emulator id pattern should compile"));

/// Device kind, derived purely from the device id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Emulator started and managed by the Android SDK
    SdkEmulator,
    /// Physical device or third-party emulator
    Other,
}

impl DeviceKind {
    /// Classify a device id
    pub fn classify(id: &str) -> Self {
        if SDK_EMULATOR_ID.is_match(id) {
            DeviceKind::SdkEmulator
        } else {
            DeviceKind::Other
        }
    }
}

/// One line of `adb devices` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device serial as reported by adb
    pub id: String,
    /// Status column was exactly `device`
    pub is_online: bool,
    /// Emulator or other
    pub kind: DeviceKind,
}

impl Device {
    pub fn new(id: impl Into<String>, is_online: bool) -> Self {
        let id = id.into();
        let kind = DeviceKind::classify(&id);
        Self { id, is_online, kind }
    }

    /// Check if this is an SDK emulator
    pub fn is_emulator(&self) -> bool {
        self.kind == DeviceKind::SdkEmulator
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_emulator() { "emulator" } else { "device" };
        let status = if self.is_online { "online" } else { "offline" };
        write!(f, "{} ({}, {})", self.id, kind, status)
    }
}

/// Android API level reported by `ro.build.version.sdk`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiLevel(pub u32);

impl ApiLevel {
    pub const GINGERBREAD_MR1: ApiLevel = ApiLevel(10);
    pub const ICE_CREAM_SANDWICH_MR1: ApiLevel = ApiLevel(15);
    pub const JELLY_BEAN: ApiLevel = ApiLevel(16);
    pub const JELLY_BEAN_MR1: ApiLevel = ApiLevel(17);
    pub const JELLY_BEAN_MR2: ApiLevel = ApiLevel(18);
    pub const KITKAT: ApiLevel = ApiLevel(19);
    pub const LOLLIPOP: ApiLevel = ApiLevel(21);
    pub const LOLLIPOP_MR1: ApiLevel = ApiLevel(22);
    pub const MARSHMALLOW: ApiLevel = ApiLevel(23);

    /// `adb reverse` needs Lollipop or newer
    pub fn supports_reverse(self) -> bool {
        self >= ApiLevel::LOLLIPOP
    }
}

impl fmt::Display for ApiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API {}", self.0)
    }
}
