//! Android Emulator Bridge
//!
//! Discovers attached devices and emulators and issues adb commands
//! against them.

pub mod adb;
pub mod device;

pub use adb::{filter_online, parse_device_list, AdbClient, AdbError, AdbExecutor, DeviceSource, ProcessExecutor};
pub use device::{ApiLevel, Device, DeviceKind};
