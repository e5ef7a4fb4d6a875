//! # hvd-core
//!
//! HVD 硬件视频解码库核心类型.
//!
//! 本 crate 不依赖任何被包装的编解码库, 只定义会话配置、错误与状态码,
//! 以及与 FFmpeg 命名一致的像素格式和硬件设备类型表.

pub mod config;
pub mod error;
pub mod hw_device;
pub mod pixel_format;

// 重导出常用类型
pub use config::HvdConfig;
pub use error::{HvdError, HvdResult, HvdStatus};
pub use hw_device::HwDeviceType;
pub use pixel_format::PixelFormat;
