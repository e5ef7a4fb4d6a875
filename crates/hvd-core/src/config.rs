//! 解码器配置.
//!
//! 会话创建时提供一次, 之后不再修改.

use serde::{Deserialize, Serialize};

/// 解码器配置
///
/// 硬件后端可以是 vaapi / vdpau / dxva2 / d3d11va / videotoolbox / cuda 等,
/// 编解码器应被硬件支持 (h264 / hevc / vp8 / vp9 ...).
///
/// 宽高与 profile 只是提示: 有的解码器需要它们, 有的忽略它们,
/// 也可能在解析码流后改写. 0 表示未指定.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HvdConfig {
    /// 硬件后端名称, 如 "vaapi"
    pub hardware: String,
    /// 解码器名称, 如 "h264"
    pub codec: String,
    /// 设备路径, 如 "/dev/dri/renderD128", 空表示自动选择
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// 期望输出的软件像素格式, 如 "nv12" / "rgb0", 空表示使用库默认格式
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_format: Option<String>,
    /// 宽度提示
    pub width: u32,
    /// 高度提示
    pub height: u32,
    /// profile 提示
    pub profile: i32,
}

impl HvdConfig {
    /// 使用硬件后端与解码器名称创建配置
    pub fn new(hardware: impl Into<String>, codec: impl Into<String>) -> Self {
        Self {
            hardware: hardware.into(),
            codec: codec.into(),
            ..Self::default()
        }
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_pixel_format(mut self, pixel_format: impl Into<String>) -> Self {
        self.pixel_format = Some(pixel_format.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_profile(mut self, profile: i32) -> Self {
        self.profile = profile;
        self
    }

    /// 设备路径, 空字符串视为未指定
    pub fn device_path(&self) -> Option<&str> {
        non_empty(self.device.as_deref())
    }

    /// 期望的软件像素格式名称, 空字符串视为未指定
    pub fn pixel_format_name(&self) -> Option<&str> {
        non_empty(self.pixel_format.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
