//! 硬件解码后端类型.
//!
//! 对标 FFmpeg 的 `AVHWDeviceType`. 每种后端对应一种硬件表面像素格式,
//! 解码器在格式协商时只接受该格式, 否则视为未走硬件路径.

use std::ffi::CStr;
use std::fmt;

use crate::pixel_format::PixelFormat;

/// 硬件设备类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum HwDeviceType {
    /// VA-API (Linux Intel/AMD)
    Vaapi,
    /// VDPAU (Linux NVIDIA 旧接口)
    Vdpau,
    /// DXVA2 (Windows)
    Dxva2,
    /// D3D11VA (Windows)
    D3d11va,
    /// VideoToolbox (macOS/iOS)
    VideoToolbox,
    /// CUDA/NVDEC
    Cuda,
    /// Intel Quick Sync Video
    Qsv,
    /// DRM (Linux 内核显示设备)
    Drm,
    /// OpenCL (无解码表面格式)
    OpenCl,
    /// Android MediaCodec
    MediaCodec,
    /// Vulkan Video
    Vulkan,
}

const NAMES: &[(HwDeviceType, &CStr)] = &[
    (HwDeviceType::Vaapi, c"vaapi"),
    (HwDeviceType::Vdpau, c"vdpau"),
    (HwDeviceType::Dxva2, c"dxva2"),
    (HwDeviceType::D3d11va, c"d3d11va"),
    (HwDeviceType::VideoToolbox, c"videotoolbox"),
    (HwDeviceType::Cuda, c"cuda"),
    (HwDeviceType::Qsv, c"qsv"),
    (HwDeviceType::Drm, c"drm"),
    (HwDeviceType::OpenCl, c"opencl"),
    (HwDeviceType::MediaCodec, c"mediacodec"),
    (HwDeviceType::Vulkan, c"vulkan"),
];

impl HwDeviceType {
    /// 所有已知的设备类型
    pub fn all() -> impl Iterator<Item = HwDeviceType> {
        NAMES.iter().map(|(ty, _)| *ty)
    }

    /// 按名称查找 (不区分大小写)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        NAMES
            .iter()
            .find(|(_, n)| n.to_bytes().eq_ignore_ascii_case(name.as_bytes()))
            .map(|(ty, _)| *ty)
    }

    /// 类型名称 (C 字符串形式)
    pub fn c_name(&self) -> &'static CStr {
        NAMES
            .iter()
            .find(|(ty, _)| ty == self)
            .map(|(_, n)| *n)
            .unwrap_or(c"none")
    }

    /// 类型名称
    pub fn name(&self) -> &'static str {
        self.c_name().to_str().unwrap_or("none")
    }

    /// 该后端解码输出的硬件表面格式
    ///
    /// 不在此表中的后端不能用于解码, 会在会话创建时被拒绝.
    pub const fn hw_pixel_format(&self) -> Option<PixelFormat> {
        match self {
            Self::Vaapi => Some(PixelFormat::Vaapi),
            Self::Vdpau => Some(PixelFormat::Vdpau),
            Self::Dxva2 => Some(PixelFormat::Dxva2Vld),
            Self::D3d11va => Some(PixelFormat::D3d11),
            Self::VideoToolbox => Some(PixelFormat::VideoToolbox),
            Self::Cuda => Some(PixelFormat::Cuda),
            Self::Qsv => Some(PixelFormat::Qsv),
            Self::Drm => Some(PixelFormat::DrmPrime),
            Self::MediaCodec => Some(PixelFormat::MediaCodec),
            Self::Vulkan => Some(PixelFormat::Vulkan),
            Self::OpenCl => None,
        }
    }
}

impl fmt::Display for HwDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_按名称查找() {
        assert_eq!(HwDeviceType::from_name("vaapi"), Some(HwDeviceType::Vaapi));
        assert_eq!(HwDeviceType::from_name("D3D11VA"), Some(HwDeviceType::D3d11va));
        assert_eq!(HwDeviceType::from_name("videotoolbox"), Some(HwDeviceType::VideoToolbox));
        assert_eq!(HwDeviceType::from_name("X"), None);
        assert_eq!(HwDeviceType::from_name(""), None);
    }

    #[test]
    fn test_名称往返() {
        for ty in HwDeviceType::all() {
            assert_eq!(HwDeviceType::from_name(ty.name()), Some(ty));
        }
    }

    #[test]
    fn test_硬件表面格式映射() {
        assert_eq!(HwDeviceType::Vaapi.hw_pixel_format(), Some(PixelFormat::Vaapi));
        assert_eq!(HwDeviceType::Dxva2.hw_pixel_format(), Some(PixelFormat::Dxva2Vld));
        assert_eq!(HwDeviceType::Cuda.hw_pixel_format(), Some(PixelFormat::Cuda));
        assert_eq!(HwDeviceType::OpenCl.hw_pixel_format(), None);
        for ty in HwDeviceType::all() {
            if let Some(pf) = ty.hw_pixel_format() {
                assert!(pf.is_hardware(), "{ty} -> {pf}");
            }
        }
    }
}
