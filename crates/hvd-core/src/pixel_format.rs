//! 像素格式定义.
//!
//! 对标 FFmpeg 的 `AVPixelFormat`. 包含两类格式:
//! - 软件格式: 系统内存中的平面/打包像素数据 (NV12, YUV420P, RGB0 ...)
//! - 硬件表面格式: 仅作为句柄存在于 GPU 显存中的帧 (VAAPI, CUDA ...)
//!
//! 格式名称与被包装的编解码库保持一致, 按名称查找时不区分大小写.
//! 表中没有的格式由后端以 [`PixelFormat::Other`] 携带库内部的格式编号,
//! 其名称与平面布局也由后端提供.

use std::ffi::CStr;
use std::fmt;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定 (由被包装库自行选择)
    None,

    // ========================
    // YUV 平面格式 (Planar)
    // ========================
    /// YUV 4:2:0 平面格式, 8 位
    Yuv420p,
    /// YUV 4:2:2 平面格式, 8 位
    Yuv422p,
    /// YUV 4:4:4 平面格式, 8 位
    Yuv444p,
    /// YUV 4:2:0 平面格式, 10 位小端
    Yuv420p10le,
    /// YUV 4:2:2 平面格式, 10 位小端
    Yuv422p10le,
    /// YUV 4:4:4 平面格式, 10 位小端
    Yuv444p10le,

    // ========================
    // YUV 半平面格式 (硬件下载最常见)
    // ========================
    /// NV12: Y 平面 + UV 交错, 4:2:0, 8 位
    Nv12,
    /// NV21: Y 平面 + VU 交错, 4:2:0, 8 位
    Nv21,
    /// NV16: Y 平面 + UV 交错, 4:2:2, 8 位
    Nv16,
    /// P010: NV12 的 10 位版本, 每分量 16 位存储
    P010le,
    /// P016: NV12 的 16 位版本
    P016le,

    // ========================
    // YUV 打包格式
    // ========================
    /// Y0 U Y1 V, 4:2:2
    Yuyv422,
    /// U Y0 V Y1, 4:2:2
    Uyvy422,

    // ========================
    // RGB 打包格式
    // ========================
    /// RGB 各 8 位
    Rgb24,
    /// BGR 各 8 位
    Bgr24,
    /// RGBA 各 8 位
    Rgba,
    /// BGRA 各 8 位
    Bgra,
    /// RGB + 填充字节
    Rgb0,
    /// BGR + 填充字节
    Bgr0,
    /// 2 位填充 + RGB 各 10 位, 小端
    X2rgb10le,

    /// 灰度 8 位
    Gray8,

    // ========================
    // 硬件表面格式
    // ========================
    /// VA-API 表面
    Vaapi,
    /// VDPAU 表面
    Vdpau,
    /// DXVA2 表面
    Dxva2Vld,
    /// D3D11 纹理
    D3d11,
    /// VideoToolbox CVPixelBuffer
    VideoToolbox,
    /// CUDA 显存
    Cuda,
    /// Intel QSV 表面
    Qsv,
    /// DRM PRIME 帧
    DrmPrime,
    /// Vulkan 图像
    Vulkan,
    /// Android MediaCodec 缓冲
    MediaCodec,

    /// 表中没有的格式, 值为被包装库内部的格式编号
    Other(i32),
}

/// 格式名称表, 名称与 FFmpeg `av_get_pix_fmt_name()` 一致
const NAMES: &[(PixelFormat, &CStr)] = &[
    (PixelFormat::None, c"none"),
    (PixelFormat::Yuv420p, c"yuv420p"),
    (PixelFormat::Yuv422p, c"yuv422p"),
    (PixelFormat::Yuv444p, c"yuv444p"),
    (PixelFormat::Yuv420p10le, c"yuv420p10le"),
    (PixelFormat::Yuv422p10le, c"yuv422p10le"),
    (PixelFormat::Yuv444p10le, c"yuv444p10le"),
    (PixelFormat::Nv12, c"nv12"),
    (PixelFormat::Nv21, c"nv21"),
    (PixelFormat::Nv16, c"nv16"),
    (PixelFormat::P010le, c"p010le"),
    (PixelFormat::P016le, c"p016le"),
    (PixelFormat::Yuyv422, c"yuyv422"),
    (PixelFormat::Uyvy422, c"uyvy422"),
    (PixelFormat::Rgb24, c"rgb24"),
    (PixelFormat::Bgr24, c"bgr24"),
    (PixelFormat::Rgba, c"rgba"),
    (PixelFormat::Bgra, c"bgra"),
    (PixelFormat::Rgb0, c"rgb0"),
    (PixelFormat::Bgr0, c"bgr0"),
    (PixelFormat::X2rgb10le, c"x2rgb10le"),
    (PixelFormat::Gray8, c"gray"),
    (PixelFormat::Vaapi, c"vaapi"),
    (PixelFormat::Vdpau, c"vdpau"),
    (PixelFormat::Dxva2Vld, c"dxva2_vld"),
    (PixelFormat::D3d11, c"d3d11"),
    (PixelFormat::VideoToolbox, c"videotoolbox_vld"),
    (PixelFormat::Cuda, c"cuda"),
    (PixelFormat::Qsv, c"qsv"),
    (PixelFormat::DrmPrime, c"drm_prime"),
    (PixelFormat::Vulkan, c"vulkan"),
    (PixelFormat::MediaCodec, c"mediacodec"),
];

/// 按色度子采样右移并向上取整 (对标 `AV_CEIL_RSHIFT`)
const fn ceil_rshift(value: usize, shift: u32) -> usize {
    value.div_ceil(1 << shift)
}

impl PixelFormat {
    /// 所有已知格式 (不含 None 与 Other)
    pub fn all() -> impl Iterator<Item = PixelFormat> {
        NAMES
            .iter()
            .map(|(pf, _)| *pf)
            .filter(|pf| *pf != Self::None)
    }

    /// 按名称查找像素格式 (不区分大小写)
    ///
    /// `"none"` 与空字符串都不视为有效格式, 返回 `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        NAMES
            .iter()
            .filter(|(pf, _)| *pf != Self::None)
            .find(|(_, n)| n.to_bytes().eq_ignore_ascii_case(name.as_bytes()))
            .map(|(pf, _)| *pf)
    }

    /// 格式名称 (C 字符串形式, 静态生命周期)
    ///
    /// `Other` 没有静态名称, 返回 `"unknown"`, 真实名称需向后端查询.
    pub fn c_name(&self) -> &'static CStr {
        if let Self::Other(_) = self {
            return c"unknown";
        }
        NAMES
            .iter()
            .find(|(pf, _)| pf == self)
            .map(|(_, n)| *n)
            .unwrap_or(c"none")
    }

    /// 格式名称
    pub fn name(&self) -> &'static str {
        self.c_name().to_str().unwrap_or("none")
    }

    /// 是否为硬件表面格式 (数据不在系统内存中)
    pub const fn is_hardware(&self) -> bool {
        matches!(
            self,
            Self::Vaapi
                | Self::Vdpau
                | Self::Dxva2Vld
                | Self::D3d11
                | Self::VideoToolbox
                | Self::Cuda
                | Self::Qsv
                | Self::DrmPrime
                | Self::Vulkan
                | Self::MediaCodec
        )
    }

    /// 获取色度子采样 (log2 水平, log2 垂直)
    pub const fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p
            | Self::Yuv420p10le
            | Self::Nv12
            | Self::Nv21
            | Self::P010le
            | Self::P016le => (1, 1),
            Self::Yuv422p | Self::Yuv422p10le | Self::Nv16 | Self::Yuyv422 | Self::Uyvy422 => {
                (1, 0)
            }
            _ => (0, 0),
        }
    }

    /// 各平面的 (像素步长字节数, 是否按水平色度子采样计宽)
    ///
    /// 与 FFmpeg `av_image_fill_linesizes()` 的计算方式一致: 平面中步长最大的
    /// 分量若为色度分量, 该平面的宽度先按色度子采样向上取整.
    const fn plane_steps(&self) -> &'static [(usize, bool)] {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p => &[(1, false), (1, true), (1, true)],
            Self::Yuv420p10le | Self::Yuv422p10le | Self::Yuv444p10le => {
                &[(2, false), (2, true), (2, true)]
            }
            Self::Nv12 | Self::Nv21 | Self::Nv16 => &[(1, false), (2, true)],
            Self::P010le | Self::P016le => &[(2, false), (4, true)],
            // 每两个像素共享一组 U/V, 步长 4 字节
            Self::Yuyv422 | Self::Uyvy422 => &[(4, true)],
            Self::Rgb24 | Self::Bgr24 => &[(3, false)],
            Self::Rgba | Self::Bgra | Self::Rgb0 | Self::Bgr0 | Self::X2rgb10le => &[(4, false)],
            Self::Gray8 => &[(1, false)],
            _ => &[],
        }
    }

    /// 平面数量, 硬件格式、None 与 Other 为 0
    pub const fn plane_count(&self) -> u32 {
        self.plane_steps().len() as u32
    }

    /// 计算指定平面每行的最小字节数 (不含对齐填充)
    ///
    /// 奇数宽度时色度按向上取整计算. 格式为 None/硬件格式/Other
    /// 或平面索引越界时返回 `None`.
    pub fn plane_linesize(&self, plane: usize, width: u32) -> Option<usize> {
        let (step, subsampled) = *self.plane_steps().get(plane)?;
        let w = width as usize;
        let (sub_h, _) = self.chroma_subsampling();
        Some(if subsampled {
            step * ceil_rshift(w, sub_h)
        } else {
            step * w
        })
    }

    /// 计算指定平面的行数, 奇数高度时色度按向上取整计算
    pub fn plane_height(&self, plane: usize, height: u32) -> Option<usize> {
        if plane >= self.plane_count() as usize {
            return None;
        }
        let h = height as usize;
        let (_, sub_v) = self.chroma_subsampling();
        Some(if plane == 1 || plane == 2 {
            ceil_rshift(h, sub_v)
        } else {
            h
        })
    }

    /// 计算整帧的字节数 (各平面紧密排列)
    pub fn frame_size(&self, width: u32, height: u32) -> Option<usize> {
        if self.plane_count() == 0 {
            return None;
        }
        let mut total = 0usize;
        for plane in 0..self.plane_count() as usize {
            total += self.plane_linesize(plane, width)? * self.plane_height(plane, height)?;
        }
        Some(total)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(id) => write!(f, "pix_fmt#{id}"),
            _ => write!(f, "{}", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_按名称查找不区分大小写() {
        assert_eq!(PixelFormat::from_name("NV12"), Some(PixelFormat::Nv12));
        assert_eq!(PixelFormat::from_name("rgb0"), Some(PixelFormat::Rgb0));
        assert_eq!(PixelFormat::from_name("BGR0"), Some(PixelFormat::Bgr0));
        assert_eq!(PixelFormat::from_name("YUV420P"), Some(PixelFormat::Yuv420p));
        assert_eq!(PixelFormat::from_name("gray"), Some(PixelFormat::Gray8));
    }

    #[test]
    fn test_未知名称返回none() {
        assert_eq!(PixelFormat::from_name(""), None);
        assert_eq!(PixelFormat::from_name("none"), None);
        assert_eq!(PixelFormat::from_name("not_a_format"), None);
    }

    #[test]
    fn test_名称表往返() {
        for (pf, _) in NAMES.iter().filter(|(pf, _)| *pf != PixelFormat::None) {
            assert_eq!(PixelFormat::from_name(pf.name()), Some(*pf), "{pf}");
        }
        assert_eq!(PixelFormat::VideoToolbox.name(), "videotoolbox_vld");
        assert_eq!(PixelFormat::None.c_name(), c"none");
    }

    #[test]
    fn test_硬件格式无平面() {
        assert!(PixelFormat::Vaapi.is_hardware());
        assert!(PixelFormat::Cuda.is_hardware());
        assert!(!PixelFormat::Nv12.is_hardware());
        assert_eq!(PixelFormat::Vaapi.plane_count(), 0);
        assert_eq!(PixelFormat::Vaapi.frame_size(64, 64), None);
        assert_eq!(PixelFormat::None.plane_linesize(0, 64), None);
    }

    #[test]
    fn test_nv12_frame_size() {
        let pf = PixelFormat::Nv12;
        assert_eq!(pf.plane_linesize(0, 1920), Some(1920));
        assert_eq!(pf.plane_linesize(1, 1920), Some(1920));
        assert_eq!(pf.plane_height(1, 1080), Some(540));
        assert_eq!(pf.frame_size(1920, 1080), Some(1920 * 1080 * 3 / 2));
    }

    #[test]
    fn test_p010le_frame_size() {
        let pf = PixelFormat::P010le;
        assert_eq!(pf.plane_linesize(0, 1920), Some(3840));
        assert_eq!(pf.plane_linesize(1, 1920), Some(3840));
        assert_eq!(pf.frame_size(1920, 1080), Some(1920 * 1080 * 3));
    }

    #[test]
    fn test_yuv420p_frame_size() {
        let pf = PixelFormat::Yuv420p;
        assert_eq!(pf.plane_linesize(2, 1920), Some(960));
        assert_eq!(pf.plane_height(2, 1080), Some(540));
        assert_eq!(pf.frame_size(1920, 1080), Some(1920 * 1080 * 3 / 2));
    }

    #[test]
    fn test_rgb0_frame_size() {
        let pf = PixelFormat::Rgb0;
        assert_eq!(pf.plane_linesize(0, 640), Some(2560));
        assert_eq!(pf.plane_linesize(1, 640), None);
        assert_eq!(pf.frame_size(640, 480), Some(640 * 480 * 4));
    }

    #[test]
    fn test_常见下载格式可按名称查找() {
        for name in ["yuyv422", "UYVY422", "p016le", "nv16", "yuv444p10le", "x2rgb10le"] {
            let pf = PixelFormat::from_name(name).unwrap_or_else(|| panic!("{name}"));
            assert!(!pf.is_hardware());
            assert!(pf.plane_count() > 0);
        }
    }

    #[test]
    fn test_奇数尺寸色度向上取整() {
        assert_eq!(PixelFormat::Yuv420p.plane_height(1, 5), Some(3));
        assert_eq!(PixelFormat::Yuv420p.plane_linesize(2, 5), Some(3));
        assert_eq!(PixelFormat::Yuv420p.frame_size(5, 5), Some(25 + 2 * 9));
        assert_eq!(PixelFormat::Nv12.plane_linesize(1, 5), Some(6));
        assert_eq!(PixelFormat::Nv12.plane_height(1, 5), Some(3));
        assert_eq!(PixelFormat::P010le.plane_linesize(1, 5), Some(12));
        // 4:2:2 只在水平方向子采样
        assert_eq!(PixelFormat::Yuv422p.plane_height(1, 5), Some(5));
        assert_eq!(PixelFormat::Yuyv422.plane_linesize(0, 5), Some(12));
        assert_eq!(PixelFormat::Yuyv422.plane_height(0, 5), Some(5));
    }

    #[test]
    fn test_其他格式由后端描述() {
        let pf = PixelFormat::Other(123);
        assert!(!pf.is_hardware());
        assert_eq!(pf.plane_count(), 0);
        assert_eq!(pf.plane_linesize(0, 64), None);
        assert_eq!(pf.c_name(), c"unknown");
        assert_eq!(pf.to_string(), "pix_fmt#123");
        assert!(PixelFormat::all().all(|pf| !matches!(pf, PixelFormat::Other(_))));
    }
}
