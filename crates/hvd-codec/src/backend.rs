//! 被包装编解码库的后端抽象.
//!
//! 会话只通过 [`HwBackend`] 访问被包装库. 设备上下文、解码器上下文和帧都是
//! 后端的关联类型, 各自在 `Drop` 中释放底层资源, 因此任何提前返回都只会
//! 释放已分配的部分, 且每个资源只释放一次.
//!
//! 调用顺序与 FFmpeg 一致:
//! 1. `find_device_type()` / `find_decoder()` 查找注册表
//! 2. `alloc_context()` + `configure_context()` 配置解码器上下文
//! 3. `create_device()` + `attach_device()` 打开硬件设备并关联
//! 4. `open_context()` 打开解码器
//! 5. 循环 `send_packet()` / `receive_frame()` / `transfer_frame()`

use hvd_core::{HvdResult, HwDeviceType, PixelFormat};
use thiserror::Error;

use crate::frame::VideoFrameBuffer;
use crate::packet::Packet;

/// 被包装库的原生错误
///
/// 只在 crate 内部流动, 由会话翻译为 `HvdError`, 不会以整数形式暴露给调用方.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// 暂时不可用 (EAGAIN)
    #[error("资源暂时不可用 (EAGAIN)")]
    Again,

    /// 流结束 (EOF)
    #[error("已到达流末尾 (EOF)")]
    Eof,

    /// 码流数据无效 (INVALIDDATA)
    #[error("处理输入时发现无效数据 (INVALIDDATA)")]
    InvalidData,

    /// I/O 错误 (EIO)
    #[error("I/O 错误 (EIO)")]
    Io,

    /// 内存不足 (ENOMEM)
    #[error("无法分配内存 (ENOMEM)")]
    OutOfMemory,

    /// 其他错误, 保留原始错误码与描述
    #[error("{message} (错误码 {code})")]
    Other { code: i32, message: String },
}

/// 后端操作结果
pub type BackendResult<T> = Result<T, BackendError>;

/// 解码器上下文提示参数
///
/// 0 表示未指定. profile 仅在非 0 时写入上下文.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamHints {
    pub width: u32,
    pub height: u32,
    pub profile: i32,
}

/// 被包装的硬件解码库
pub trait HwBackend: Clone {
    /// 硬件设备上下文
    type Device;
    /// 注册表中的解码器实现
    type Codec;
    /// 解码器上下文
    type Context;
    /// 帧缓冲
    type Frame: VideoFrameBuffer;

    /// 后端名称
    fn name(&self) -> &str;

    /// 进程级一次性初始化 (注册表、库日志级别)
    ///
    /// 必须幂等: 多次调用只生效一次.
    fn initialize(&self) -> HvdResult<()>;

    /// 按名称在库中查找硬件设备类型
    fn find_device_type(&self, name: &str) -> Option<HwDeviceType>;

    /// 按名称在库中查找解码器
    fn find_decoder(&self, name: &str) -> Option<Self::Codec>;

    /// 解码器名称
    fn codec_name(&self, codec: &Self::Codec) -> String;

    /// 按名称查找软件像素格式 (不区分大小写)
    ///
    /// 默认只认识 [`PixelFormat`] 格式表中的名称. 后端应优先交给被包装库解析,
    /// 表中没有的格式以 `PixelFormat::Other` 返回.
    fn find_pixel_format(&self, name: &str) -> Option<PixelFormat> {
        PixelFormat::from_name(name).filter(|pf| !pf.is_hardware())
    }

    /// 像素格式在被包装库中的名称
    fn pixel_format_name(&self, format: PixelFormat) -> String {
        format.to_string()
    }

    /// 为解码器分配上下文
    fn alloc_context(&self, codec: &Self::Codec) -> BackendResult<Self::Context>;

    /// 写入提示参数并安装硬件表面格式选择器
    fn configure_context(&self, ctx: &mut Self::Context, hints: &StreamHints, hw_format: PixelFormat);

    /// 创建硬件设备上下文, `device` 为 `None` 时由库自动选择
    fn create_device(&self, ty: HwDeviceType, device: Option<&str>) -> BackendResult<Self::Device>;

    /// 把设备上下文的引用关联到解码器上下文
    fn attach_device(&self, ctx: &mut Self::Context, device: &Self::Device) -> BackendResult<()>;

    /// 打开解码器
    fn open_context(&self, ctx: &mut Self::Context, codec: &Self::Codec) -> BackendResult<()>;

    /// 分配空帧
    fn alloc_frame(&self) -> BackendResult<Self::Frame>;

    /// 送入数据包, `None` 表示刷新
    fn send_packet(&self, ctx: &mut Self::Context, packet: Option<&Packet<'_>>) -> BackendResult<()>;

    /// 取出一帧
    fn receive_frame(&self, ctx: &mut Self::Context, frame: &mut Self::Frame) -> BackendResult<()>;

    /// 清空解码器内部状态, 准备解码新的码流
    fn flush_buffers(&self, ctx: &mut Self::Context);

    /// 硬件帧下载到系统内存, `format` 为 `PixelFormat::None` 时使用库默认格式
    fn transfer_frame(
        &self,
        dst: &mut Self::Frame,
        src: &Self::Frame,
        format: PixelFormat,
    ) -> BackendResult<()>;

    /// 硬件帧可下载的软件像素格式
    fn transfer_formats(&self, src: &Self::Frame) -> BackendResult<Vec<PixelFormat>>;
}
