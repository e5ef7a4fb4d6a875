//! 统一错误类型与状态码定义.
//!
//! 被包装库的错误码在 `hvd-codec` 中翻译为 [`HvdError`], 再由 [`HvdError::status`]
//! 收敛为调用方唯一需要分支处理的三种结果: OK / AGAIN / ERROR.

use thiserror::Error;

/// 会话级结果码
///
/// 数值与 C 接口保持一致, `Again` 等于被包装库在 Linux 上的 `AVERROR(EAGAIN)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum HvdStatus {
    /// 执行成功
    Ok = 0,
    /// 发生错误
    Error = -1,
    /// 输入被拒绝 (缓冲区已满), 需先取出帧再重试
    Again = -11,
}

impl HvdStatus {
    /// C 接口使用的整数值
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// 从 `HvdResult` 收敛出状态码
    pub fn of<T>(result: &HvdResult<T>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) => e.status(),
        }
    }
}

/// HVD 统一错误类型
#[derive(Debug, Error)]
pub enum HvdError {
    /// 被包装库中找不到指定的硬件后端
    #[error("找不到硬件解码后端: {0}")]
    HardwareNotFound(String),

    /// 硬件后端没有可用于解码的表面格式
    #[error("无法确定硬件后端的像素格式: {0}")]
    HwPixelFormatNotFound(String),

    /// 被包装库中找不到指定的解码器
    #[error("找不到解码器: {0}")]
    DecoderNotFound(String),

    /// 无法识别的软件像素格式名称
    #[error("找不到像素格式: {0}")]
    PixelFormatNotFound(String),

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),

    /// 打开硬件设备失败
    #[error("打开硬件设备并创建上下文失败: {hardware}: {reason}")]
    DeviceCreate { hardware: String, reason: String },

    /// 无法把设备上下文关联到解码器上下文
    #[error("无法引用硬件设备上下文: {0}")]
    DeviceAttach(String),

    /// 打开解码器失败
    #[error("初始化解码器上下文失败: {codec}: {reason}")]
    CodecOpen { codec: String, reason: String },

    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 解码器输入缓冲区已满, 需先取出帧
    #[error("解码器输入已满, 需要先取出帧")]
    Again,

    /// 送入数据包失败
    #[error("送入数据包失败: {0}")]
    SendPacket(String),

    /// 解码过程中出错
    #[error("解码出错: {0}")]
    Decode(String),

    /// 帧在软件中解码, 未走硬件路径
    #[error("帧在软件中解码 (未走硬件), 实际格式: {0}")]
    SoftwareDecoded(String),

    /// 硬件帧下载到系统内存失败
    #[error("无法将数据传输到系统内存: {0}")]
    Transfer(String),
}

impl HvdError {
    /// 收敛为会话级结果码
    pub fn status(&self) -> HvdStatus {
        match self {
            Self::Again => HvdStatus::Again,
            _ => HvdStatus::Error,
        }
    }
}

/// HVD 统一 Result 类型
pub type HvdResult<T> = Result<T, HvdError>;
