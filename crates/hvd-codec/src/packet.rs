//! 压缩数据包 (Packet).
//!
//! 对标 FFmpeg 的 `AVPacket`, 但只借用调用方的数据, 不拷贝负载.
//!
//! 被包装库中部分优化过的码流读取器一次读取 32 或 64 位, 可能越过数据末尾,
//! 因此数据后必须跟随至少 [`INPUT_BUFFER_PADDING_SIZE`] 字节的填充.

use bytes::BytesMut;
use hvd_core::{HvdError, HvdResult};

/// 输入缓冲区尾部填充字节数 (对标 `AV_INPUT_BUFFER_PADDING_SIZE`)
pub const INPUT_BUFFER_PADDING_SIZE: usize = 64;

/// 未知时间戳
pub const NOPTS_VALUE: i64 = i64::MIN;

/// 借用的压缩数据包
///
/// 只在一次 `send_packet()` 调用期间有效. 大小为 0 的包是刷新 (flush) 信号.
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    /// 含尾部填充的完整缓冲区
    padded: &'a [u8],
    /// 有效数据长度
    size: usize,
    /// 显示时间戳
    pts: i64,
}

impl<'a> Packet<'a> {
    /// 从含填充的缓冲区创建数据包
    ///
    /// `padded` 的长度必须至少为 `size + INPUT_BUFFER_PADDING_SIZE`.
    pub fn new(padded: &'a [u8], size: usize) -> HvdResult<Self> {
        let required = size.saturating_add(INPUT_BUFFER_PADDING_SIZE);
        if padded.len() < required {
            return Err(HvdError::InvalidArgument(format!(
                "数据包缓冲区需要 {} 字节填充: 长度 {}, 有效数据 {}",
                INPUT_BUFFER_PADDING_SIZE,
                padded.len(),
                size
            )));
        }
        Ok(Self {
            padded,
            size,
            pts: NOPTS_VALUE,
        })
    }

    /// 刷新信号包
    pub fn flush() -> Packet<'static> {
        Packet {
            padded: &[],
            size: 0,
            pts: NOPTS_VALUE,
        }
    }

    /// 设置显示时间戳
    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = pts;
        self
    }

    /// 有效数据 (不含填充)
    pub fn data(&self) -> &'a [u8] {
        &self.padded[..self.size]
    }

    /// 数据起始指针, 供 FFI 后端使用
    pub fn as_ptr(&self) -> *const u8 {
        self.padded.as_ptr()
    }

    /// 有效数据大小 (字节)
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn pts(&self) -> i64 {
        self.pts
    }

    /// 是否为刷新信号
    pub fn is_flush(&self) -> bool {
        self.size == 0
    }
}

/// 自带尾部填充的数据包缓冲区
///
/// 适用于从文件或网络组装数据包的调用方, 填充区域始终为 0.
#[derive(Debug, Default)]
pub struct PacketBuffer {
    buf: BytesMut,
    size: usize,
}

impl PacketBuffer {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = BytesMut::with_capacity(capacity + INPUT_BUFFER_PADDING_SIZE);
        buf.resize(INPUT_BUFFER_PADDING_SIZE, 0);
        Self { buf, size: 0 }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        let mut buffer = Self::with_capacity(data.len());
        buffer.extend_from_slice(data);
        buffer
    }

    /// 追加数据, 并重新补齐尾部填充
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.buf.truncate(self.size);
        self.buf.extend_from_slice(data);
        self.size += data.len();
        self.buf.resize(self.size + INPUT_BUFFER_PADDING_SIZE, 0);
    }

    /// 清空数据, 保留已分配的容量
    pub fn clear(&mut self) {
        self.buf.clear();
        self.buf.resize(INPUT_BUFFER_PADDING_SIZE, 0);
        self.size = 0;
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// 借出数据包视图
    pub fn packet(&self) -> Packet<'_> {
        Packet {
            padded: &self.buf,
            size: self.size,
            pts: NOPTS_VALUE,
        }
    }
}
