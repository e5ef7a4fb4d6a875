//! # hvd-codec
//!
//! HVD 硬件视频解码会话, 提供后端抽象、数据包/帧与会话生命周期.
//!
//! 本 crate 对标 FFmpeg 的 hwaccel 解码流程: 打开硬件设备, 把设备关联到解码器,
//! 以 send/receive 模型解码, 再把 GPU 表面下载为系统内存中的软件帧.
//!
//! ## 后端
//!
//! - [`backends::ffmpeg::FfmpegBackend`]: libavcodec/libavutil (feature `ffmpeg`)
//! - [`backends::dummy::DummyBackend`]: 进程内模拟后端
//!
//! ## 使用示例
//!
//! ```rust
//! use hvd_codec::backends::dummy::DummyBackend;
//! use hvd_codec::{HwContext, PacketBuffer};
//! use hvd_core::HvdConfig;
//!
//! let hw = HwContext::init(DummyBackend::new()).unwrap();
//! let mut session = hw.open(&HvdConfig::new("vaapi", "h264")).unwrap();
//!
//! let packet = PacketBuffer::from_slice(&[0, 0, 0, 1, 0x65]);
//! session.send_packet(Some(&packet.packet())).unwrap();
//! while let Some(frame) = session.receive_frame().unwrap() {
//!     let _ = frame;
//! }
//! ```

pub mod backend;
pub mod backends;
pub mod context;
pub mod frame;
pub mod packet;
pub mod session;

// 重导出常用类型
pub use backend::{BackendError, BackendResult, HwBackend, StreamHints};
pub use context::HwContext;
pub use frame::VideoFrameBuffer;
pub use packet::{INPUT_BUFFER_PADDING_SIZE, NOPTS_VALUE, Packet, PacketBuffer};
pub use session::Session;
