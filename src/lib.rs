//! # HVD
//!
//! 硬件视频解码库, 对标 FFmpeg 的 hwaccel 解码流程.
//!
//! HVD 把硬件解码收敛为一个简单的会话:
//! - **初始化**: 选择硬件后端 (vaapi / vdpau / cuda / dxva2 / videotoolbox ...)、设备与解码器
//! - **送包**: 压缩数据 (H.264, HEVC, VP8, VP9 ...) 通过 `send_packet` 送入
//! - **取帧**: 解码后的 GPU 表面下载到系统内存, 以软件帧返回
//! - **刷新**: 送入空包排空解码器, 之后可以解码新的码流
//!
//! # 快速开始
//!
//! ```rust
//! use hvd::codec::backends::dummy::DummyBackend;
//! use hvd::codec::{HwContext, PacketBuffer, VideoFrameBuffer};
//! use hvd::core::HvdConfig;
//!
//! let hw = HwContext::init(DummyBackend::new()).unwrap();
//! let config = HvdConfig::new("vaapi", "h264").with_pixel_format("nv12");
//! let mut session = hw.open(&config).unwrap();
//!
//! let packet = PacketBuffer::from_slice(&[0, 0, 0, 1, 0x65, 0x88]);
//! session.send_packet(Some(&packet.packet())).unwrap();
//! session.send_packet(None).unwrap();
//! while let Some(frame) = session.receive_frame().unwrap() {
//!     println!("{}x{} {}", frame.width(), frame.height(), frame.pixel_format());
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `hvd-core` | 配置、错误/状态码、像素格式与硬件类型 |
//! | `hvd-codec` | 后端抽象、数据包/帧、解码会话 |
//! | `hvd-ffi` | C 接口 |
//! | `hvd-cli` | 命令行工具 |

/// 配置、错误与格式表
pub use hvd_core as core;

/// 后端抽象与解码会话
pub use hvd_codec as codec;
