//! 后端实现模块.
//!
//! - `ffmpeg`: 基于 libavcodec/libavutil 的生产后端 (feature `ffmpeg`)
//! - `dummy`: 进程内模拟后端, 不需要 GPU 与 FFmpeg 开发库, 用于测试与演练

pub mod dummy;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
