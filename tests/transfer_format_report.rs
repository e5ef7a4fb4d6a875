//! 下载失败时的诊断日志
//!
//! 全局 logger 只能安装一次, 因此单独放在一个测试二进制中.

use std::sync::{Mutex, OnceLock};

use hvd::codec::backends::dummy::{DummyBackend, FailurePoints};
use hvd::codec::{HwContext, PacketBuffer};
use hvd::core::{HvdConfig, HvdError, PixelFormat};
use log::{Level, LevelFilter, Log, Metadata, Record};

/// 收集 error 级别日志的 logger
struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Error
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if let Ok(mut lines) = self.lines.lock() {
                lines.push(record.args().to_string());
            }
        }
    }

    fn flush(&self) {}
}

fn logger() -> &'static CaptureLogger {
    static LOGGER: OnceLock<&'static CaptureLogger> = OnceLock::new();
    LOGGER.get_or_init(|| {
        let logger: &'static CaptureLogger = Box::leak(Box::new(CaptureLogger {
            lines: Mutex::new(Vec::new()),
        }));
        log::set_logger(logger).unwrap();
        log::set_max_level(LevelFilter::Error);
        logger
    })
}

/// 取出并清空已收集的日志
fn take_lines() -> Vec<String> {
    std::mem::take(&mut *logger().lines.lock().unwrap())
}

#[test]
fn test_下载失败列出支持的格式() {
    logger();
    let backend = DummyBackend::builder()
        .transfer_formats(&[PixelFormat::P010le, PixelFormat::Yuyv422])
        .build();
    let config = HvdConfig::new("vaapi", "hevc").with_pixel_format("nv12");
    let mut session = HwContext::init(backend.clone()).unwrap().open(&config).unwrap();
    let buffer = PacketBuffer::from_slice(&[0, 0, 1, 0x26, 0x01]);

    take_lines();
    session.send_packet(Some(&buffer.packet())).unwrap();
    assert!(matches!(session.receive_frame(), Err(HvdError::Transfer(_))));
    let lines = take_lines();
    let listed: Vec<&String> = lines.iter().filter(|l| l.starts_with("hvd:   ")).collect();
    assert_eq!(listed.len(), 2, "{lines:?}");
    assert!(listed[0].ends_with("p010le"));
    assert!(listed[1].ends_with("yuyv422"));

    // 无法列出格式时只记录查询失败
    backend.inject(FailurePoints::TRANSFER_FORMATS);
    session.send_packet(Some(&buffer.packet())).unwrap();
    assert!(matches!(session.receive_frame(), Err(HvdError::Transfer(_))));
    let lines = take_lines();
    assert!(lines.iter().any(|l| l.contains("无法获取可传输的像素格式")), "{lines:?}");
    assert!(!lines.iter().any(|l| l.starts_with("hvd:   ")));
}
