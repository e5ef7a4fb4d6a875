//! 解码循环: 送包, 取帧, 处理 AGAIN, 结束时刷新.

use std::io::Write;

use anyhow::{Context, Result, bail};
use hvd_codec::{HwBackend, PacketBuffer, Session, VideoFrameBuffer};
use hvd_core::HvdError;
use log::{debug, info};

use crate::source::{AccessUnits, NalSyntax};

/// 解码统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// 送入的数据包数
    pub packets: u64,
    /// 取出的帧数
    pub frames: u64,
    /// 写入输出的字节数
    pub bytes_written: u64,
}

/// 取出当前可用的全部帧, 返回本次取出的帧数
fn drain<B: HwBackend>(
    session: &mut Session<B>,
    output: &mut Option<&mut dyn Write>,
    stats: &mut DecodeStats,
) -> Result<u64> {
    let mut count = 0;
    while let Some(frame) = session.receive_frame()? {
        count += 1;
        debug!(
            "帧 #{}: {}x{} {} pts={}",
            stats.frames,
            frame.width(),
            frame.height(),
            frame.pixel_format(),
            frame.pts()
        );
        if let Some(out) = output.as_deref_mut() {
            let bytes = frame.to_packed_bytes();
            out.write_all(&bytes).context("写入输出文件失败")?;
            stats.bytes_written += bytes.len() as u64;
        }
        stats.frames += 1;
    }
    Ok(count)
}

/// 解码一段 Annex B 基本流, 结束时刷新解码器并取出剩余帧
///
/// 按解码器的 NAL 语法把基本流组合成访问单元, 每个访问单元一个数据包.
/// 每个帧的平面逐行写入 `output` (去掉行尾对齐填充).
pub fn decode_stream<B: HwBackend>(
    session: &mut Session<B>,
    data: &[u8],
    mut output: Option<&mut dyn Write>,
) -> Result<DecodeStats> {
    let mut stats = DecodeStats::default();
    let mut buffer = PacketBuffer::new();

    let syntax = NalSyntax::for_codec(session.codec_name());
    debug!("按 {syntax:?} 语法切分访问单元");
    for unit in AccessUnits::new(data, syntax) {
        buffer.clear();
        buffer.extend_from_slice(unit);
        let packet = buffer.packet().with_pts(stats.packets as i64);
        loop {
            match session.send_packet(Some(&packet)) {
                Ok(()) => break,
                Err(HvdError::Again) => {
                    if drain(session, &mut output, &mut stats)? == 0 {
                        bail!("解码器拒绝输入, 但没有可取出的帧");
                    }
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("送入第 {} 个数据包失败", stats.packets));
                }
            }
        }
        stats.packets += 1;
        drain(session, &mut output, &mut stats)?;
    }

    info!("输入结束, 刷新解码器");
    session.send_packet(None).context("刷新解码器失败")?;
    drain(session, &mut output, &mut stats)?;
    if let Some(out) = output {
        out.flush().context("写入输出文件失败")?;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hvd_codec::HwContext;
    use hvd_codec::backends::dummy::DummyBackend;
    use hvd_core::HvdConfig;

    fn stream(units: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..units {
            data.extend_from_slice(&[0, 0, 0, 1, 0x65, 0x80 | i as u8]);
        }
        data
    }

    #[test]
    fn test_解码全部单元() {
        let backend = DummyBackend::builder()
            .queue_depth(2)
            .delay(1)
            .frame_size(16, 8)
            .build();
        let hw = HwContext::init(backend.clone()).unwrap();
        let mut session = hw.open(&HvdConfig::new("vaapi", "h264")).unwrap();

        let mut out = Vec::new();
        let stats =
            decode_stream(&mut session, &stream(5), Some(&mut out as &mut dyn Write)).unwrap();
        assert_eq!(stats.packets, 5);
        assert_eq!(stats.frames, 5);
        // NV12 16x8 = 192 字节
        assert_eq!(out.len(), 5 * 192);
        assert_eq!(stats.bytes_written, out.len() as u64);

        // 刷新后可以继续解码新码流
        let stats = decode_stream(&mut session, &stream(2), None).unwrap();
        assert_eq!(stats.frames, 2);
        drop(session);
        assert!(backend.tracker().all_released());
    }

    #[test]
    fn test_多切片图像只送一个数据包() {
        let backend = DummyBackend::builder().frame_size(16, 8).build();
        let hw = HwContext::init(backend).unwrap();
        let mut session = hw.open(&HvdConfig::new("vaapi", "h264")).unwrap();
        let mut data = vec![0, 0, 0, 1, 0x67, 0x42, 0, 0, 0, 1, 0x68, 0xce];
        for _ in 0..3 {
            // 每幅图像两个切片
            data.extend_from_slice(&[0, 0, 1, 0x65, 0x88, 0, 0, 1, 0x65, 0x41]);
        }
        let stats = decode_stream(&mut session, &data, None).unwrap();
        assert_eq!(stats.packets, 3);
        assert_eq!(stats.frames, 3);
    }

    #[test]
    fn test_奇数尺寸输出不截断色度() {
        let backend = DummyBackend::new();
        let hw = HwContext::init(backend).unwrap();
        let config = HvdConfig::new("vaapi", "h264")
            .with_pixel_format("yuv420p")
            .with_dimensions(5, 5);
        let mut session = hw.open(&config).unwrap();
        let mut out = Vec::new();
        let stats =
            decode_stream(&mut session, &stream(1), Some(&mut out as &mut dyn Write)).unwrap();
        assert_eq!(stats.frames, 1);
        // Y 5x5 + U/V 各 3x3
        assert_eq!(out.len(), 25 + 2 * 9);
    }

    #[test]
    fn test_致命错误终止() {
        let backend = DummyBackend::new();
        let hw = HwContext::init(backend).unwrap();
        let mut session = hw.open(&HvdConfig::new("vaapi", "h264")).unwrap();
        let data = [0, 0, 1, hvd_codec::backends::dummy::FATAL_MARKER];
        let err = decode_stream(&mut session, &data, None).unwrap_err();
        assert!(format!("{err:#}").contains("送入第 0 个数据包失败"));
    }
}
