//! 硬件解码会话集成测试
//!
//! 使用模拟后端验证会话的完整生命周期:
//! - 创建/关闭与资源释放
//! - 送包/取帧/刷新
//! - AGAIN 背压
//! - 错误收敛为 OK / AGAIN / ERROR

use hvd::codec::backends::dummy::{DummyBackend, FailurePoints, INVALID_DATA_MARKER, ResourceKind};
use hvd::codec::{HwContext, Packet, PacketBuffer, Session, VideoFrameBuffer};
use hvd::core::{HvdConfig, HvdError, HvdResult, HvdStatus, PixelFormat};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open(backend: &DummyBackend, config: &HvdConfig) -> HvdResult<Session<DummyBackend>> {
    init_logger();
    HwContext::init(backend.clone())?.open(config)
}

/// 构造 n 个 IDR 单元
fn units(n: usize) -> Vec<PacketBuffer> {
    (0..n)
        .map(|i| PacketBuffer::from_slice(&[0, 0, 0, 1, 0x65, i as u8]))
        .collect()
}

/// 按 C 示例程序的方式解码: 送包失败即停止, 每次送包后取空帧
fn decode_all(session: &mut Session<DummyBackend>, packets: &[PacketBuffer]) -> HvdResult<u64> {
    let mut frames = 0;
    for buffer in packets {
        let packet = buffer.packet();
        loop {
            match session.send_packet(Some(&packet)) {
                Ok(()) => break,
                Err(HvdError::Again) => {
                    let mut drained = 0;
                    while session.receive_frame()?.is_some() {
                        drained += 1;
                    }
                    assert!(drained > 0, "AGAIN 之后必须至少能取出一帧");
                    frames += drained;
                }
                Err(e) => return Err(e),
            }
        }
        while session.receive_frame()?.is_some() {
            frames += 1;
        }
    }
    session.send_packet(None)?;
    while session.receive_frame()?.is_some() {
        frames += 1;
    }
    Ok(frames)
}

#[test]
fn test_有效配置创建成功() {
    let backend = DummyBackend::new();
    for hardware in ["vaapi", "vdpau", "cuda"] {
        for codec in ["h264", "hevc", "vp8", "vp9"] {
            let session = open(&backend, &HvdConfig::new(hardware, codec))
                .unwrap_or_else(|e| panic!("{hardware}/{codec}: {e}"));
            assert_eq!(session.hardware().name(), hardware);
        }
    }
    assert!(backend.tracker().all_released());
    assert_eq!(backend.init_count(), 1);
}

#[test]
fn test_未知名称创建失败并指明对象() {
    let backend = DummyBackend::new();
    let err = open(&backend, &HvdConfig::new("X", "h264")).err().unwrap();
    assert_eq!(err.status(), HvdStatus::Error);
    assert!(err.to_string().contains('X'));

    let err = open(&backend, &HvdConfig::new("vaapi", "Y")).err().unwrap();
    assert!(err.to_string().contains('Y'));

    // 后端存在但当前机器不支持
    let err = open(&backend, &HvdConfig::new("dxva2", "h264")).err().unwrap();
    assert!(matches!(err, HvdError::HardwareNotFound(_)));

    assert_eq!(backend.tracker().live_total(), 0);
}

#[test]
fn test_无效设备创建失败() {
    let backend = DummyBackend::new();
    let config = HvdConfig::new("vaapi", "h264").with_device("renderD999");
    let err = open(&backend, &config).err().unwrap();
    assert!(matches!(err, HvdError::DeviceCreate { ref hardware, .. } if hardware == "vaapi"));
    assert!(backend.tracker().all_released());
    assert_eq!(backend.tracker().allocated(ResourceKind::Context), 1);
}

#[test]
fn test_任意步骤失败都释放资源() {
    for point in [
        FailurePoints::CONTEXT_ALLOC,
        FailurePoints::DEVICE_CREATE,
        FailurePoints::DEVICE_ATTACH,
        FailurePoints::CODEC_OPEN,
    ] {
        let backend = DummyBackend::builder().fail(point).build();
        assert!(open(&backend, &HvdConfig::new("vaapi", "h264")).is_err());
        let tracker = backend.tracker();
        assert!(tracker.all_released(), "{point:?}");
    }
}

#[test]
fn test_任意数量数据包后刷新() {
    for n in [0, 1, 2, 7, 16] {
        let backend = DummyBackend::builder().delay(3).queue_depth(4).build();
        let mut session = open(&backend, &HvdConfig::new("vaapi", "h264")).unwrap();
        assert_eq!(decode_all(&mut session, &units(n)).unwrap(), n as u64);
        // 刷新后取帧始终返回 (NULL, OK)
        assert!(session.receive_frame().unwrap().is_none());
    }
}

#[test]
fn test_刷新后接受新码流() {
    let backend = DummyBackend::builder().delay(1).build();
    let mut session = open(&backend, &HvdConfig::new("vdpau", "hevc")).unwrap();
    assert_eq!(decode_all(&mut session, &units(5)).unwrap(), 5);
    assert_eq!(decode_all(&mut session, &units(3)).unwrap(), 3);
    assert_eq!(session.frames_decoded(), 8);
}

#[test]
fn test_背压() {
    let backend = DummyBackend::builder().queue_depth(3).delay(2).build();
    let mut session = open(&backend, &HvdConfig::new("vaapi", "h264")).unwrap();
    let packets = units(3);
    for buffer in &packets {
        session.send_packet(Some(&buffer.packet())).unwrap();
    }
    let extra = PacketBuffer::from_slice(&[0, 0, 1, 0x41]);
    // AGAIN 之后不取帧, 同一个包仍然被拒绝
    for _ in 0..3 {
        let status = HvdStatus::of(&session.send_packet(Some(&extra.packet())));
        assert_eq!(status, HvdStatus::Again);
    }
    assert!(session.receive_frame().unwrap().is_some());
    assert_eq!(
        HvdStatus::of(&session.send_packet(Some(&extra.packet()))),
        HvdStatus::Ok
    );
}

#[test]
fn test_创建后立即刷新() {
    let backend = DummyBackend::new();
    let mut session = open(&backend, &HvdConfig::new("vaapi", "h264")).unwrap();
    assert_eq!(HvdStatus::of(&session.send_packet(None)), HvdStatus::Ok);
    assert!(session.receive_frame().unwrap().is_none());
}

#[test]
fn test_单包后取帧直到空() {
    let backend = DummyBackend::new();
    let mut session = open(&backend, &HvdConfig::new("vaapi", "h264")).unwrap();
    let buffer = PacketBuffer::from_slice(&[0, 0, 0, 1, 0x65, 0x88, 0x84]);
    session.send_packet(Some(&buffer.packet())).unwrap();
    let mut frames = 0;
    while session.receive_frame().unwrap().is_some() {
        frames += 1;
    }
    assert_eq!(frames, 1);
}

#[test]
fn test_损坏数据不中断解码() {
    let backend = DummyBackend::new();
    let mut session = open(&backend, &HvdConfig::new("vaapi", "h264")).unwrap();
    let mut packets = units(2);
    packets.insert(1, PacketBuffer::from_slice(&[0, 0, 1, INVALID_DATA_MARKER, 0]));
    assert_eq!(decode_all(&mut session, &packets).unwrap(), 2);
}

#[test]
fn test_帧数据布局() {
    let backend = DummyBackend::builder().frame_size(100, 50).build();
    let config = HvdConfig::new("cuda", "h264").with_pixel_format("nv12");
    let mut session = open(&backend, &config).unwrap();
    let buffer = PacketBuffer::from_slice(&[0, 0, 1, 0x65]);
    session
        .send_packet(Some(&buffer.packet().with_pts(90)))
        .unwrap();

    let frame = session.receive_frame().unwrap().unwrap();
    assert_eq!(frame.pixel_format(), PixelFormat::Nv12);
    assert_eq!(frame.pts(), 90);
    assert_eq!(frame.plane_count(), 2);
    // 行对齐到 32 字节
    assert_eq!(frame.linesize(0), 128);
    assert_eq!(frame.plane(0).map(<[u8]>::len), Some(128 * 50));
    assert_eq!(frame.plane(1).map(<[u8]>::len), Some(128 * 25));
    assert!(frame.plane(2).is_none());
    assert_eq!(
        frame.to_packed_bytes().len(),
        PixelFormat::Nv12.frame_size(100, 50).unwrap()
    );
}

#[test]
fn test_下载失败返回错误() {
    let backend = DummyBackend::builder()
        .transfer_formats(&[PixelFormat::P010le])
        .build();
    let config = HvdConfig::new("vaapi", "hevc").with_pixel_format("nv12");
    let mut session = open(&backend, &config).unwrap();
    let buffer = PacketBuffer::from_slice(&[0, 0, 1, 0x26]);
    session.send_packet(Some(&buffer.packet())).unwrap();
    let err = session.receive_frame().unwrap_err();
    assert_eq!(err.status(), HvdStatus::Error);

    // 即使无法列出格式, 也只返回下载错误
    session.send_packet(Some(&buffer.packet())).unwrap();
    backend.inject(FailurePoints::TRANSFER_FORMATS);
    assert!(matches!(
        session.receive_frame(),
        Err(HvdError::Transfer(_))
    ));
}

#[test]
fn test_显式刷新包等同于none() {
    let backend = DummyBackend::builder().delay(1).build();
    let mut session = open(&backend, &HvdConfig::new("vaapi", "vp9")).unwrap();
    let buffer = PacketBuffer::from_slice(&[0x90, 0x01]);
    session.send_packet(Some(&buffer.packet())).unwrap();
    assert!(session.receive_frame().unwrap().is_none());
    session.send_packet(Some(&Packet::flush())).unwrap();
    assert!(session.receive_frame().unwrap().is_some());
    assert!(session.receive_frame().unwrap().is_none());
}

#[test]
fn test_配置文件往返() {
    let config = HvdConfig::new("vaapi", "h264")
        .with_device("/dev/dri/renderD128")
        .with_dimensions(640, 480);
    let json = serde_json::to_string(&config).unwrap();
    let parsed: HvdConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);

    let backend = DummyBackend::new();
    let session = open(&backend, &parsed).unwrap();
    assert_eq!(session.device().path(), Some("/dev/dri/renderD128"));
}
