//! HVD 性能基准测试.
//!
//! 覆盖会话创建、送包/取帧往返、帧去填充拷贝与码流封装等热路径.
//! 使用模拟后端, 测的是封装层本身的开销.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use hvd::codec::backends::dummy::DummyBackend;
use hvd::codec::{HwContext, PacketBuffer, VideoFrameBuffer};
use hvd::core::{HvdConfig, PixelFormat};

fn bench_session_open(c: &mut Criterion) {
    c.bench_function("session_open_close_vaapi_h264", |b| {
        let hw = HwContext::init(DummyBackend::new()).unwrap();
        let config = HvdConfig::new("vaapi", "h264");
        b.iter(|| {
            let session = hw.open(black_box(&config)).unwrap();
            session.close();
        });
    });
}

fn bench_send_receive(c: &mut Criterion) {
    c.bench_function("send_receive_320x240_nv12", |b| {
        let hw = HwContext::init(DummyBackend::new()).unwrap();
        let mut session = hw.open(&HvdConfig::new("vaapi", "h264")).unwrap();
        let buffer = PacketBuffer::from_slice(&[0, 0, 0, 1, 0x65, 0x88, 0x84, 0x00]);
        b.iter(|| {
            session.send_packet(Some(&buffer.packet())).unwrap();
            let frame = session.receive_frame().unwrap();
            black_box(frame.map(|f| f.pts()));
        });
    });
}

fn bench_packed_copy(c: &mut Criterion) {
    c.bench_function("to_packed_bytes_1920x1080_nv12", |b| {
        let backend = DummyBackend::builder().frame_size(1920, 1080).build();
        let hw = HwContext::init(backend).unwrap();
        let config = HvdConfig::new("vaapi", "h264").with_pixel_format("nv12");
        let mut session = hw.open(&config).unwrap();
        let buffer = PacketBuffer::from_slice(&[0, 0, 1, 0x65]);
        session.send_packet(Some(&buffer.packet())).unwrap();
        let frame = session.receive_frame().unwrap().unwrap();
        assert_eq!(frame.pixel_format(), PixelFormat::Nv12);
        b.iter(|| black_box(frame.to_packed_bytes()));
    });
}

fn bench_packet_buffer(c: &mut Criterion) {
    c.bench_function("packet_buffer_refill_64k", |b| {
        let payload: Vec<u8> = (0..65536).map(|i| (i % 251) as u8).collect();
        let mut buffer = PacketBuffer::with_capacity(payload.len());
        b.iter(|| {
            buffer.clear();
            buffer.extend_from_slice(black_box(&payload));
            black_box(buffer.packet().size());
        });
    });
}

criterion_group!(
    benches,
    bench_session_open,
    bench_send_receive,
    bench_packed_copy,
    bench_packet_buffer,
);
criterion_main!(benches);
