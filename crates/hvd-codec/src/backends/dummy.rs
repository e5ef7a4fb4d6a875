//! 模拟硬件解码后端.
//!
//! 行为模仿 libavcodec 的 send/receive 模型:
//! - 有界输入队列, 队列满时 `send_packet()` 返回 `Again`
//! - 可配置的重排延迟, 队列中帧数不超过延迟时 `receive_frame()` 返回 `Again`
//! - 刷新后依次吐出剩余帧, 然后返回 `Eof`, 直到 `flush_buffers()` 才接受新输入
//! - NAL 头字节 (无起始码时为首字节) 为 [`INVALID_DATA_MARKER`] / [`IO_ERROR_MARKER`]
//!   的数据包模拟损坏码流
//!
//! 设备、上下文和帧都登记在 [`ResourceTracker`] 中, 便于验证每个资源恰好释放一次.
//! 通过 [`FailurePoints`] 可以在任意步骤注入失败.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use bitflags::bitflags;
use hvd_core::{HvdResult, HwDeviceType, PixelFormat};
use log::debug;

use crate::backend::{BackendError, BackendResult, HwBackend, StreamHints};
use crate::frame::VideoFrameBuffer;
use crate::packet::{NOPTS_VALUE, Packet};

/// NAL 头为此值的数据包被当作无效数据 (INVALIDDATA)
pub const INVALID_DATA_MARKER: u8 = 0xEE;
/// NAL 头为此值的数据包被当作 I/O 错误 (EIO)
pub const IO_ERROR_MARKER: u8 = 0xEF;
/// NAL 头为此值的数据包触发不可容忍的送包错误
pub const FATAL_MARKER: u8 = 0xFD;

/// 行对齐字节数
const LINESIZE_ALIGN: usize = 32;

const EINVAL: i32 = -22;
const ENOENT: i32 = -2;
const ENOSYS: i32 = -38;

bitflags! {
    /// 失败注入点
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FailurePoints: u32 {
        /// 分配解码器上下文
        const CONTEXT_ALLOC = 1 << 0;
        /// 创建硬件设备
        const DEVICE_CREATE = 1 << 1;
        /// 关联设备到解码器上下文
        const DEVICE_ATTACH = 1 << 2;
        /// 打开解码器
        const CODEC_OPEN = 1 << 3;
        /// 分配帧
        const FRAME_ALLOC = 1 << 4;
        /// 取帧 (解码出错)
        const DECODE = 1 << 5;
        /// 硬件帧下载
        const TRANSFER = 1 << 6;
        /// 查询可下载格式
        const TRANSFER_FORMATS = 1 << 7;
    }
}

/// 资源种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Device,
    Context,
    Frame,
}

impl ResourceKind {
    const ALL: [ResourceKind; 3] = [Self::Device, Self::Context, Self::Frame];

    const fn index(self) -> usize {
        match self {
            Self::Device => 0,
            Self::Context => 1,
            Self::Frame => 2,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    allocated: AtomicUsize,
    released: AtomicUsize,
}

/// 资源分配/释放计数器
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    counters: Arc<[Counters; 3]>,
}

impl ResourceTracker {
    fn acquire(&self, kind: ResourceKind) -> ResourceGuard {
        self.counters[kind.index()]
            .allocated
            .fetch_add(1, Ordering::SeqCst);
        ResourceGuard {
            tracker: self.clone(),
            kind,
        }
    }

    /// 累计分配次数
    pub fn allocated(&self, kind: ResourceKind) -> usize {
        self.counters[kind.index()].allocated.load(Ordering::SeqCst)
    }

    /// 累计释放次数
    pub fn released(&self, kind: ResourceKind) -> usize {
        self.counters[kind.index()].released.load(Ordering::SeqCst)
    }

    /// 尚未释放的资源数
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.allocated(kind).saturating_sub(self.released(kind))
    }

    /// 所有种类尚未释放的资源总数
    pub fn live_total(&self) -> usize {
        ResourceKind::ALL.iter().map(|k| self.live(*k)).sum()
    }

    /// 每个已分配的资源都恰好释放了一次
    pub fn all_released(&self) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|k| self.allocated(*k) == self.released(*k))
    }
}

/// 随资源一起释放, 释放时计数
#[derive(Debug)]
struct ResourceGuard {
    tracker: ResourceTracker,
    kind: ResourceKind,
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.tracker.counters[self.kind.index()]
            .released
            .fetch_add(1, Ordering::SeqCst);
    }
}

/// 模拟注册表中的解码器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyCodec {
    name: String,
    /// 能走硬件路径的设备类型, 其余设备上会退化为软件解码
    hw_support: Vec<HwDeviceType>,
}

impl DummyCodec {
    pub fn new(name: impl Into<String>, hw_support: &[HwDeviceType]) -> Self {
        Self {
            name: name.into(),
            hw_support: hw_support.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
struct State {
    device_types: Vec<HwDeviceType>,
    codecs: Vec<DummyCodec>,
    transfer_formats: Vec<PixelFormat>,
    queue_depth: usize,
    delay: usize,
    frame_size: (u32, u32),
    failures: AtomicU32,
    init: Once,
    init_count: AtomicUsize,
    tracker: ResourceTracker,
}

/// 模拟后端构建器
#[derive(Debug, Clone)]
pub struct DummyBackendBuilder {
    device_types: Vec<HwDeviceType>,
    codecs: Vec<DummyCodec>,
    transfer_formats: Vec<PixelFormat>,
    queue_depth: usize,
    delay: usize,
    frame_size: (u32, u32),
    failures: FailurePoints,
}

impl Default for DummyBackendBuilder {
    fn default() -> Self {
        let devices = [HwDeviceType::Vaapi, HwDeviceType::Vdpau, HwDeviceType::Cuda];
        Self {
            device_types: devices.to_vec(),
            codecs: ["h264", "hevc", "vp8", "vp9"]
                .iter()
                .map(|name| DummyCodec::new(*name, &devices))
                .collect(),
            transfer_formats: vec![PixelFormat::Nv12, PixelFormat::Yuv420p],
            queue_depth: 4,
            delay: 0,
            frame_size: (320, 240),
            failures: FailurePoints::empty(),
        }
    }
}

impl DummyBackendBuilder {
    /// 替换可用的设备类型
    pub fn device_types(mut self, types: &[HwDeviceType]) -> Self {
        self.device_types = types.to_vec();
        self
    }

    /// 替换注册的解码器
    pub fn codecs(mut self, codecs: Vec<DummyCodec>) -> Self {
        self.codecs = codecs;
        self
    }

    /// 硬件帧可下载的格式, 第一个为默认格式
    pub fn transfer_formats(mut self, formats: &[PixelFormat]) -> Self {
        self.transfer_formats = formats.to_vec();
        self
    }

    /// 输入队列深度
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    /// 重排延迟: 队列中超过该数量的帧才会输出
    pub fn delay(mut self, delay: usize) -> Self {
        self.delay = delay;
        self
    }

    /// 未提供宽高提示时码流的"真实"尺寸
    pub fn frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self
    }

    pub fn fail(mut self, points: FailurePoints) -> Self {
        self.failures |= points;
        self
    }

    pub fn build(self) -> DummyBackend {
        DummyBackend {
            state: Arc::new(State {
                device_types: self.device_types,
                codecs: self.codecs,
                transfer_formats: self.transfer_formats,
                // 队列必须能容纳延迟帧 + 1, 否则永远无法输出
                queue_depth: self.queue_depth.max(self.delay + 1),
                delay: self.delay,
                frame_size: self.frame_size,
                failures: AtomicU32::new(self.failures.bits()),
                init: Once::new(),
                init_count: AtomicUsize::new(0),
                tracker: ResourceTracker::default(),
            }),
        }
    }
}

/// 模拟硬件解码后端
///
/// 克隆共享同一份注册表、失败注入状态与资源计数.
#[derive(Debug, Clone)]
pub struct DummyBackend {
    state: Arc<State>,
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyBackend {
    /// 使用默认注册表: vaapi/vdpau/cuda + h264/hevc/vp8/vp9
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> DummyBackendBuilder {
        DummyBackendBuilder::default()
    }

    pub fn tracker(&self) -> ResourceTracker {
        self.state.tracker.clone()
    }

    /// 实际执行的全局初始化次数
    pub fn init_count(&self) -> usize {
        self.state.init_count.load(Ordering::SeqCst)
    }

    /// 运行时追加失败注入点
    pub fn inject(&self, points: FailurePoints) {
        self.state.failures.fetch_or(points.bits(), Ordering::SeqCst);
    }

    /// 清除所有失败注入点
    pub fn clear_failures(&self) {
        self.state.failures.store(0, Ordering::SeqCst);
    }

    fn failing(&self, point: FailurePoints) -> bool {
        FailurePoints::from_bits_truncate(self.state.failures.load(Ordering::SeqCst))
            .contains(point)
    }
}

/// 跳过 Annex B 起始码取 NAL 头字节, 没有起始码时取首字节
fn nal_header(data: &[u8]) -> Option<u8> {
    let zeros = data.iter().take_while(|b| **b == 0).count();
    match data.get(zeros) {
        Some(1) if zeros >= 2 => data.get(zeros + 1).copied(),
        _ => data.first().copied(),
    }
}

fn other(code: i32, message: &str) -> BackendError {
    BackendError::Other {
        code,
        message: message.to_string(),
    }
}

#[derive(Debug)]
struct DeviceInner {
    ty: HwDeviceType,
    path: Option<String>,
    _guard: ResourceGuard,
}

/// 模拟设备上下文, 克隆即增加引用计数
#[derive(Debug, Clone)]
pub struct DummyDevice {
    inner: Arc<DeviceInner>,
}

impl DummyDevice {
    pub fn device_type(&self) -> HwDeviceType {
        self.inner.ty
    }

    pub fn path(&self) -> Option<&str> {
        self.inner.path.as_deref()
    }
}

/// 模拟解码器上下文
#[derive(Debug)]
pub struct DummyContext {
    codec: DummyCodec,
    hints: StreamHints,
    hw_format: PixelFormat,
    device: Option<DummyDevice>,
    opened: bool,
    /// 已送入但尚未输出的帧 (pts)
    pending: VecDeque<i64>,
    draining: bool,
    next_pts: i64,
    _guard: ResourceGuard,
}

impl DummyContext {
    pub fn hints(&self) -> StreamHints {
        self.hints
    }

    pub fn device(&self) -> Option<&DummyDevice> {
        self.device.as_ref()
    }

    fn decodes_in_hardware(&self) -> bool {
        self.device
            .as_ref()
            .is_some_and(|d| self.codec.hw_support.contains(&d.device_type()))
    }
}

/// 模拟帧
#[derive(Debug)]
pub struct DummyFrame {
    format: PixelFormat,
    width: u32,
    height: u32,
    pts: i64,
    planes: Vec<Vec<u8>>,
    linesizes: Vec<usize>,
    /// 硬件帧可下载的格式
    transfer_formats: Vec<PixelFormat>,
    _guard: ResourceGuard,
}

impl DummyFrame {
    /// 按格式分配平面并以 `fill` 填充
    fn fill_planes(&mut self, format: PixelFormat, fill: u8) {
        self.format = format;
        self.planes.clear();
        self.linesizes.clear();
        for plane in 0..format.plane_count() as usize {
            let (Some(row), Some(rows)) = (
                format.plane_linesize(plane, self.width),
                format.plane_height(plane, self.height),
            ) else {
                continue;
            };
            let linesize = row.div_ceil(LINESIZE_ALIGN) * LINESIZE_ALIGN;
            self.planes.push(vec![fill; linesize * rows]);
            self.linesizes.push(linesize);
        }
    }
}

impl VideoFrameBuffer for DummyFrame {
    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pts(&self) -> i64 {
        self.pts
    }

    fn linesize(&self, plane: usize) -> usize {
        self.linesizes.get(plane).copied().unwrap_or(0)
    }

    fn plane(&self, plane: usize) -> Option<&[u8]> {
        self.planes.get(plane).map(Vec::as_slice)
    }
}

impl HwBackend for DummyBackend {
    type Device = DummyDevice;
    type Codec = DummyCodec;
    type Context = DummyContext;
    type Frame = DummyFrame;

    fn name(&self) -> &str {
        "dummy"
    }

    fn initialize(&self) -> HvdResult<()> {
        self.state.init.call_once(|| {
            self.state.init_count.fetch_add(1, Ordering::SeqCst);
            debug!("dummy: 注册表已初始化");
        });
        Ok(())
    }

    fn find_device_type(&self, name: &str) -> Option<HwDeviceType> {
        HwDeviceType::from_name(name).filter(|ty| self.state.device_types.contains(ty))
    }

    fn find_decoder(&self, name: &str) -> Option<DummyCodec> {
        self.state.codecs.iter().find(|c| c.name == name).cloned()
    }

    fn codec_name(&self, codec: &DummyCodec) -> String {
        codec.name.clone()
    }

    fn alloc_context(&self, codec: &DummyCodec) -> BackendResult<DummyContext> {
        if self.failing(FailurePoints::CONTEXT_ALLOC) {
            return Err(BackendError::OutOfMemory);
        }
        Ok(DummyContext {
            codec: codec.clone(),
            hints: StreamHints::default(),
            hw_format: PixelFormat::None,
            device: None,
            opened: false,
            pending: VecDeque::new(),
            draining: false,
            next_pts: 0,
            _guard: self.state.tracker.acquire(ResourceKind::Context),
        })
    }

    fn configure_context(&self, ctx: &mut DummyContext, hints: &StreamHints, hw_format: PixelFormat) {
        ctx.hints = *hints;
        ctx.hw_format = hw_format;
    }

    fn create_device(&self, ty: HwDeviceType, device: Option<&str>) -> BackendResult<DummyDevice> {
        if self.failing(FailurePoints::DEVICE_CREATE) || !self.state.device_types.contains(&ty) {
            return Err(other(ENOENT, "No such file or directory"));
        }
        if let Some(path) = device {
            if !path.starts_with("/dev/") {
                return Err(other(ENOENT, "No such file or directory"));
            }
        }
        Ok(DummyDevice {
            inner: Arc::new(DeviceInner {
                ty,
                path: device.map(str::to_string),
                _guard: self.state.tracker.acquire(ResourceKind::Device),
            }),
        })
    }

    fn attach_device(&self, ctx: &mut DummyContext, device: &DummyDevice) -> BackendResult<()> {
        if self.failing(FailurePoints::DEVICE_ATTACH) {
            return Err(BackendError::OutOfMemory);
        }
        ctx.device = Some(device.clone());
        Ok(())
    }

    fn open_context(&self, ctx: &mut DummyContext, _codec: &DummyCodec) -> BackendResult<()> {
        if self.failing(FailurePoints::CODEC_OPEN) {
            return Err(other(EINVAL, "Invalid argument"));
        }
        ctx.opened = true;
        Ok(())
    }

    fn alloc_frame(&self) -> BackendResult<DummyFrame> {
        if self.failing(FailurePoints::FRAME_ALLOC) {
            return Err(BackendError::OutOfMemory);
        }
        Ok(DummyFrame {
            format: PixelFormat::None,
            width: 0,
            height: 0,
            pts: NOPTS_VALUE,
            planes: Vec::new(),
            linesizes: Vec::new(),
            transfer_formats: Vec::new(),
            _guard: self.state.tracker.acquire(ResourceKind::Frame),
        })
    }

    fn send_packet(&self, ctx: &mut DummyContext, packet: Option<&Packet<'_>>) -> BackendResult<()> {
        if !ctx.opened {
            return Err(other(EINVAL, "Invalid argument"));
        }
        let Some(packet) = packet else {
            if ctx.draining {
                return Err(BackendError::Eof);
            }
            ctx.draining = true;
            return Ok(());
        };
        if ctx.draining {
            return Err(BackendError::Eof);
        }
        if ctx.pending.len() >= self.state.queue_depth {
            return Err(BackendError::Again);
        }
        match nal_header(packet.data()) {
            Some(INVALID_DATA_MARKER) => return Err(BackendError::InvalidData),
            Some(IO_ERROR_MARKER) => return Err(BackendError::Io),
            Some(FATAL_MARKER) => return Err(other(ENOSYS, "Function not implemented")),
            _ => {}
        }
        let pts = if packet.pts() == NOPTS_VALUE {
            ctx.next_pts
        } else {
            packet.pts()
        };
        ctx.next_pts = pts + 1;
        ctx.pending.push_back(pts);
        Ok(())
    }

    fn receive_frame(&self, ctx: &mut DummyContext, frame: &mut DummyFrame) -> BackendResult<()> {
        if !ctx.opened {
            return Err(other(EINVAL, "Invalid argument"));
        }
        if self.failing(FailurePoints::DECODE) {
            return Err(other(-1, "Operation not permitted"));
        }
        let ready = ctx.pending.len() > self.state.delay || ctx.draining;
        let pts = match ctx.pending.front() {
            Some(_) if ready => ctx.pending.pop_front().unwrap_or(NOPTS_VALUE),
            None if ctx.draining => return Err(BackendError::Eof),
            _ => return Err(BackendError::Again),
        };

        let (width, height) = if ctx.hints.width > 0 && ctx.hints.height > 0 {
            (ctx.hints.width, ctx.hints.height)
        } else {
            self.state.frame_size
        };
        frame.width = width;
        frame.height = height;
        frame.pts = pts;
        if ctx.decodes_in_hardware() {
            frame.format = ctx.hw_format;
            frame.planes.clear();
            frame.linesizes.clear();
            frame.transfer_formats = self.state.transfer_formats.clone();
        } else {
            frame.fill_planes(PixelFormat::Yuv420p, pts as u8);
            frame.transfer_formats.clear();
        }
        Ok(())
    }

    fn flush_buffers(&self, ctx: &mut DummyContext) {
        ctx.pending.clear();
        ctx.draining = false;
    }

    fn transfer_frame(
        &self,
        dst: &mut DummyFrame,
        src: &DummyFrame,
        format: PixelFormat,
    ) -> BackendResult<()> {
        if self.failing(FailurePoints::TRANSFER) {
            return Err(other(ENOSYS, "Function not implemented"));
        }
        if !src.format.is_hardware() {
            return Err(other(EINVAL, "Invalid argument"));
        }
        let target = match format {
            PixelFormat::None => *src
                .transfer_formats
                .first()
                .ok_or_else(|| other(ENOSYS, "Function not implemented"))?,
            pf => pf,
        };
        if !src.transfer_formats.contains(&target) {
            return Err(other(ENOSYS, "Function not implemented"));
        }
        dst.width = src.width;
        dst.height = src.height;
        dst.pts = src.pts;
        dst.transfer_formats.clear();
        dst.fill_planes(target, src.pts as u8);
        Ok(())
    }

    fn transfer_formats(&self, src: &DummyFrame) -> BackendResult<Vec<PixelFormat>> {
        if self.failing(FailurePoints::TRANSFER_FORMATS) || !src.format.is_hardware() {
            return Err(other(EINVAL, "Invalid argument"));
        }
        Ok(src.transfer_formats.clone())
    }
}
