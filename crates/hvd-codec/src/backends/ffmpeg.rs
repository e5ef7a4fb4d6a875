//! FFmpeg (libavcodec/libavutil) 硬件解码后端.
//!
//! 所有裸指针都被包装为持有所有权的类型, 在 `Drop` 中调用对应的
//! `av_*_free` / `av_buffer_unref`. 硬件表面格式通过 `opaque` 指针挂在
//! 各自的解码器上下文上, 多个会话之间互不干扰.
//!
//! 像素格式名称由 libavutil 解析, 格式表之外的格式以 `PixelFormat::Other`
//! 携带库内部编号, 平面布局取自库的像素格式描述符.

use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr;
use std::sync::{Once, OnceLock};

use ffmpeg_sys_next::{
    AVBufferRef, AVCodec, AVCodecContext, AVERROR, AVERROR_EOF, AVERROR_INVALIDDATA, AVFrame,
    AVHWDeviceType, AVHWFrameTransferDirection, AVPacket, AVPixelFormat, av_buffer_ref,
    av_buffer_unref, av_frame_alloc, av_frame_copy_props, av_frame_free, av_free,
    av_get_pix_fmt, av_get_pix_fmt_name, av_hwdevice_ctx_create, av_hwdevice_find_type_by_name,
    av_hwdevice_get_type_name, av_hwframe_transfer_data, av_hwframe_transfer_get_formats,
    av_image_fill_linesizes, av_log_set_level, av_packet_alloc, av_packet_free,
    av_pix_fmt_count_planes, av_pix_fmt_desc_get, av_strerror, avcodec_alloc_context3,
    avcodec_find_decoder_by_name, avcodec_flush_buffers, avcodec_free_context, avcodec_open2,
    avcodec_receive_frame, avcodec_send_packet,
};
use hvd_core::{HvdResult, HwDeviceType, PixelFormat};
use log::{debug, warn};

use crate::backend::{BackendError, BackendResult, HwBackend, StreamHints};
use crate::frame::VideoFrameBuffer;
use crate::packet::{NOPTS_VALUE, Packet};

static INIT: Once = Once::new();

/// `av_strerror` 输出缓冲区大小 (对标 `AV_ERROR_MAX_STRING_SIZE`)
const ERROR_STRING_SIZE: usize = 64;

/// 把库返回的负数错误码翻译为 `BackendError`
fn map_error(code: c_int) -> BackendError {
    if code == AVERROR(libc::EAGAIN) {
        BackendError::Again
    } else if code == AVERROR_EOF {
        BackendError::Eof
    } else if code == AVERROR_INVALIDDATA {
        BackendError::InvalidData
    } else if code == AVERROR(libc::EIO) {
        BackendError::Io
    } else if code == AVERROR(libc::ENOMEM) {
        BackendError::OutOfMemory
    } else {
        BackendError::Other {
            code,
            message: error_string(code),
        }
    }
}

fn check(code: c_int) -> BackendResult<()> {
    if code < 0 { Err(map_error(code)) } else { Ok(()) }
}

fn error_string(code: c_int) -> String {
    let mut buf = [0 as c_char; ERROR_STRING_SIZE];
    // SAFETY: 缓冲区长度与传入的 size 一致, av_strerror 保证以 \0 结尾
    unsafe {
        if av_strerror(code, buf.as_mut_ptr(), buf.len()) < 0 {
            return format!("未知错误 {code}");
        }
        CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
    }
}

fn invalid_argument(message: &str) -> BackendError {
    BackendError::Other {
        code: AVERROR(libc::EINVAL),
        message: message.to_string(),
    }
}

const PIX_FMT_NONE: c_int = AVPixelFormat::AV_PIX_FMT_NONE as c_int;

/// 格式表与库内部编号的对应关系, 首次使用时按名称解析一次
fn known_formats() -> &'static [(c_int, PixelFormat)] {
    static TABLE: OnceLock<Vec<(c_int, PixelFormat)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        PixelFormat::all()
            .filter_map(|pf| {
                // SAFETY: c_name() 返回静态的 \0 结尾字符串
                let raw = unsafe { av_get_pix_fmt(pf.c_name().as_ptr()) } as c_int;
                (raw != PIX_FMT_NONE).then_some((raw, pf))
            })
            .collect()
    })
}

/// `PixelFormat` 转为库内部编号
fn to_raw(format: PixelFormat) -> c_int {
    match format {
        PixelFormat::None => PIX_FMT_NONE,
        PixelFormat::Other(raw) => raw,
        pf => known_formats()
            .iter()
            .find(|(_, known)| *known == pf)
            .map_or(PIX_FMT_NONE, |(raw, _)| *raw),
    }
}

/// 库内部编号转为 `PixelFormat`, 格式表之外的编号保留为 `Other`
fn from_raw(raw: c_int) -> PixelFormat {
    if raw == PIX_FMT_NONE {
        return PixelFormat::None;
    }
    known_formats()
        .iter()
        .find(|(known, _)| *known == raw)
        .map_or(PixelFormat::Other(raw), |(_, pf)| *pf)
}

/// 库内部编号转为枚举, 越界的编号视为 NONE
fn av_format(raw: c_int) -> AVPixelFormat {
    if (PIX_FMT_NONE..AVPixelFormat::AV_PIX_FMT_NB as c_int).contains(&raw) {
        // SAFETY: AVPixelFormat 为 repr(i32), 取值在 NONE..NB 之间连续
        unsafe { std::mem::transmute::<c_int, AVPixelFormat>(raw) }
    } else {
        AVPixelFormat::AV_PIX_FMT_NONE
    }
}

/// 格式名称, 取自库内的描述符表
fn raw_format_name(raw: c_int) -> &'static CStr {
    // SAFETY: 返回描述符表中的静态字符串, 未知格式返回空指针
    unsafe {
        let name = av_get_pix_fmt_name(av_format(raw));
        if name.is_null() { c"none" } else { CStr::from_ptr(name) }
    }
}

/// 借用调用方数据填写数据包外壳
///
/// 基本流没有解码时间戳, dts 保持未设置, 由解码器按 pts 重排.
fn fill_packet(pkt: &mut AVPacket, packet: &Packet<'_>, size: c_int) {
    pkt.data = packet.as_ptr().cast_mut();
    pkt.size = size;
    pkt.pts = packet.pts();
    pkt.dts = NOPTS_VALUE;
}

/// 解码器选择硬件表面格式的回调
///
/// 从候选列表中挑出 `opaque` 指向的格式, 找不到时返回 NONE, 解码器将报错.
unsafe extern "C" fn get_hw_format(
    ctx: *mut AVCodecContext,
    formats: *const AVPixelFormat,
) -> AVPixelFormat {
    // SAFETY: opaque 在 configure_context 中指向 FfmpegContext 持有的 Box,
    // 其生命周期覆盖整个解码器上下文; formats 以 NONE 结尾
    unsafe {
        let wanted = *((*ctx).opaque as *const AVPixelFormat);
        let mut p = formats;
        while *p != AVPixelFormat::AV_PIX_FMT_NONE {
            if *p == wanted {
                return wanted;
            }
            p = p.add(1);
        }
    }
    warn!("ffmpeg: 解码器未提供所需的硬件表面格式");
    AVPixelFormat::AV_PIX_FMT_NONE
}

/// 硬件设备上下文引用
#[derive(Debug)]
pub struct FfmpegDevice {
    buf: *mut AVBufferRef,
}

// SAFETY: AVBufferRef 的引用计数是原子的, 设备上下文可以跨线程释放
unsafe impl Send for FfmpegDevice {}

impl Drop for FfmpegDevice {
    fn drop(&mut self) {
        // SAFETY: buf 由 av_hwdevice_ctx_create 分配, 只在此处释放
        unsafe { av_buffer_unref(&mut self.buf) };
    }
}

/// 注册表中的解码器, 由库静态持有
#[derive(Debug, Clone, Copy)]
pub struct FfmpegCodec {
    codec: *const AVCodec,
}

/// 解码器上下文
#[derive(Debug)]
pub struct FfmpegContext {
    ctx: *mut AVCodecContext,
    /// get_format 回调通过 opaque 读取, 地址必须稳定
    hw_format: Box<AVPixelFormat>,
    /// 复用的数据包外壳, 只借用调用方数据
    packet: *mut AVPacket,
}

// SAFETY: 上下文只通过 &mut 访问, 不与其他线程共享
unsafe impl Send for FfmpegContext {}

impl Drop for FfmpegContext {
    fn drop(&mut self) {
        // SAFETY: 两个指针都由对应的 alloc 分配, 只在此处释放.
        // 数据包从不持有引用计数的缓冲区, 释放时不会触碰调用方数据
        unsafe {
            av_packet_free(&mut self.packet);
            avcodec_free_context(&mut self.ctx);
        }
    }
}

/// 帧
#[derive(Debug)]
pub struct FfmpegFrame {
    frame: *mut AVFrame,
}

// SAFETY: 帧只通过所有者访问
unsafe impl Send for FfmpegFrame {}

impl Drop for FfmpegFrame {
    fn drop(&mut self) {
        // SAFETY: frame 由 av_frame_alloc 分配, 只在此处释放
        unsafe { av_frame_free(&mut self.frame) };
    }
}

impl FfmpegFrame {
    fn raw(&self) -> &AVFrame {
        // SAFETY: 构造时已检查非空
        unsafe { &*self.frame }
    }

    fn av_pixel_format(&self) -> AVPixelFormat {
        av_format(self.raw().format)
    }
}

impl VideoFrameBuffer for FfmpegFrame {
    fn pixel_format(&self) -> PixelFormat {
        from_raw(self.raw().format)
    }

    fn format_name(&self) -> &'static CStr {
        raw_format_name(self.raw().format)
    }

    fn plane_count(&self) -> usize {
        // SAFETY: 只查询描述符表, 硬件格式与 NONE 返回 0 或负数
        let planes = unsafe { av_pix_fmt_count_planes(self.av_pixel_format()) };
        usize::try_from(planes).unwrap_or(0)
    }

    fn plane_row_bytes(&self, plane: usize) -> Option<usize> {
        if plane >= self.plane_count() {
            return None;
        }
        let mut linesizes = [0 as c_int; 4];
        // SAFETY: linesizes 恰好 4 个元素
        let ret = unsafe {
            av_image_fill_linesizes(
                linesizes.as_mut_ptr(),
                self.av_pixel_format(),
                self.raw().width,
            )
        };
        if ret < 0 {
            return None;
        }
        usize::try_from(linesizes[plane]).ok()
    }

    fn plane_rows(&self, plane: usize) -> Option<usize> {
        if plane >= self.plane_count() {
            return None;
        }
        // SAFETY: 有平面的格式一定有描述符
        let desc = unsafe { av_pix_fmt_desc_get(self.av_pixel_format()).as_ref() }?;
        let h = self.height() as usize;
        // 与 av_image_fill_plane_sizes 一致: 只有平面 1/2 按色度子采样
        Some(if plane == 1 || plane == 2 {
            h.div_ceil(1 << desc.log2_chroma_h)
        } else {
            h
        })
    }

    fn width(&self) -> u32 {
        self.raw().width.max(0) as u32
    }

    fn height(&self) -> u32 {
        self.raw().height.max(0) as u32
    }

    fn pts(&self) -> i64 {
        self.raw().pts
    }

    fn linesize(&self, plane: usize) -> usize {
        self.raw()
            .linesize
            .get(plane)
            .map(|l| (*l).max(0) as usize)
            .unwrap_or(0)
    }

    fn plane(&self, plane: usize) -> Option<&[u8]> {
        let rows = self.plane_rows(plane)?;
        let data = *self.raw().data.get(plane)?;
        let linesize = self.linesize(plane);
        if data.is_null() || linesize == 0 {
            return None;
        }
        // SAFETY: 软件帧的每个平面至少有 linesize * rows 字节
        Some(unsafe { std::slice::from_raw_parts(data, linesize * rows) })
    }
}

/// FFmpeg 后端
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }
}

impl HwBackend for FfmpegBackend {
    type Device = FfmpegDevice;
    type Codec = FfmpegCodec;
    type Context = FfmpegContext;
    type Frame = FfmpegFrame;

    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn initialize(&self) -> HvdResult<()> {
        INIT.call_once(|| {
            // SAFETY: 只设置全局日志级别
            unsafe { av_log_set_level(ffmpeg_sys_next::AV_LOG_VERBOSE as c_int) };
            debug!("ffmpeg: 日志级别设置为 VERBOSE");
        });
        Ok(())
    }

    fn find_device_type(&self, name: &str) -> Option<HwDeviceType> {
        let cname = CString::new(name).ok()?;
        // SAFETY: cname 以 \0 结尾, 返回的类型名为库内静态字符串
        unsafe {
            let ty = av_hwdevice_find_type_by_name(cname.as_ptr());
            if ty == AVHWDeviceType::AV_HWDEVICE_TYPE_NONE {
                return None;
            }
            let type_name = av_hwdevice_get_type_name(ty);
            if type_name.is_null() {
                return None;
            }
            HwDeviceType::from_name(&CStr::from_ptr(type_name).to_string_lossy())
        }
    }

    fn find_decoder(&self, name: &str) -> Option<FfmpegCodec> {
        let cname = CString::new(name).ok()?;
        // SAFETY: cname 以 \0 结尾
        let codec = unsafe { avcodec_find_decoder_by_name(cname.as_ptr()) };
        (!codec.is_null()).then_some(FfmpegCodec { codec })
    }

    fn codec_name(&self, codec: &FfmpegCodec) -> String {
        // SAFETY: 注册表中的解码器名称为静态字符串
        unsafe { CStr::from_ptr((*codec.codec).name).to_string_lossy().into_owned() }
    }

    fn find_pixel_format(&self, name: &str) -> Option<PixelFormat> {
        // 库内的格式名称全为小写
        let cname = CString::new(name.trim().to_ascii_lowercase()).ok()?;
        // SAFETY: cname 以 \0 结尾
        let av = unsafe { av_get_pix_fmt(cname.as_ptr()) };
        if av == AVPixelFormat::AV_PIX_FMT_NONE {
            return None;
        }
        // 硬件表面格式没有可下载到系统内存的平面
        // SAFETY: av 为库返回的有效格式
        if unsafe { av_pix_fmt_count_planes(av) } <= 0 {
            return None;
        }
        Some(from_raw(av as c_int))
    }

    fn pixel_format_name(&self, format: PixelFormat) -> String {
        raw_format_name(to_raw(format)).to_string_lossy().into_owned()
    }

    fn alloc_context(&self, codec: &FfmpegCodec) -> BackendResult<FfmpegContext> {
        // SAFETY: codec 来自注册表
        let ctx = unsafe { avcodec_alloc_context3(codec.codec) };
        if ctx.is_null() {
            return Err(BackendError::OutOfMemory);
        }
        // SAFETY: 无参数
        let packet = unsafe { av_packet_alloc() };
        let context = FfmpegContext {
            ctx,
            hw_format: Box::new(AVPixelFormat::AV_PIX_FMT_NONE),
            packet,
        };
        if packet.is_null() {
            // 由 Drop 释放已分配的上下文
            return Err(BackendError::OutOfMemory);
        }
        Ok(context)
    }

    fn configure_context(&self, ctx: &mut FfmpegContext, hints: &StreamHints, hw_format: PixelFormat) {
        *ctx.hw_format = av_format(to_raw(hw_format));
        let opaque = (&mut *ctx.hw_format as *mut AVPixelFormat).cast::<c_void>();
        // SAFETY: ctx.ctx 非空, 尚未打开
        unsafe {
            let raw = &mut *ctx.ctx;
            raw.width = hints.width.min(c_int::MAX as u32) as c_int;
            raw.height = hints.height.min(c_int::MAX as u32) as c_int;
            if hints.profile != 0 {
                raw.profile = hints.profile;
            }
            raw.opaque = opaque;
            raw.get_format = Some(get_hw_format);
        }
    }

    fn create_device(&self, ty: HwDeviceType, device: Option<&str>) -> BackendResult<FfmpegDevice> {
        let device = device
            .map(CString::new)
            .transpose()
            .map_err(|_| invalid_argument("设备路径包含 \\0"))?;
        let mut buf = ptr::null_mut();
        // SAFETY: 名称为静态字符串, 设备路径为 \0 结尾或空指针
        unsafe {
            let av_type = av_hwdevice_find_type_by_name(ty.c_name().as_ptr());
            check(av_hwdevice_ctx_create(
                &mut buf,
                av_type,
                device.as_ref().map_or(ptr::null(), |d| d.as_ptr()),
                ptr::null_mut(),
                0,
            ))?;
        }
        Ok(FfmpegDevice { buf })
    }

    fn attach_device(&self, ctx: &mut FfmpegContext, device: &FfmpegDevice) -> BackendResult<()> {
        // SAFETY: device.buf 有效; 新引用由 avcodec_free_context 释放
        unsafe {
            let reference = av_buffer_ref(device.buf);
            if reference.is_null() {
                return Err(BackendError::OutOfMemory);
            }
            (*ctx.ctx).hw_device_ctx = reference;
        }
        Ok(())
    }

    fn open_context(&self, ctx: &mut FfmpegContext, codec: &FfmpegCodec) -> BackendResult<()> {
        // SAFETY: 上下文由同一个 codec 分配
        check(unsafe { avcodec_open2(ctx.ctx, codec.codec, ptr::null_mut()) })
    }

    fn alloc_frame(&self) -> BackendResult<FfmpegFrame> {
        // SAFETY: 无参数
        let frame = unsafe { av_frame_alloc() };
        if frame.is_null() {
            return Err(BackendError::OutOfMemory);
        }
        Ok(FfmpegFrame { frame })
    }

    fn send_packet(&self, ctx: &mut FfmpegContext, packet: Option<&Packet<'_>>) -> BackendResult<()> {
        let Some(packet) = packet else {
            // SAFETY: 空指针表示刷新
            return check(unsafe { avcodec_send_packet(ctx.ctx, ptr::null()) });
        };
        let size = c_int::try_from(packet.size()).map_err(|_| invalid_argument("数据包过大"))?;
        // SAFETY: 数据包外壳只借用调用方缓冲区 (含填充), 调用结束前复位
        unsafe {
            let pkt = &mut *ctx.packet;
            fill_packet(pkt, packet, size);
            let ret = avcodec_send_packet(ctx.ctx, pkt);
            pkt.data = ptr::null_mut();
            pkt.size = 0;
            check(ret)
        }
    }

    fn receive_frame(&self, ctx: &mut FfmpegContext, frame: &mut FfmpegFrame) -> BackendResult<()> {
        // SAFETY: 上下文已打开, 帧已分配
        check(unsafe { avcodec_receive_frame(ctx.ctx, frame.frame) })
    }

    fn flush_buffers(&self, ctx: &mut FfmpegContext) {
        // SAFETY: 上下文已打开
        unsafe { avcodec_flush_buffers(ctx.ctx) };
    }

    fn transfer_frame(
        &self,
        dst: &mut FfmpegFrame,
        src: &FfmpegFrame,
        format: PixelFormat,
    ) -> BackendResult<()> {
        // SAFETY: 两个帧均已分配, src 为硬件帧
        unsafe {
            if format != PixelFormat::None {
                (*dst.frame).format = to_raw(format);
            }
            check(av_hwframe_transfer_data(dst.frame, src.frame, 0))?;
            check(av_frame_copy_props(dst.frame, src.frame))
        }
    }

    fn transfer_formats(&self, src: &FfmpegFrame) -> BackendResult<Vec<PixelFormat>> {
        let mut formats: *mut AVPixelFormat = ptr::null_mut();
        // SAFETY: 列表以 NONE 结尾, 由 av_free 释放
        unsafe {
            check(av_hwframe_transfer_get_formats(
                src.raw().hw_frames_ctx,
                AVHWFrameTransferDirection::AV_HWFRAME_TRANSFER_DIRECTION_FROM,
                &mut formats,
                0,
            ))?;
            let mut out = Vec::new();
            let mut p = formats;
            while !p.is_null() && *p != AVPixelFormat::AV_PIX_FMT_NONE {
                out.push(from_raw(*p as c_int));
                p = p.add(1);
            }
            av_free(formats.cast::<c_void>());
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_错误码映射() {
        assert_eq!(map_error(AVERROR(libc::EAGAIN)), BackendError::Again);
        assert_eq!(map_error(AVERROR_EOF), BackendError::Eof);
        assert_eq!(map_error(AVERROR_INVALIDDATA), BackendError::InvalidData);
        assert_eq!(map_error(AVERROR(libc::EIO)), BackendError::Io);
        assert!(matches!(
            map_error(AVERROR(libc::ENOENT)),
            BackendError::Other { code, .. } if code == AVERROR(libc::ENOENT)
        ));
    }

    #[test]
    fn test_像素格式映射() {
        let raw = to_raw(PixelFormat::Nv12);
        assert_eq!(from_raw(raw), PixelFormat::Nv12);
        assert_eq!(from_raw(PIX_FMT_NONE), PixelFormat::None);
        assert_eq!(av_format(i32::MAX), AVPixelFormat::AV_PIX_FMT_NONE);
        assert_eq!(raw_format_name(i32::MAX), c"none");

        let backend = FfmpegBackend::new();
        assert_eq!(backend.find_pixel_format("YUV420P"), Some(PixelFormat::Yuv420p));
        assert_eq!(backend.find_pixel_format("vaapi"), None);
        assert_eq!(backend.find_pixel_format("bogus"), None);
        for name in ["yuyv422", "p016le", "nv16", "yuv444p10le", "x2rgb10le"] {
            let pf = backend.find_pixel_format(name).unwrap_or_else(|| panic!("{name}"));
            assert_eq!(backend.pixel_format_name(pf), name);
        }
    }

    #[test]
    fn test_格式表之外的格式() {
        let backend = FfmpegBackend::new();
        let pf = backend.find_pixel_format("yuva420p").unwrap();
        assert!(matches!(pf, PixelFormat::Other(_)));
        assert_eq!(backend.pixel_format_name(pf), "yuva420p");
    }

    /// 分配指定格式与尺寸的软件帧
    fn software_frame(name: &CStr, width: c_int, height: c_int) -> FfmpegFrame {
        let frame = FfmpegBackend::new().alloc_frame().unwrap();
        // SAFETY: 帧刚分配, 尚无缓冲区
        unsafe {
            let raw = &mut *frame.frame;
            raw.format = av_get_pix_fmt(name.as_ptr()) as c_int;
            raw.width = width;
            raw.height = height;
            assert_eq!(ffmpeg_sys_next::av_frame_get_buffer(frame.frame, 0), 0);
        }
        frame
    }

    #[test]
    fn test_奇数尺寸帧的平面布局() {
        let frame = software_frame(c"yuv420p", 5, 5);
        assert_eq!(frame.pixel_format(), PixelFormat::Yuv420p);
        assert_eq!(frame.format_name(), c"yuv420p");
        assert_eq!(frame.plane_count(), 3);
        assert_eq!(frame.plane_rows(1), Some(3));
        assert_eq!(frame.plane_row_bytes(1), Some(3));
        assert_eq!(frame.plane(1).map(<[u8]>::len), Some(frame.linesize(1) * 3));
        assert_eq!(frame.to_packed_bytes().len(), 25 + 2 * 9);

        let frame = software_frame(c"nv12", 5, 5);
        assert_eq!(frame.plane_row_bytes(1), Some(6));
        assert_eq!(frame.to_packed_bytes().len(), 25 + 6 * 3);
    }

    #[test]
    fn test_格式表之外的帧仍可访问平面() {
        let frame = software_frame(c"yuva420p", 8, 4);
        assert!(matches!(frame.pixel_format(), PixelFormat::Other(_)));
        assert_eq!(frame.format_name(), c"yuva420p");
        assert_eq!(frame.plane_count(), 4);
        for plane in 0..4 {
            assert!(frame.plane(plane).is_some(), "平面 {plane}");
        }
        assert_eq!(frame.plane_rows(3), Some(4));
        assert!(frame.plane(4).is_none());
        assert_eq!(frame.to_packed_bytes().len(), 32 + 8 + 8 + 32);
    }

    #[test]
    fn test_数据包不设置dts() {
        // SAFETY: 外壳刚分配, 只借用 buffer, 释放前清空数据指针
        unsafe {
            let mut pkt = av_packet_alloc();
            let buffer = crate::packet::PacketBuffer::from_slice(&[0, 0, 1, 0x65]);
            let packet = buffer.packet().with_pts(42);
            fill_packet(&mut *pkt, &packet, 4);
            assert_eq!((*pkt).pts, 42);
            assert_eq!((*pkt).dts, NOPTS_VALUE);
            (*pkt).data = ptr::null_mut();
            (*pkt).size = 0;
            av_packet_free(&mut pkt);
        }
    }

    #[test]
    fn test_查找不存在的解码器() {
        let backend = FfmpegBackend::new();
        backend.initialize().unwrap();
        assert!(backend.find_decoder("Y").is_none());
        assert!(backend.find_device_type("X").is_none());
    }
}
