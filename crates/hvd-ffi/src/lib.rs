//! # hvd-ffi
//!
//! HVD 硬件视频解码 C FFI 导出层.
//!
//! 把 `hvd-codec` 的会话导出为 C 兼容接口 (见 `include/hvd.h`),
//! 编译为 DLL (Windows) / SO (Linux) / dylib (macOS) 供 C/C++ 等语言调用.
//!
//! # 命名规范
//!
//! 所有导出函数以 `hvd_` 前缀命名:
//! - `hvd_init()` / `hvd_close()` - 创建与销毁解码会话
//! - `hvd_send_packet()` - 送入压缩数据
//! - `hvd_receive_frame()` - 取出解码后的帧
//!
//! 会话相关的导出函数需要 feature `ffmpeg`. 导出函数背后的逻辑对任意
//! [`HwBackend`] 泛型实现, 可以用模拟后端测试.
//!
//! # 内存管理
//!
//! - `hvd_init()` 返回的句柄必须通过 `hvd_close()` 释放
//! - `hvd_receive_frame()` 返回的帧归句柄所有, 有效期到下一次取帧或关闭
//! - 数据包缓冲区由调用方分配和释放, 尾部需要 `HVD_INPUT_BUFFER_PADDING_SIZE` 字节填充

#![allow(non_camel_case_types)]

use std::ffi::{CStr, c_char, c_int};
use std::ptr;

use hvd_codec::{HwBackend, HwContext, INPUT_BUFFER_PADDING_SIZE, Packet, Session, VideoFrameBuffer};
use hvd_core::{HvdConfig, HvdError, HvdStatus};
use log::error;

/// 执行成功
pub const HVD_OK: c_int = HvdStatus::Ok.code();
/// 发生错误
pub const HVD_ERROR: c_int = HvdStatus::Error.code();
/// 数据包未被接受 (缓冲区已满), 先调用 `hvd_receive_frame()` 再重试
pub const HVD_AGAIN: c_int = HvdStatus::Again.code();
/// 数据包尾部填充字节数
pub const HVD_INPUT_BUFFER_PADDING_SIZE: usize = INPUT_BUFFER_PADDING_SIZE;

/// 会话配置
///
/// 字符串字段为 NULL 表示未指定, 数值字段为 0 表示未指定.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct hvd_config {
    /// 硬件类型, 如 "vaapi"
    pub hardware: *const c_char,
    /// 解码器名称, 如 "h264", "vp8"
    pub codec: *const c_char,
    /// NULL 或设备路径, 如 "/dev/dri/renderD128"
    pub device: *const c_char,
    /// NULL 或输出像素格式, 如 "RGB0", "NV12", "YUV420P"
    pub pixel_format: *const c_char,
    pub width: c_int,
    pub height: c_int,
    pub profile: c_int,
}

/// 压缩数据包
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct hvd_packet {
    /// 编码数据, 后跟 `HVD_INPUT_BUFFER_PADDING_SIZE` 字节填充
    pub data: *mut u8,
    /// 编码数据长度 (不含填充)
    pub size: c_int,
}

/// 解码后的帧
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct hvd_frame {
    /// 各平面数据, 未使用的平面为 NULL
    pub data: [*const u8; 4],
    /// 各平面每行字节数
    pub linesize: [c_int; 4],
    pub width: c_int,
    pub height: c_int,
    /// 像素格式名称, 静态字符串
    pub format: *const c_char,
    pub pts: i64,
}

impl Default for hvd_frame {
    fn default() -> Self {
        Self {
            data: [ptr::null(); 4],
            linesize: [0; 4],
            width: 0,
            height: 0,
            format: ptr::null(),
            pts: 0,
        }
    }
}

impl hvd_frame {
    fn fill<F: VideoFrameBuffer>(&mut self, frame: &F) {
        for plane in 0..4 {
            self.data[plane] = frame.plane(plane).map_or(ptr::null(), <[u8]>::as_ptr);
            self.linesize[plane] = c_int::try_from(frame.linesize(plane)).unwrap_or(0);
        }
        self.width = c_int::try_from(frame.width()).unwrap_or(c_int::MAX);
        self.height = c_int::try_from(frame.height()).unwrap_or(c_int::MAX);
        self.format = frame.format_name().as_ptr();
        self.pts = frame.pts();
    }
}

/// 解码句柄: 会话 + 对外暴露的帧描述
pub struct Handle<B: HwBackend> {
    session: Session<B>,
    frame: hvd_frame,
}

/// 读取可选的 C 字符串, NULL 返回 `Ok(None)`, 非 UTF-8 返回错误
///
/// # Safety
///
/// `s` 为 NULL 或指向以 \0 结尾的字符串.
unsafe fn opt_str<'a>(s: *const c_char, field: &str) -> Result<Option<&'a str>, HvdError> {
    if s.is_null() {
        return Ok(None);
    }
    // SAFETY: 由调用方保证
    unsafe { CStr::from_ptr(s) }
        .to_str()
        .map(Some)
        .map_err(|_| HvdError::InvalidArgument(format!("{field} 不是有效的 UTF-8")))
}

/// 把 C 配置转换为 `HvdConfig`
///
/// # Safety
///
/// `config` 为 NULL 或指向有效的 `hvd_config`, 其中字符串字段为 NULL 或以 \0 结尾.
pub unsafe fn config_from_c(config: *const hvd_config) -> Result<HvdConfig, HvdError> {
    // SAFETY: 由调用方保证
    let Some(c) = (unsafe { config.as_ref() }) else {
        return Err(HvdError::InvalidArgument("config 为空".into()));
    };
    // SAFETY: 由调用方保证
    let (hardware, codec, device, pixel_format) = unsafe {
        (
            opt_str(c.hardware, "hardware")?,
            opt_str(c.codec, "codec")?,
            opt_str(c.device, "device")?,
            opt_str(c.pixel_format, "pixel_format")?,
        )
    };
    let (Some(hardware), Some(codec)) = (hardware, codec) else {
        return Err(HvdError::InvalidArgument("必须指定 hardware 与 codec".into()));
    };
    let mut out = HvdConfig::new(hardware, codec)
        .with_dimensions(c.width.max(0) as u32, c.height.max(0) as u32)
        .with_profile(c.profile);
    if let Some(device) = device {
        out = out.with_device(device);
    }
    if let Some(pixel_format) = pixel_format {
        out = out.with_pixel_format(pixel_format);
    }
    Ok(out)
}

impl<B: HwBackend> Handle<B> {
    /// 初始化后端并创建句柄, 失败时返回 NULL
    ///
    /// # Safety
    ///
    /// 同 [`config_from_c`].
    pub unsafe fn create(backend: B, config: *const hvd_config) -> *mut Self {
        let open = || {
            // SAFETY: 由调用方保证
            let config = unsafe { config_from_c(config) }?;
            HwContext::init(backend)?.open(&config)
        };
        match open() {
            Ok(session) => Box::into_raw(Box::new(Self {
                session,
                frame: hvd_frame::default(),
            })),
            Err(e) => {
                error!("hvd_init: {e}");
                ptr::null_mut()
            }
        }
    }

    /// 释放句柄, NULL 时无操作
    ///
    /// # Safety
    ///
    /// `h` 为 NULL 或由 [`Handle::create`] 返回且尚未释放.
    pub unsafe fn destroy(h: *mut Self) {
        if !h.is_null() {
            // SAFETY: 由调用方保证
            drop(unsafe { Box::from_raw(h) });
        }
    }

    /// 送入数据包, NULL 或 size 为 0 表示刷新
    ///
    /// # Safety
    ///
    /// `packet` 为 NULL 或指向有效的 `hvd_packet`, 其 `data` 至少有
    /// `size + HVD_INPUT_BUFFER_PADDING_SIZE` 字节可读.
    pub unsafe fn send_packet(&mut self, packet: *const hvd_packet) -> c_int {
        // SAFETY: 由调用方保证
        let packet = match unsafe { packet.as_ref() } {
            Some(p) if !p.data.is_null() && p.size > 0 => p,
            Some(p) if p.size < 0 => {
                error!("hvd_send_packet: 无效的数据包大小 {}", p.size);
                return HVD_ERROR;
            }
            _ => return HvdStatus::of(&self.session.send_packet(None)).code(),
        };
        let size = packet.size as usize;
        // SAFETY: 由调用方保证缓冲区含填充
        let padded =
            unsafe { std::slice::from_raw_parts(packet.data, size + INPUT_BUFFER_PADDING_SIZE) };
        let result = Packet::new(padded, size).and_then(|p| self.session.send_packet(Some(&p)));
        HvdStatus::of(&result).code()
    }

    /// 取出一帧, 没有帧或出错时返回 NULL, 结果写入 `error` (可为 NULL)
    ///
    /// # Safety
    ///
    /// `error` 为 NULL 或指向可写的 `c_int`.
    pub unsafe fn receive_frame(&mut self, error: *mut c_int) -> *const hvd_frame {
        let (frame, status) = match self.session.receive_frame() {
            Ok(Some(frame)) => {
                self.frame.fill(frame);
                (&self.frame as *const hvd_frame, HvdStatus::Ok)
            }
            Ok(None) => (ptr::null(), HvdStatus::Ok),
            Err(e) => (ptr::null(), e.status()),
        };
        // SAFETY: 由调用方保证
        if let Some(error) = unsafe { error.as_mut() } {
            *error = status.code();
        }
        frame
    }

    pub fn session(&self) -> &Session<B> {
        &self.session
    }
}

/// 获取 HVD 版本号字符串
///
/// 返回的字符串指针为静态分配, 无需释放.
#[unsafe(no_mangle)]
pub extern "C" fn hvd_version() -> *const c_char {
    c"0.1.0".as_ptr()
}

#[cfg(feature = "ffmpeg")]
mod exports {
    use std::ffi::c_int;

    use hvd_codec::backends::ffmpeg::FfmpegBackend;

    use super::{HVD_ERROR, Handle, hvd_config, hvd_frame, hvd_packet};

    /// 不透明句柄
    pub type hvd = Handle<FfmpegBackend>;

    /// 初始化硬件解码, 失败时返回 NULL
    ///
    /// # Safety
    ///
    /// `config` 为 NULL 或指向有效的 `hvd_config`.
    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn hvd_init(config: *const hvd_config) -> *mut hvd {
        // SAFETY: 由调用方保证
        unsafe { Handle::create(FfmpegBackend::new(), config) }
    }

    /// 释放句柄及其所有资源, NULL 时无操作
    ///
    /// # Safety
    ///
    /// `h` 为 NULL 或由 `hvd_init()` 返回且尚未释放.
    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn hvd_close(h: *mut hvd) {
        // SAFETY: 由调用方保证
        unsafe { Handle::destroy(h) }
    }

    /// 送入数据包, NULL 表示刷新
    ///
    /// # Safety
    ///
    /// `h` 为 NULL 或有效句柄; `packet` 的数据后必须跟随填充字节.
    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn hvd_send_packet(h: *mut hvd, packet: *mut hvd_packet) -> c_int {
        // SAFETY: 由调用方保证
        match unsafe { h.as_mut() } {
            Some(h) => unsafe { h.send_packet(packet) },
            None => HVD_ERROR,
        }
    }

    /// 取出解码后的帧
    ///
    /// # Safety
    ///
    /// `h` 为 NULL 或有效句柄; `error` 为 NULL 或可写.
    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn hvd_receive_frame(h: *mut hvd, error: *mut c_int) -> *const hvd_frame {
        // SAFETY: 由调用方保证
        match unsafe { h.as_mut() } {
            Some(h) => unsafe { h.receive_frame(error) },
            None => {
                if let Some(error) = unsafe { error.as_mut() } {
                    *error = HVD_ERROR;
                }
                std::ptr::null()
            }
        }
    }
}

#[cfg(feature = "ffmpeg")]
pub use exports::*;
