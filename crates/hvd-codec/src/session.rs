//! 硬件解码会话.
//!
//! 会话聚合了硬件设备上下文、解码器上下文、两个临时帧缓冲以及
//! 硬件/软件像素格式选择. 解码流程:
//! 1. `send_packet()` 送入压缩数据, 返回 `Err(HvdError::Again)` 时先取帧
//! 2. 循环 `receive_frame()` 直到返回 `Ok(None)`
//! 3. 送入 `None` (或空包) 刷新, 继续取出剩余帧
//! 4. 刷新并取完后可直接开始解码新的码流
//!
//! 每个错误只在产生处记录一次日志, 然后以 `HvdError` 返回.

use hvd_core::{HvdConfig, HvdError, HvdResult, HwDeviceType, PixelFormat};
use log::{debug, error, info, warn};

use crate::backend::{BackendError, HwBackend, StreamHints};
use crate::frame::VideoFrameBuffer;
use crate::packet::Packet;

/// 解码会话
///
/// 字段声明顺序即释放顺序: 帧 -> 解码器上下文 -> 设备上下文.
pub struct Session<B: HwBackend> {
    /// 上一次返回给调用方的软件帧
    sw_frame: Option<B::Frame>,
    /// 上一次解码得到的硬件帧
    hw_frame: Option<B::Frame>,
    ctx: B::Context,
    device: B::Device,
    backend: B,
    hardware: HwDeviceType,
    codec_name: String,
    /// 硬件表面格式
    hw_pix_fmt: PixelFormat,
    /// 期望的软件格式, None 表示由库选择
    sw_pix_fmt: PixelFormat,
    frames_decoded: u64,
}

/// 在出错处记录一次日志
fn report(err: HvdError) -> HvdError {
    error!("hvd: {err}");
    err
}

impl<B: HwBackend> Session<B> {
    pub(crate) fn open(backend: B, config: &HvdConfig) -> HvdResult<Self> {
        let hardware = backend
            .find_device_type(&config.hardware)
            .ok_or_else(|| report(HvdError::HardwareNotFound(config.hardware.clone())))?;

        let hw_pix_fmt = hardware
            .hw_pixel_format()
            .ok_or_else(|| report(HvdError::HwPixelFormatNotFound(config.hardware.clone())))?;

        let codec = backend
            .find_decoder(&config.codec)
            .ok_or_else(|| report(HvdError::DecoderNotFound(config.codec.clone())))?;
        let codec_name = backend.codec_name(&codec);

        let mut ctx = backend.alloc_context(&codec).map_err(|e| {
            report(HvdError::OutOfMemory(format!("无法分配解码器上下文: {e}")))
        })?;

        let hints = StreamHints {
            width: config.width,
            height: config.height,
            profile: config.profile,
        };
        backend.configure_context(&mut ctx, &hints, hw_pix_fmt);

        let device = backend
            .create_device(hardware, config.device_path())
            .map_err(|e| {
                report(HvdError::DeviceCreate {
                    hardware: config.hardware.clone(),
                    reason: e.to_string(),
                })
            })?;

        backend
            .attach_device(&mut ctx, &device)
            .map_err(|e| report(HvdError::DeviceAttach(e.to_string())))?;

        backend.open_context(&mut ctx, &codec).map_err(|e| {
            report(HvdError::CodecOpen {
                codec: codec_name.clone(),
                reason: e.to_string(),
            })
        })?;

        let sw_pix_fmt = match config.pixel_format_name() {
            None => PixelFormat::None,
            Some(name) => backend
                .find_pixel_format(name)
                .ok_or_else(|| report(HvdError::PixelFormatNotFound(name.to_string())))?,
        };

        info!(
            "hvd: 会话已创建, 后端={}, 硬件={}, 设备={}, 解码器={}, 硬件格式={}, 输出格式={}",
            backend.name(),
            hardware,
            config.device_path().unwrap_or("默认"),
            codec_name,
            backend.pixel_format_name(hw_pix_fmt),
            backend.pixel_format_name(sw_pix_fmt),
        );

        Ok(Self {
            sw_frame: None,
            hw_frame: None,
            ctx,
            device,
            backend,
            hardware,
            codec_name,
            hw_pix_fmt,
            sw_pix_fmt,
            frames_decoded: 0,
        })
    }

    /// 送入数据包进行解码
    ///
    /// `None` 或空包表示刷新, 结束当前码流的输入.
    ///
    /// # 返回
    /// - `Ok(())`: 已接受. 无效数据与 I/O 类错误也视为已接受, 以便继续送入后续数据包
    /// - `Err(HvdError::Again)`: 输入缓冲区已满, 先调用 `receive_frame()` 再重试同一个包
    /// - `Err(_)`: 其他错误
    pub fn send_packet(&mut self, packet: Option<&Packet<'_>>) -> HvdResult<()> {
        let packet = packet.filter(|p| !p.is_flush());
        if packet.is_none() {
            debug!("hvd: 刷新解码器");
        }

        match self.backend.send_packet(&mut self.ctx, packet) {
            Ok(()) => Ok(()),
            Err(BackendError::Again) => {
                debug!("hvd: 解码器输入已满, 需要先取出帧");
                Err(HvdError::Again)
            }
            // 如引用了不存在的 PPS, 找不到参考帧等, 继续送入后续数据包
            Err(e @ (BackendError::InvalidData | BackendError::Io)) => {
                warn!("hvd: send_packet 错误 {e}, 忽略并继续");
                Ok(())
            }
            Err(e) => Err(report(HvdError::SendPacket(e.to_string()))),
        }
    }

    /// 取出一帧解码数据
    ///
    /// 返回的帧归会话所有, 借用在下一次调用 `receive_frame()` 时结束.
    ///
    /// # 返回
    /// - `Ok(Some(frame))`: 成功取出一帧 (已下载到系统内存)
    /// - `Ok(None)`: 需要更多输入, 或已完全刷新 (此时解码器已重置, 可以解码新码流)
    /// - `Err(_)`: 解码出错
    pub fn receive_frame(&mut self) -> HvdResult<Option<&B::Frame>> {
        // 释放上一次调用留下的帧
        self.sw_frame = None;
        self.hw_frame = None;

        let mut hw_frame = self.alloc_frame()?;
        let mut sw_frame = self.alloc_frame()?;

        match self.backend.receive_frame(&mut self.ctx, &mut hw_frame) {
            Ok(()) => {}
            Err(BackendError::Again) => return Ok(None),
            Err(BackendError::Eof) => {
                // 为调用方准备好解码新码流
                self.backend.flush_buffers(&mut self.ctx);
                debug!("hvd: 解码器已完全刷新并重置");
                return Ok(None);
            }
            Err(e) => return Err(report(HvdError::Decode(e.to_string()))),
        }

        // 这里本可以回退到软件解码, 但按错误处理
        if hw_frame.pixel_format() != self.hw_pix_fmt {
            let name = hw_frame.format_name().to_string_lossy().into_owned();
            return Err(report(HvdError::SoftwareDecoded(name)));
        }

        if let Err(e) = self
            .backend
            .transfer_frame(&mut sw_frame, &hw_frame, self.sw_pix_fmt)
        {
            let err = report(HvdError::Transfer(e.to_string()));
            self.dump_transfer_formats(&hw_frame);
            return Err(err);
        }

        self.frames_decoded += 1;
        self.hw_frame = Some(hw_frame);
        Ok(Some(&*self.sw_frame.insert(sw_frame)))
    }

    /// 关闭会话并释放所有资源
    pub fn close(self) {
        drop(self);
    }

    pub fn hardware(&self) -> HwDeviceType {
        self.hardware
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    /// 硬件表面格式
    pub fn hw_pixel_format(&self) -> PixelFormat {
        self.hw_pix_fmt
    }

    /// 期望的软件输出格式, `PixelFormat::None` 表示由库选择
    pub fn sw_pixel_format(&self) -> PixelFormat {
        self.sw_pix_fmt
    }

    /// 已成功取出的帧数
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    fn alloc_frame(&self) -> HvdResult<B::Frame> {
        self.backend
            .alloc_frame()
            .map_err(|e| report(HvdError::OutOfMemory(format!("无法分配帧: {e}"))))
    }

    /// 下载失败时列出硬件路径实际支持的软件格式
    fn dump_transfer_formats(&self, hw_frame: &B::Frame) {
        match self.backend.transfer_formats(hw_frame) {
            Ok(formats) => {
                error!("hvd: 请确认使用了受支持的软件像素格式:");
                for pf in formats {
                    error!("hvd:   {}", self.backend.pixel_format_name(pf));
                }
            }
            Err(e) => error!("hvd: 无法获取可传输的像素格式: {e}"),
        }
    }
}

impl<B: HwBackend> Drop for Session<B> {
    fn drop(&mut self) {
        debug!(
            "hvd: 关闭会话, 硬件={}, 解码器={}, 共解码 {} 帧",
            self.hardware, self.codec_name, self.frames_decoded
        );
    }
}
