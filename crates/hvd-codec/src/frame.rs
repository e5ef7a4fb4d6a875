//! 解码后的帧数据访问.
//!
//! 帧始终由会话持有, 调用方拿到的是借用, 有效期到下一次 `receive_frame()`
//! 或会话关闭为止. 各后端的帧类型通过 [`VideoFrameBuffer`] 暴露平面数据.

use std::ffi::CStr;

use hvd_core::PixelFormat;

/// 视频帧只读访问接口
///
/// 平面布局默认按 [`PixelFormat`] 的格式表计算. 能描述任意格式的后端
/// (如 FFmpeg 的像素格式描述符) 应覆盖 `plane_count` / `plane_row_bytes` /
/// `plane_rows` / `format_name`, 以支持 [`PixelFormat::Other`].
pub trait VideoFrameBuffer {
    /// 像素格式, 表中没有的格式为 `PixelFormat::Other`
    fn pixel_format(&self) -> PixelFormat;

    /// 宽度 (像素)
    fn width(&self) -> u32;

    /// 高度 (像素)
    fn height(&self) -> u32;

    /// 显示时间戳
    fn pts(&self) -> i64;

    /// 指定平面每行的字节数 (含对齐填充)
    fn linesize(&self, plane: usize) -> usize;

    /// 指定平面的数据, 长度为 `linesize * 平面行数`
    ///
    /// 硬件帧、无法描述的格式或平面越界时返回 `None`.
    fn plane(&self, plane: usize) -> Option<&[u8]>;

    /// 像素格式名称, 与被包装库一致
    fn format_name(&self) -> &'static CStr {
        self.pixel_format().c_name()
    }

    /// 平面数量
    fn plane_count(&self) -> usize {
        self.pixel_format().plane_count() as usize
    }

    /// 指定平面每行的有效字节数 (不含对齐填充)
    fn plane_row_bytes(&self, plane: usize) -> Option<usize> {
        self.pixel_format().plane_linesize(plane, self.width())
    }

    /// 指定平面的行数
    fn plane_rows(&self, plane: usize) -> Option<usize> {
        self.pixel_format().plane_height(plane, self.height())
    }

    /// 去掉行尾对齐填充, 按平面顺序紧密拷贝整帧数据
    fn to_packed_bytes(&self) -> Vec<u8> {
        let capacity = (0..self.plane_count())
            .filter_map(|p| Some(self.plane_row_bytes(p)? * self.plane_rows(p)?))
            .sum();
        let mut out = Vec::with_capacity(capacity);
        for plane in 0..self.plane_count() {
            let (Some(data), Some(row), Some(rows)) = (
                self.plane(plane),
                self.plane_row_bytes(plane),
                self.plane_rows(plane),
            ) else {
                continue;
            };
            let stride = self.linesize(plane);
            for y in 0..rows {
                let start = y * stride;
                match data.get(start..start + row) {
                    Some(line) => out.extend_from_slice(line),
                    None => break,
                }
            }
        }
        out
    }
}
