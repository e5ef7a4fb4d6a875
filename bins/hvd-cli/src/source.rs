//! Annex B 基本流切分.
//!
//! 按起始码 (`00 00 01` 或 `00 00 00 01`) 把 H.264/HEVC 基本流切成 NAL 单元,
//! 再按 NAL 头把属于同一幅图像的单元组合成访问单元. 每个访问单元连同起始码
//! 一起作为一个数据包送入解码器, 多切片图像不会被拆成多个数据包.

/// 在 `data[from..]` 中查找下一个起始码, 返回 (位置, 长度)
fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 3 <= data.len() {
        if data[i + 2] > 1 {
            i += 3;
        } else if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            if i > from && data[i - 1] == 0 {
                return Some((i - 1, 4));
            }
            return Some((i, 3));
        } else {
            i += 1;
        }
    }
    None
}

/// 去掉单元开头的起始码
fn strip_start_code(unit: &[u8]) -> &[u8] {
    match unit {
        [0, 0, 0, 1, rest @ ..] | [0, 0, 1, rest @ ..] => rest,
        _ => unit,
    }
}

/// 以起始码分隔的单元迭代器
///
/// 第一个起始码之前的数据被丢弃; 完全没有起始码时整段数据作为一个单元.
#[derive(Debug, Clone)]
pub struct AnnexBUnits<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> AnnexBUnits<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 下一个单元在 `data` 中的范围
    fn next_range(&mut self) -> Option<(usize, usize)> {
        while self.pos < self.data.len() {
            let Some((start, len)) = find_start_code(self.data, self.pos) else {
                let start = self.pos;
                self.pos = self.data.len();
                return Some((start, self.data.len()));
            };
            let payload = start + len;
            let end = find_start_code(self.data, payload).map_or(self.data.len(), |(s, _)| s);
            self.pos = end;
            // 连续的起始码之间没有负载
            if end > payload {
                return Some((start, end));
            }
        }
        None
    }
}

impl<'a> Iterator for AnnexBUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let (start, end) = self.next_range()?;
        Some(&self.data[start..end])
    }
}

/// NAL 单元在访问单元中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitRole {
    /// 图像的第一个切片
    FirstSlice,
    /// 同一图像的后续切片
    Slice,
    /// 只能出现在图像之前 (参数集、分隔符、前缀 SEI)
    Prefix,
    /// 跟随当前图像 (填充数据、序列结束、后缀 SEI)
    Suffix,
}

/// 码流的 NAL 语法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalSyntax {
    /// H.264: 1 字节 NAL 头
    H264,
    /// HEVC: 2 字节 NAL 头
    Hevc,
    /// 不解析 NAL 头, 每个单元单独成包
    Opaque,
}

impl NalSyntax {
    /// 按解码器名称选择, 如 "h264", "h264_cuvid", "hevc_qsv"
    pub fn for_codec(codec: &str) -> Self {
        let codec = codec.to_ascii_lowercase();
        if codec.starts_with("h264") {
            Self::H264
        } else if codec.starts_with("hevc") || codec.starts_with("h265") {
            Self::Hevc
        } else {
            Self::Opaque
        }
    }

    fn role(self, unit: &[u8]) -> UnitRole {
        let nal = strip_start_code(unit);
        // 切片头第一个字段 (first_mb_in_slice == 0 或 first_slice_segment_in_pic_flag)
        // 的首位为 1 表示新图像的第一个切片
        let first_slice = |byte: Option<&u8>| {
            if byte.is_none_or(|b| b & 0x80 != 0) {
                UnitRole::FirstSlice
            } else {
                UnitRole::Slice
            }
        };
        match self {
            Self::Opaque => UnitRole::FirstSlice,
            Self::H264 => match nal.first().map(|h| h & 0x1f) {
                Some(1..=5) => first_slice(nal.get(1)),
                Some(6..=9 | 14..=18) => UnitRole::Prefix,
                _ => UnitRole::Suffix,
            },
            Self::Hevc => match nal.first().map(|h| (h >> 1) & 0x3f) {
                Some(0..=31) => first_slice(nal.get(2)),
                Some(32..=35 | 39 | 41..=44 | 48..=55) => UnitRole::Prefix,
                _ => UnitRole::Suffix,
            },
        }
    }
}

/// 访问单元迭代器
///
/// 一个访问单元在遇到下一幅图像的第一个切片, 或图像之后出现参数集/分隔符时结束.
#[derive(Debug, Clone)]
pub struct AccessUnits<'a> {
    data: &'a [u8],
    units: AnnexBUnits<'a>,
    syntax: NalSyntax,
    /// 已读出但属于下一个访问单元的单元
    pending: Option<(usize, usize)>,
}

impl<'a> AccessUnits<'a> {
    pub fn new(data: &'a [u8], syntax: NalSyntax) -> Self {
        Self {
            data,
            units: AnnexBUnits::new(data),
            syntax,
            pending: None,
        }
    }
}

impl<'a> Iterator for AccessUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let (start, mut end) = self.pending.take().or_else(|| self.units.next_range())?;
        let is_slice = |role: UnitRole| matches!(role, UnitRole::FirstSlice | UnitRole::Slice);
        let mut has_slice = is_slice(self.syntax.role(&self.data[start..end]));

        while let Some((s, e)) = self.units.next_range() {
            let role = self.syntax.role(&self.data[s..e]);
            let starts_next = has_slice && matches!(role, UnitRole::FirstSlice | UnitRole::Prefix);
            if starts_next {
                self.pending = Some((s, e));
                break;
            }
            has_slice |= is_slice(role);
            end = e;
        }
        Some(&self.data[start..end])
    }
}
