//! hvd-cli - 硬件视频解码命令行工具
//!
//! 不指定输入时只初始化并关闭硬件, 用于确认硬件/设备/解码器组合可用.
//! 指定 `--input` 时解码 Annex B 基本流, 可选把解码帧写入原始文件.

mod decode;
mod logging;
mod source;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use hvd_codec::backends::dummy::DummyBackend;
use hvd_codec::{HwBackend, HwContext, Session};
use hvd_core::HvdConfig;
use log::info;

use decode::{DecodeStats, decode_stream};

const USAGE_EXAMPLES: &str = "\
示例:
  hvd-cli vaapi h264
  hvd-cli vdpau h264
  hvd-cli vaapi h264 /dev/dri/renderD128
  hvd-cli vaapi h264 /dev/dri/renderD129
  hvd-cli dxva2 h264
  hvd-cli d3d11va h264
  hvd-cli videotoolbox h264
  hvd-cli vaapi h264 --input in.h264 --output out.nv12 --pixel-format nv12";

/// 解码后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// FFmpeg (需要以 ffmpeg 特性编译)
    Ffmpeg,
    /// 进程内模拟后端
    Dummy,
}

impl BackendKind {
    fn default_kind() -> Self {
        if cfg!(feature = "ffmpeg") {
            Self::Ffmpeg
        } else {
            Self::Dummy
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "hvd-cli",
    version,
    about = "硬件视频解码工具",
    after_help = USAGE_EXAMPLES
)]
struct Cli {
    /// 硬件类型, 如 "vaapi", "vdpau", "cuda"
    hardware: Option<String>,

    /// 解码器名称, 如 "h264", "hevc", "vp8"
    codec: Option<String>,

    /// 设备路径, 如 "/dev/dri/renderD128", 不指定时使用默认设备
    device: Option<String>,

    /// 输出像素格式, 如 "nv12", "yuv420p", "rgb0"
    #[arg(long)]
    pixel_format: Option<String>,

    /// 宽度提示
    #[arg(long)]
    width: Option<u32>,

    /// 高度提示
    #[arg(long)]
    height: Option<u32>,

    /// profile 提示
    #[arg(long)]
    profile: Option<i32>,

    /// 输入 Annex B 基本流文件
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// 输出原始帧文件
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON 配置文件, 命令行参数覆盖其中的字段
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 解码后端
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// 日志目录
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// 日志级别 (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 合并配置文件与命令行参数
fn build_config(cli: &Cli) -> Result<HvdConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取配置文件 '{}'", path.display()))?;
            serde_json::from_str::<HvdConfig>(&text)
                .with_context(|| format!("无法解析配置文件 '{}'", path.display()))?
        }
        None => HvdConfig::default(),
    };

    if let Some(hardware) = &cli.hardware {
        config.hardware = hardware.clone();
    }
    if let Some(codec) = &cli.codec {
        config.codec = codec.clone();
    }
    if let Some(device) = &cli.device {
        config.device = Some(device.clone());
    }
    if let Some(pixel_format) = &cli.pixel_format {
        config.pixel_format = Some(pixel_format.clone());
    }
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if let Some(profile) = cli.profile {
        config.profile = profile;
    }

    if config.hardware.is_empty() || config.codec.is_empty() {
        bail!("必须指定 <hardware> 与 <codec>\n\n{USAGE_EXAMPLES}");
    }
    Ok(config)
}

/// 初始化失败时给出排查提示, 返回退出码 1
fn hint_on_init_failure(config: &HvdConfig) -> i32 {
    eprintln!("无法为 {} 初始化硬件解码器", config.hardware);
    eprintln!("提示:");
    eprintln!(
        "- 尝试使用其他设备? (当前: {})",
        config.device_path().unwrap_or("默认")
    );
    eprintln!("- 尝试使用其他硬件? (当前: {})", config.hardware);
    1
}

fn decode_file<B: HwBackend>(
    session: &mut Session<B>,
    input: &Path,
    output: Option<&Path>,
) -> Result<DecodeStats> {
    let data = std::fs::read(input)
        .with_context(|| format!("无法读取输入文件 '{}'", input.display()))?;
    info!("输入: {} ({} 字节)", input.display(), data.len());

    let mut writer = match output {
        Some(path) => Some(BufWriter::new(File::create(path).with_context(|| {
            format!("无法创建输出文件 '{}'", path.display())
        })?)),
        None => None,
    };
    decode_stream(
        session,
        &data,
        writer.as_mut().map(|w| w as &mut dyn Write),
    )
}

/// 创建会话, 按需解码, 关闭会话. 返回进程退出码
fn run<B: HwBackend>(backend: B, cli: &Cli, config: &HvdConfig) -> i32 {
    let opened = HwContext::init(backend).and_then(|hw| hw.open(config));
    let mut session = match opened {
        Ok(session) => session,
        Err(e) => {
            eprintln!("错误: {e}");
            return hint_on_init_failure(config);
        }
    };
    eprintln!("已初始化解码器...");

    let code = match &cli.input {
        None => {
            eprintln!("未指定输入, 只初始化并关闭硬件");
            0
        }
        Some(input) => match decode_file(&mut session, input, cli.output.as_deref()) {
            Ok(stats) => {
                eprintln!(
                    "解码完成: {} 个数据包, {} 帧, 输出 {} 字节",
                    stats.packets, stats.frames, stats.bytes_written
                );
                0
            }
            Err(e) => {
                eprintln!("错误: {e:#}");
                1
            }
        },
    };

    session.close();
    eprintln!("已关闭解码器...");
    code
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(&cli.log_dir, "hvd-cli", cli.verbose) {
        eprintln!("警告: {e:#}");
    }

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("错误: {e:#}");
            process::exit(1);
        }
    };

    let code = match cli.backend.unwrap_or_else(BackendKind::default_kind) {
        BackendKind::Dummy => run(DummyBackend::new(), &cli, &config),
        #[cfg(feature = "ffmpeg")]
        BackendKind::Ffmpeg => run(
            hvd_codec::backends::ffmpeg::FfmpegBackend::new(),
            &cli,
            &config,
        ),
        #[cfg(not(feature = "ffmpeg"))]
        BackendKind::Ffmpeg => {
            eprintln!("错误: 未启用 ffmpeg 特性, 请使用 --backend dummy 或以 --features ffmpeg 重新编译");
            1
        }
    };
    process::exit(code);
}
