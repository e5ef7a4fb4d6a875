//! 日志初始化.
//!
//! 库内通过 `log` 门面输出的日志经 tracing-log 桥接后分两路:
//! - 控制台 (stderr): 彩色, 默认 warn, 随 -v/-vv 提升
//! - 文件: 无色, 默认 info, 随 -v/-vv 提升, 可由 HVD_LOG 环境变量覆盖
//!
//! 日志文件按天滚动, 输出到 `{dir}/{prefix}.{date}.log`.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// 覆盖文件日志过滤规则的环境变量
pub const LOG_ENV: &str = "HVD_LOG";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// 按 -v 次数选择日志级别, `base` 为未加 -v 时的级别
pub fn level_for(verbosity: u8, base: &'static str) -> &'static str {
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    let start = LEVELS.iter().position(|l| *l == base).unwrap_or(2);
    LEVELS[(start + verbosity as usize).min(LEVELS.len() - 1)]
}

/// 安装全局日志订阅者
///
/// - `dir`: 日志目录, 不存在时创建
/// - `file_prefix`: 日志文件前缀 (如 "hvd-cli")
/// - `verbosity`: -v 次数
pub fn init(dir: &Path, file_prefix: &str, verbosity: u8) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("无法创建日志目录 {}", dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_prefix)
        .filename_suffix("log")
        .build(dir)
        .context("创建日志文件失败")?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(LineFormatter { ansi: true })
        .with_filter(EnvFilter::new(level_for(verbosity, "warn")));

    let file_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity, "info")));
    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(LineFormatter { ansi: false })
        .with_filter(file_filter);

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("日志系统已初始化")?;
    Ok(())
}

/// 单行格式: `[月-日 时:分:秒.毫秒] 级别 > 消息`, 控制台按级别着色
struct LineFormatter {
    ansi: bool,
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let level = *event.metadata().level();
        let stamp = Local::now().format("%m-%d %H:%M:%S%.3f");
        if self.ansi {
            let color = match level {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                _ => "\x1b[34m",
            };
            write!(writer, "[{stamp}] {color}{level:5}\x1b[0m > ")?;
        } else {
            write!(writer, "[{stamp}] {level:5} > ")?;
        }
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
