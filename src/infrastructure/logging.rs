use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    pub include_file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            include_file_location: false,
        }
    }
}

/// 日志格式
#[derive(Debug, Clone)]
pub enum LogFormat {
    /// 人类可读的格式
    Pretty,
    /// 紧凑格式
    Compact,
    /// JSON 格式
    Json,
}

/// 日志输出目标
#[derive(Debug, Clone)]
pub enum LogOutput {
    /// 标准输出
    Stdout,
    /// 标准错误
    Stderr,
}

/// 设置日志系统
pub fn setup_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(format!("lint_action={}", config.level).parse()?);

    match config.output {
        LogOutput::Stdout => {
            let fmt_layer = create_fmt_layer(&config, io::stdout);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
        }
        LogOutput::Stderr => {
            let fmt_layer = create_fmt_layer(&config, io::stderr);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
        }
    }

    Ok(())
}

fn create_fmt_layer<S, W>(
    config: &LoggingConfig,
    writer: W,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_file(config.include_file_location)
            .with_line_number(config.include_file_location)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_file(config.include_file_location)
            .with_line_number(config.include_file_location)
            .with_target(false)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_file(config.include_file_location)
            .with_line_number(config.include_file_location)
            .boxed(),
    }
}
