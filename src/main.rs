use clap::Parser;
use tracing::Level;

use lint_action::actions::{Reporter, WorkflowReporter};
use lint_action::cli::args::Args;
use lint_action::infrastructure::{
    setup_logging, LogFormat, LogOutput, LoggingConfig,
};
use lint_action::runner;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // runner 打开 step debug 时同步提高日志级别
    let level = if std::env::var("RUNNER_DEBUG").map(|v| v == "1").unwrap_or(false) {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = match args.log_format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        _ => LogFormat::Compact,
    };
    if let Err(e) = setup_logging(LoggingConfig {
        level,
        format,
        output: LogOutput::Stderr,
        include_file_location: false,
    }) {
        eprintln!("failed to set up logging: {}", e);
    }

    let mut reporter = WorkflowReporter::new();
    let result = if args.post {
        runner::post().await
    } else {
        runner::run(&mut reporter).await
    };

    if let Err(e) = result {
        // 先带错误链记日志，再向流水线报告终态
        tracing::error!("{:?}", e);
        reporter.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
