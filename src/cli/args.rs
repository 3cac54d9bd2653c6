use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    name = "lint-action",
    version,
    about = "在 GitHub Actions 中运行 golangci-lint，支持差异过滤与结果缓存"
)]
pub struct Args {
    /// 运行收尾阶段：保存 golangci-lint 缓存（对应 action 的 post 入口）
    #[arg(long, default_value_t = false)]
    pub post: bool,

    /// 日志格式 (pretty, compact, json)
    #[arg(long = "log-format", default_value = "compact")]
    pub log_format: String,
}
