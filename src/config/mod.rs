use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::actions;
use crate::infrastructure::error::ActionError;

// 合法的版本字面量：显式 tag 或 latest
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v?\d+\.\d+(\.\d+)?$").unwrap());

/// 工具二进制的获取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// 从 GitHub release 下载预编译二进制
    Binary,
    /// 通过 go install 编译安装
    GoInstall,
    /// 直接使用 PATH 里已有的二进制
    None,
}

impl InstallMode {
    fn parse(raw: &str) -> Result<Self, ActionError> {
        match raw {
            "binary" => Ok(InstallMode::Binary),
            "goinstall" => Ok(InstallMode::GoInstall),
            "none" => Ok(InstallMode::None),
            other => Err(ActionError::config(format!(
                "install-mode must be one of \"binary\", \"goinstall\", \"none\", got \"{}\"",
                other
            ))),
        }
    }
}

/// 一次运行的完整配置快照，运行开始时读取一次，之后不再变更
#[derive(Debug, Clone)]
pub struct Config {
    pub install_mode: InstallMode,
    pub version: String,
    pub only_new_issues: bool,
    pub github_token: String,
    pub args: String,
    pub working_directory: Option<String>,
    pub debug: HashSet<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ActionError> {
        // 本地调试时允许从 .env 读取输入
        #[cfg(not(test))]
        dotenvy::dotenv().ok();

        let install_mode = match actions::input("install-mode") {
            Some(raw) => InstallMode::parse(&raw)?,
            None => InstallMode::Binary,
        };

        let version = actions::input("version").unwrap_or_else(|| "latest".to_string());
        if version != "latest" && !VERSION_RE.is_match(&version) {
            return Err(ActionError::config(format!(
                "version must be a release tag like \"v1.64.8\" or \"latest\", got \"{}\"",
                version
            )));
        }

        // 严格校验：除了字面量 "true"/"false" 以外一律拒绝
        let only_new_issues = match actions::input("only-new-issues").as_deref() {
            Some("true") => true,
            Some("false") => false,
            other => {
                return Err(ActionError::config(format!(
                    "only-new-issues must be \"true\" or \"false\", got \"{}\"",
                    other.unwrap_or("")
                )))
            }
        };

        let debug = actions::input("debug")
            .map(|raw| {
                raw.split(',')
                    .map(|topic| topic.trim().to_lowercase())
                    .filter(|topic| !topic.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            install_mode,
            version,
            only_new_issues,
            github_token: actions::input("github-token").unwrap_or_default(),
            args: actions::input("args").unwrap_or_default(),
            working_directory: actions::input("working-directory"),
            debug,
        })
    }

    pub fn debug_enabled(&self, topic: &str) -> bool {
        self.debug.contains(topic)
    }
}
