use std::io;
use thiserror::Error;

/// 动作错误类型
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("配置错误: {message}")]
    Configuration { message: String },

    #[error("网络错误: {message}")]
    Network { message: String, url: Option<String> },

    #[error("安装错误: {message}")]
    Install { message: String },

    #[error("缓存错误: {message}")]
    Cache { message: String },

    #[error("文件系统错误: {message}")]
    FileSystem { message: String, path: Option<String> },

    #[error("无法启动 golangci-lint: {message}")]
    Launch { message: String },

    /// golangci-lint 以退出码 1 结束，表示检查发现问题
    #[error("issues found")]
    IssuesFound,

    /// 其他非零退出码，属于基础设施故障
    #[error("golangci-lint exit with code {code}")]
    ToolFailed { code: i32 },
}

impl ActionError {
    /// 检查错误是否属于配置错误（运行前即可拒绝）
    pub fn is_configuration(&self) -> bool {
        matches!(self, ActionError::Configuration { .. })
    }

    /// 检查错误是否为检查结果本身（而非基础设施故障）
    pub fn is_analysis_result(&self) -> bool {
        matches!(self, ActionError::IssuesFound)
    }

    /// 创建配置错误
    pub fn config(message: impl Into<String>) -> Self {
        ActionError::Configuration {
            message: message.into(),
        }
    }

    /// 创建网络错误
    pub fn network(message: impl Into<String>, url: Option<String>) -> Self {
        ActionError::Network {
            message: message.into(),
            url,
        }
    }

    /// 创建安装错误
    pub fn install(message: impl Into<String>) -> Self {
        ActionError::Install {
            message: message.into(),
        }
    }

    /// 创建缓存错误
    pub fn cache(message: impl Into<String>) -> Self {
        ActionError::Cache {
            message: message.into(),
        }
    }

    /// 创建文件系统错误
    pub fn filesystem(message: impl Into<String>, path: Option<String>) -> Self {
        ActionError::FileSystem {
            message: message.into(),
            path,
        }
    }

    /// 创建进程启动错误
    pub fn launch(message: impl Into<String>) -> Self {
        ActionError::Launch {
            message: message.into(),
        }
    }
}

impl From<io::Error> for ActionError {
    fn from(value: io::Error) -> Self {
        ActionError::FileSystem {
            message: value.to_string(),
            path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ActionError::config("bad literal").is_configuration());
        assert!(!ActionError::IssuesFound.is_configuration());
        assert!(ActionError::IssuesFound.is_analysis_result());
        assert!(!ActionError::ToolFailed { code: 3 }.is_analysis_result());
    }

    #[test]
    fn test_exit_code_messages() {
        assert_eq!(ActionError::IssuesFound.to_string(), "issues found");
        let failed = ActionError::ToolFailed { code: 2 };
        assert!(failed.to_string().contains('2'));
    }
}
