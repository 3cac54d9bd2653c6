//! GitHub Actions runner plumbing: action inputs, workflow context and the
//! output sinks the rest of the crate reports through.

use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::Deserialize;
use uuid::Uuid;

/// Read an action input the way the runner delivers it: `INPUT_<NAME>`,
/// uppercased, spaces replaced with underscores. Empty values count as unset.
pub fn input(name: &str) -> Option<String> {
    let key = format!("INPUT_{}", name.replace(' ', "_").to_uppercase());
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

/// 仓库标识（owner/name）
#[derive(Debug, Clone, PartialEq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

/// Workflow context snapshot, read once from the runner environment.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub event_name: String,
    pub repository: Option<RepoSlug>,
    pub pull_number: Option<u64>,
    pub api_url: String,
}

#[derive(Deserialize)]
struct EventPayload {
    pull_request: Option<PullRequestPayload>,
}

#[derive(Deserialize)]
struct PullRequestPayload {
    number: u64,
}

impl ActionContext {
    pub fn from_env() -> Self {
        let event_name = env::var("GITHUB_EVENT_NAME").unwrap_or_default();

        let repository = env::var("GITHUB_REPOSITORY")
            .ok()
            .and_then(|slug| {
                slug.split_once('/').map(|(owner, name)| RepoSlug {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            });

        let pull_number = env::var("GITHUB_EVENT_PATH")
            .ok()
            .and_then(|path| Self::read_pull_number(Path::new(&path)));

        let api_url =
            env::var("GITHUB_API_URL").unwrap_or_else(|_| "https://api.github.com".to_string());

        Self {
            event_name,
            repository,
            pull_number,
            api_url,
        }
    }

    fn read_pull_number(path: &Path) -> Option<u64> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("cannot read event payload {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<EventPayload>(&raw) {
            Ok(payload) => payload.pull_request.map(|pr| pr.number),
            Err(e) => {
                tracing::debug!("cannot parse event payload {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Sink for everything this action surfaces to the pipeline: verbatim
/// annotation lines, plain progress lines, the single structured output
/// slot and the terminal failure command.
pub trait Reporter {
    /// 原样转发注解行（已经是 workflow command 格式，不能再加工）
    fn annotation(&mut self, line: &str);
    fn info(&mut self, line: &str);
    fn set_output(&mut self, name: &str, value: &str);
    fn error(&mut self, message: &str);
}

/// Reporter backed by the real runner: stdout for lines, `GITHUB_OUTPUT`
/// for the structured slot.
#[derive(Debug, Default)]
pub struct WorkflowReporter;

impl WorkflowReporter {
    pub fn new() -> Self {
        Self
    }

    fn append_output(path: &str, name: &str, value: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        // 多行安全的 heredoc 形式，uuid 围栏避免与内容冲突
        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        writeln!(file, "{}<<{}", name, delimiter)?;
        writeln!(file, "{}", value)?;
        writeln!(file, "{}", delimiter)?;
        Ok(())
    }
}

impl Reporter for WorkflowReporter {
    fn annotation(&mut self, line: &str) {
        println!("{}", line);
    }

    fn info(&mut self, line: &str) {
        println!("{}", line);
    }

    fn set_output(&mut self, name: &str, value: &str) {
        match env::var("GITHUB_OUTPUT") {
            Ok(path) => {
                if let Err(e) = Self::append_output(&path, name, value) {
                    tracing::warn!("failed to write output {} to {}: {}", name, path, e);
                }
            }
            Err(_) => {
                tracing::warn!("GITHUB_OUTPUT is not set, output {} is dropped", name);
            }
        }
    }

    fn error(&mut self, message: &str) {
        println!("::error::{}", message);
    }
}
