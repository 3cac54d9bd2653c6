//! Decides whether a differential-analysis patch applies to this run and
//! materializes it on disk. Differential filtering is a convenience: every
//! failure on this path degrades to full-repository analysis instead of
//! failing the run.

use std::env;
use std::path::PathBuf;

use tracing::{info, warn};
use uuid::Uuid;

use crate::actions::ActionContext;
use crate::config::Config;
use crate::github::DiffSource;
use crate::infrastructure::error::ActionError;

const PATCH_FILE_NAME: &str = "pull.patch";
const PULL_REQUEST_EVENTS: [&str; 2] = ["pull_request", "pull_request_target"];

/// Resolve the patch path for this run. Returns the empty sentinel whenever
/// differential filtering is off or cannot be prepared.
pub async fn resolve_patch(
    config: &Config,
    ctx: &ActionContext,
    source: &dyn DiffSource,
) -> String {
    if !config.only_new_issues {
        return String::new();
    }

    if !PULL_REQUEST_EVENTS.contains(&ctx.event_name.as_str()) {
        info!(
            "only-new-issues is enabled but the event is \"{}\", analyzing the whole repository",
            ctx.event_name
        );
        return String::new();
    }

    let (repo, number) = match (&ctx.repository, ctx.pull_number) {
        (Some(repo), Some(number)) => (repo, number),
        _ => {
            warn!("only-new-issues is enabled but the event carries no pull request metadata");
            return String::new();
        }
    };

    let diff = match source
        .pull_request_diff(&repo.owner, &repo.name, number)
        .await
    {
        Ok(diff) => diff,
        Err(e) => {
            warn!("cannot fetch pull request patch, analyzing the whole repository: {}", e);
            return String::new();
        }
    };

    let normalized = normalize_patch(&diff, config.working_directory.as_deref());

    match write_patch(&normalized).await {
        Ok(path) => {
            info!("pull request patch written to {}", path.display());
            path.to_string_lossy().into_owned()
        }
        Err(e) => {
            warn!("cannot persist pull request patch, analyzing the whole repository: {}", e);
            String::new()
        }
    }
}

/// Rewrite diff paths so they are relative to the configured working
/// directory; golangci-lint resolves patch paths against its own cwd.
pub fn normalize_patch(diff: &str, working_directory: Option<&str>) -> String {
    let dir = match working_directory {
        Some(dir) => dir.trim_start_matches("./").trim_end_matches('/'),
        None => return diff.to_string(),
    };
    if dir.is_empty() {
        return diff.to_string();
    }

    let a_prefixed = format!("a/{}/", dir);
    let b_prefixed = format!("b/{}/", dir);

    let mut normalized: String = diff
        .lines()
        .map(|line| {
            if line.starts_with("diff --git ")
                || line.starts_with("--- ")
                || line.starts_with("+++ ")
            {
                line.replace(&a_prefixed, "a/").replace(&b_prefixed, "b/")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    if diff.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

async fn write_patch(content: &str) -> Result<PathBuf, ActionError> {
    // 每次运行一个独立的 scratch 目录，固定文件名
    let scratch = env::temp_dir().join(format!("lint-action-{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&scratch).await.map_err(|e| {
        ActionError::filesystem(
            format!("cannot create scratch directory: {}", e),
            Some(scratch.display().to_string()),
        )
    })?;

    let path = scratch.join(PATCH_FILE_NAME);
    tokio::fs::write(&path, content).await.map_err(|e| {
        ActionError::filesystem(
            format!("cannot write patch file: {}", e),
            Some(path.display().to_string()),
        )
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::RepoSlug;
    use crate::config::InstallMode;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct StaticDiff(&'static str);

    #[async_trait]
    impl DiffSource for StaticDiff {
        async fn pull_request_diff(
            &self,
            _owner: &str,
            _repo: &str,
            _number: u64,
        ) -> Result<String, ActionError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingDiff;

    #[async_trait]
    impl DiffSource for FailingDiff {
        async fn pull_request_diff(
            &self,
            _owner: &str,
            _repo: &str,
            _number: u64,
        ) -> Result<String, ActionError> {
            Err(ActionError::network("connection reset", None))
        }
    }

    fn test_config(only_new_issues: bool) -> Config {
        Config {
            install_mode: InstallMode::Binary,
            version: "latest".to_string(),
            only_new_issues,
            github_token: String::new(),
            args: String::new(),
            working_directory: None,
            debug: HashSet::new(),
        }
    }

    fn pull_request_ctx() -> ActionContext {
        ActionContext {
            event_name: "pull_request".to_string(),
            repository: Some(RepoSlug {
                owner: "golangci".to_string(),
                name: "example".to_string(),
            }),
            pull_number: Some(7),
            api_url: "https://api.github.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_disabled_filter_returns_sentinel() {
        let patch = resolve_patch(&test_config(false), &pull_request_ctx(), &StaticDiff("x")).await;
        assert_eq!(patch, "");
    }

    #[tokio::test]
    async fn test_non_pull_request_event_returns_sentinel() {
        let mut ctx = pull_request_ctx();
        ctx.event_name = "push".to_string();
        let patch = resolve_patch(&test_config(true), &ctx, &StaticDiff("x")).await;
        assert_eq!(patch, "");
    }

    #[tokio::test]
    async fn test_missing_pull_metadata_returns_sentinel() {
        let mut ctx = pull_request_ctx();
        ctx.pull_number = None;
        let patch = resolve_patch(&test_config(true), &ctx, &StaticDiff("x")).await;
        assert_eq!(patch, "");
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_sentinel() {
        let patch = resolve_patch(&test_config(true), &pull_request_ctx(), &FailingDiff).await;
        assert_eq!(patch, "");
    }

    #[tokio::test]
    async fn test_successful_fetch_writes_patch_file() {
        let diff = "diff --git a/main.go b/main.go\n--- a/main.go\n+++ b/main.go\n@@ -1 +1 @@\n";
        let patch = resolve_patch(&test_config(true), &pull_request_ctx(), &StaticDiff(diff)).await;
        assert!(patch.ends_with("pull.patch"), "unexpected path {:?}", patch);
        let written = std::fs::read_to_string(&patch).unwrap();
        assert_eq!(written, diff);
    }

    #[test]
    fn test_normalize_without_working_directory_is_identity() {
        let diff = "diff --git a/x.go b/x.go\n--- a/x.go\n+++ b/x.go\n";
        assert_eq!(normalize_patch(diff, None), diff);
    }

    #[test]
    fn test_normalize_strips_working_directory_prefix() {
        let diff = "diff --git a/services/api/x.go b/services/api/x.go\n\
                    --- a/services/api/x.go\n\
                    +++ b/services/api/x.go\n\
                    @@ -1 +1 @@\n\
                    -old a/services/api/x.go\n";
        let normalized = normalize_patch(diff, Some("services/api"));
        assert!(normalized.starts_with("diff --git a/x.go b/x.go\n"));
        assert!(normalized.contains("\n--- a/x.go\n"));
        assert!(normalized.contains("\n+++ b/x.go\n"));
        // 补丁正文不能被触碰
        assert!(normalized.contains("-old a/services/api/x.go"));
    }
}
