//! Sequences one pipeline run: prepare the environment, plan the argument
//! list, invoke the tool and reconcile what it printed. The `post` phase is
//! a separate process lifetime that only persists the lint cache.

pub mod exec;
pub mod output;

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::actions::{ActionContext, Reporter};
use crate::cache::{self, CacheStore, FsCacheStore};
use crate::config::Config;
use crate::flags;
use crate::github::GithubClient;
use crate::infrastructure::error::ActionError;
use crate::install;
use crate::patch;

use self::exec::ExecOutcome;

/// The main action phase.
pub async fn run(reporter: &mut dyn Reporter) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let ctx = ActionContext::from_env();
    let client = GithubClient::new(&ctx.api_url, &config.github_token)?;
    let store = FsCacheStore::new(FsCacheStore::default_root());

    // 三个准备任务互不依赖，并发启动，结果在这里汇合
    let started = Instant::now();
    let (_, tool_path, patch_path) = tokio::join!(
        restore_cache(&store, &config),
        install::install_tool(&config, &client),
        patch::resolve_patch(&config, &ctx, &client),
    );
    let tool_path = tool_path?;
    info!("environment prepared in {:.2?}", started.elapsed());

    let plan =
        flags::plan_invocation(&config.args, &patch_path, config.working_directory.as_deref())?;

    if config.debug_enabled("cache") {
        cache_status(&tool_path, plan.working_directory.as_deref(), reporter).await;
    }

    let mut invocation = Vec::with_capacity(plan.args.len() + 1);
    invocation.push("run".to_string());
    invocation.extend(plan.args.iter().cloned());

    let outcome =
        exec::run_tool(&tool_path, &invocation, plan.working_directory.as_deref()).await?;
    output::reconcile_outcome(&outcome, reporter);

    match outcome {
        ExecOutcome::Success { .. } => {
            info!("no issues found");
            Ok(())
        }
        ExecOutcome::Failed { code: 1, .. } => Err(ActionError::IssuesFound.into()),
        ExecOutcome::Failed { code, .. } => Err(ActionError::ToolFailed { code }.into()),
    }
}

/// The finalize phase: persist the lint cache. Failures here are this
/// phase's own terminal failure and never retroactively affect the main
/// run's status.
pub async fn post() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let store = FsCacheStore::new(FsCacheStore::default_root());

    let src = cache::tool_cache_dir();
    if !src.is_dir() {
        info!("no lint cache at {}, nothing to save", src.display());
        return Ok(());
    }

    let key = cache::cache_key(&config.version);
    let started = Instant::now();
    store
        .save(&key, &src)
        .await
        .map_err(|e| ActionError::cache(format!("cannot save lint cache: {:#}", e)))?;
    info!("saved lint cache for key {} in {:.2?}", key, started.elapsed());
    Ok(())
}

async fn restore_cache(store: &dyn CacheStore, config: &Config) {
    let key = cache::cache_key(&config.version);
    let dest = cache::tool_cache_dir();
    match store.restore(&key, &dest).await {
        Ok(true) => info!("restored lint cache for key {}", key),
        Ok(false) => info!("no lint cache for key {}", key),
        Err(e) => warn!("cache restore failed, continuing without it: {}", e),
    }
}

/// Diagnostic sub-invocation under the `cache` debug topic. Its output is
/// reconciled like the main run's but it never affects run status.
async fn cache_status(tool: &Path, working_directory: Option<&Path>, reporter: &mut dyn Reporter) {
    let args = vec!["cache".to_string(), "status".to_string()];
    match exec::run_tool(tool, &args, working_directory).await {
        Ok(outcome) => {
            output::reconcile_outcome(&outcome, reporter);
            if let ExecOutcome::Failed { code, .. } = outcome {
                debug!("cache status exited with {}", code);
            }
        }
        Err(e) => debug!("cache status could not run: {}", e),
    }
}
