//! Merges caller-declared golangci-lint flags with the overrides this action
//! must control, and rejects combinations that cannot be reconciled.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::infrastructure::error::ActionError;

// 大小写不敏感地剥掉用户声明的所有 --out-format=... 出现
static OUT_FORMAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)--out-format=\S*").unwrap());

/// Output formats this action always forces, in this order. The first drives
/// the annotation lines, the second the structured result line.
pub const FORCED_OUT_FORMATS: [&str; 2] = ["github-actions", "json"];

/// Differential-filter flags the caller may not combine with an
/// action-produced patch.
const DIFF_FLAGS: [&str; 3] = ["new", "new-from-rev", "new-from-patch"];

/// Normalized `(name, value)` pair parsed out of the raw args string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFlag {
    pub name: String,
    pub value: String,
}

/// Parse dash-prefixed tokens out of a raw flag string. Names are
/// lower-cased with leading dashes stripped; boolean-style flags get an
/// empty value. Bare positional tokens are not flags and are left alone.
pub fn parse_flags(raw: &str) -> Vec<ParsedFlag> {
    raw.split_whitespace()
        .filter(|token| token.starts_with('-'))
        .map(|token| {
            let stripped = token.trim_start_matches('-');
            match stripped.split_once('=') {
                Some((name, value)) => ParsedFlag {
                    name: name.to_lowercase(),
                    value: value.to_string(),
                },
                None => ParsedFlag {
                    name: stripped.to_lowercase(),
                    value: String::new(),
                },
            }
        })
        .collect()
}

/// The fully planned `run` invocation: argument tokens in their final order
/// plus the directory the process must execute in.
#[derive(Debug, Clone)]
pub struct PlannedInvocation {
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
}

/// Build the invocation from the caller's raw args, the resolved patch path
/// (empty sentinel = no differential filter) and the declared working
/// directory. Mandatory overrides come first so that any same-named caller
/// flag that survives in the residual would win in the tool's own parser;
/// the differential flags are the one family that is rejected instead.
pub fn plan_invocation(
    raw_args: &str,
    patch_path: &str,
    working_directory: Option<&str>,
) -> Result<PlannedInvocation, ActionError> {
    let flags = parse_flags(raw_args);

    let mut args = vec![format!("--out-format={}", merged_out_formats(&flags))];

    if !patch_path.is_empty() {
        if let Some(conflict) = flags
            .iter()
            .find(|flag| DIFF_FLAGS.contains(&flag.name.as_str()))
        {
            return Err(ActionError::config(format!(
                "the action is configured to fetch the pull request patch itself, \
                 remove --{} from args",
                conflict.name
            )));
        }
        args.push(format!("--new-from-patch={}", patch_path));
        // 覆盖 .golangci.yml 里可能存在的差异过滤配置
        args.push("--new=false".to_string());
        args.push("--new-from-rev=".to_string());
    }

    let mut exec_dir = None;
    if let Some(dir) = working_directory {
        let path = Path::new(dir);
        if !path.is_dir() {
            return Err(ActionError::config(format!(
                "working-directory \"{}\" does not exist or is not a directory",
                dir
            )));
        }
        if !flags.iter().any(|flag| flag.name == "path-prefix") {
            // 让报告的文件路径仍然相对仓库根目录
            args.push(format!("--path-prefix={}", dir));
        }
        let resolved = std::fs::canonicalize(path).map_err(|e| {
            ActionError::config(format!("cannot resolve working-directory \"{}\": {}", dir, e))
        })?;
        exec_dir = Some(resolved);
    }

    let residual = OUT_FORMAT_RE.replace_all(raw_args, "");
    args.extend(residual.split_whitespace().map(String::from));

    Ok(PlannedInvocation {
        args,
        working_directory: exec_dir,
    })
}

/// User-declared custom formats (minus anything matching the forced ones)
/// followed by the forced formats in fixed order.
fn merged_out_formats(flags: &[ParsedFlag]) -> String {
    let mut formats: Vec<String> = flags
        .iter()
        .find(|flag| flag.name == "out-format")
        .map(|flag| {
            flag.value
                .split(',')
                .filter(|entry| !entry.is_empty())
                .filter(|entry| !FORCED_OUT_FORMATS.iter().any(|forced| entry.starts_with(forced)))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    formats.extend(FORCED_OUT_FORMATS.iter().map(|forced| forced.to_string()));
    formats.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_names_and_values() {
        let flags = parse_flags("--Timeout=5m -v ./pkg/... --new-from-rev=HEAD~1");
        assert_eq!(
            flags,
            vec![
                ParsedFlag {
                    name: "timeout".to_string(),
                    value: "5m".to_string()
                },
                ParsedFlag {
                    name: "v".to_string(),
                    value: String::new()
                },
                ParsedFlag {
                    name: "new-from-rev".to_string(),
                    value: "HEAD~1".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_positional_tokens_stay_in_residual() {
        let plan = plan_invocation("run-me ./cmd/...", "", None).unwrap();
        assert_eq!(
            plan.args,
            vec![
                "--out-format=github-actions,json".to_string(),
                "run-me".to_string(),
                "./cmd/...".to_string(),
            ]
        );
        assert!(plan.working_directory.is_none());
    }

    #[test]
    fn test_mandatory_overrides_come_first() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan_invocation(
            "--timeout=5m",
            "/tmp/pull.patch",
            Some(dir.path().to_str().unwrap()),
        )
        .unwrap();

        assert_eq!(plan.args[0], "--out-format=github-actions,json");
        assert_eq!(plan.args[1], "--new-from-patch=/tmp/pull.patch");
        assert_eq!(plan.args[2], "--new=false");
        assert_eq!(plan.args[3], "--new-from-rev=");
        assert!(plan.args[4].starts_with("--path-prefix="));
        assert_eq!(plan.args[5], "--timeout=5m");
        assert_eq!(
            plan.working_directory.as_deref(),
            Some(dir.path().canonicalize().unwrap().as_path())
        );
    }

    #[test]
    fn test_declared_path_prefix_is_not_overridden() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan_invocation(
            "--path-prefix=custom",
            "",
            Some(dir.path().to_str().unwrap()),
        )
        .unwrap();
        let prefixes: Vec<_> = plan
            .args
            .iter()
            .filter(|arg| arg.starts_with("--path-prefix="))
            .collect();
        assert_eq!(prefixes, vec![&"--path-prefix=custom".to_string()]);
    }
}
