//! Acquires the golangci-lint binary according to the configured install
//! mode and hands back its filesystem path. This is the one preparation
//! task that is allowed to fail the run: nothing works without a binary.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{Config, InstallMode};
use crate::github::GithubClient;
use crate::infrastructure::error::ActionError;
use crate::infrastructure::network::{NetworkConfig, NetworkManager};

const TOOL_NAME: &str = "golangci-lint";
const RELEASE_OWNER: &str = "golangci";
const RELEASE_REPO: &str = "golangci-lint";
const MODULE_PATH: &str = "github.com/golangci/golangci-lint/cmd/golangci-lint";

pub async fn install_tool(config: &Config, client: &GithubClient) -> Result<PathBuf, ActionError> {
    let started = Instant::now();
    let path = match config.install_mode {
        InstallMode::None => find_in_path(TOOL_NAME)?,
        InstallMode::GoInstall => go_install(config, client).await?,
        InstallMode::Binary => install_binary(config, client).await?,
    };
    info!(
        "prepared {} at {} in {:.2?}",
        TOOL_NAME,
        path.display(),
        started.elapsed()
    );
    Ok(path)
}

fn find_in_path(name: &str) -> Result<PathBuf, ActionError> {
    env::var_os("PATH")
        .map(|path| env::split_paths(&path).map(|dir| dir.join(name)).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            ActionError::install(format!(
                "{} not found on PATH while install-mode is \"none\"",
                name
            ))
        })
}

/// 把配置里的版本解析成 release tag，latest 走 API
async fn resolve_tag(config: &Config, client: &GithubClient) -> Result<String, ActionError> {
    if config.version == "latest" {
        let tag = client.latest_release(RELEASE_OWNER, RELEASE_REPO).await?;
        info!("resolved latest release to {}", tag);
        Ok(tag)
    } else {
        Ok(normalize_tag(&config.version))
    }
}

fn normalize_tag(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}

async fn go_install(config: &Config, client: &GithubClient) -> Result<PathBuf, ActionError> {
    let tag = resolve_tag(config, client).await?;
    let module = format!("{}@{}", MODULE_PATH, tag);

    info!("go install {}", module);
    let output = Command::new("go")
        .args(["install", &module])
        .output()
        .await
        .map_err(|e| ActionError::install(format!("cannot run go: {}", e)))?;
    if !output.status.success() {
        return Err(ActionError::install(format!(
            "go install {} failed: {}",
            module,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let gopath = Command::new("go")
        .args(["env", "GOPATH"])
        .output()
        .await
        .map_err(|e| ActionError::install(format!("cannot run go env: {}", e)))?;
    if !gopath.status.success() {
        return Err(ActionError::install("go env GOPATH failed".to_string()));
    }
    let gopath = String::from_utf8_lossy(&gopath.stdout).trim().to_string();
    if gopath.is_empty() {
        return Err(ActionError::install("go env GOPATH returned nothing".to_string()));
    }

    Ok(PathBuf::from(gopath).join("bin").join(TOOL_NAME))
}

async fn install_binary(config: &Config, client: &GithubClient) -> Result<PathBuf, ActionError> {
    let tag = resolve_tag(config, client).await?;
    let version = tag.trim_start_matches('v');

    let install_dir = install_root().join(TOOL_NAME).join(version);
    let binary = install_dir.join(TOOL_NAME);
    if binary.is_file() {
        // 同版本已经装过（长生命周期 runner），跳过下载
        info!("reusing previously installed {} {}", TOOL_NAME, tag);
        return Ok(binary);
    }

    let (os, arch) = release_platform()?;
    let asset = asset_name(version, os, arch);
    let base = format!(
        "https://github.com/{}/{}/releases/download/{}",
        RELEASE_OWNER, RELEASE_REPO, tag
    );
    let network = NetworkManager::new(NetworkConfig::for_downloads())?;

    let scratch = env::temp_dir().join(format!("lint-action-install-{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&scratch).await.map_err(|e| {
        ActionError::filesystem(
            format!("cannot create scratch directory: {}", e),
            Some(scratch.display().to_string()),
        )
    })?;
    let archive = scratch.join(&asset);

    let digest = download(&network, &format!("{}/{}", base, asset), &archive).await?;

    let checksums_url = format!("{}/{}-{}-checksums.txt", base, TOOL_NAME, version);
    let checksums = network.get_with_retry(&checksums_url, &[]).await?;
    let checksums = checksums.text().await.map_err(|e| {
        ActionError::network(format!("cannot read checksums: {}", e), Some(checksums_url))
    })?;
    let expected = parse_checksum(&checksums, &asset).ok_or_else(|| {
        ActionError::install(format!("no checksum entry for {}", asset))
    })?;
    if digest != expected {
        return Err(ActionError::install(format!(
            "checksum mismatch for {}: expected {}, got {}",
            asset, expected, digest
        )));
    }
    debug!("checksum verified for {}", asset);

    tokio::fs::create_dir_all(&install_dir).await.map_err(|e| {
        ActionError::filesystem(
            format!("cannot create install directory: {}", e),
            Some(install_dir.display().to_string()),
        )
    })?;
    let extracted = Command::new("tar")
        .arg("-xzf")
        .arg(&archive)
        .arg("-C")
        .arg(&install_dir)
        .arg("--strip-components=1")
        .output()
        .await
        .map_err(|e| ActionError::install(format!("cannot run tar: {}", e)))?;
    if !extracted.status.success() {
        return Err(ActionError::install(format!(
            "extracting {} failed: {}",
            asset,
            String::from_utf8_lossy(&extracted.stderr).trim()
        )));
    }

    if !binary.is_file() {
        return Err(ActionError::install(format!(
            "archive {} did not contain {}",
            asset, TOOL_NAME
        )));
    }
    Ok(binary)
}

/// Stream the archive to disk while hashing it, returning the hex digest.
async fn download(
    network: &NetworkManager,
    url: &str,
    dest: &Path,
) -> Result<String, ActionError> {
    info!("downloading {}", url);
    let response = network.get_with_retry(url, &[]).await?;

    let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
        ActionError::filesystem(
            format!("cannot create archive file: {}", e),
            Some(dest.display().to_string()),
        )
    })?;
    let mut hasher = Sha256::new();
    let mut stream = response.bytes_stream();
    while let Some(item) = stream.next().await {
        let chunk = item.map_err(|e| {
            ActionError::network(format!("download interrupted: {}", e), Some(url.to_string()))
        })?;
        hasher.update(&chunk);
        file.write_all(&chunk).await.map_err(|e| {
            ActionError::filesystem(
                format!("cannot write archive: {}", e),
                Some(dest.display().to_string()),
            )
        })?;
    }
    file.flush().await.map_err(|e| {
        ActionError::filesystem(
            format!("cannot flush archive: {}", e),
            Some(dest.display().to_string()),
        )
    })?;

    Ok(format!("{:x}", hasher.finalize()))
}

fn asset_name(version: &str, os: &str, arch: &str) -> String {
    format!("{}-{}-{}-{}.tar.gz", TOOL_NAME, version, os, arch)
}

/// checksums.txt 每行是 "<hex>  <file>"，部分工具会带 "*" 前缀
fn parse_checksum(body: &str, asset: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(hash), Some(name)) if name.trim_start_matches('*') == asset => {
                Some(hash.to_lowercase())
            }
            _ => None,
        }
    })
}

fn release_platform() -> Result<(&'static str, &'static str), ActionError> {
    let os = match env::consts::OS {
        "linux" => "linux",
        "macos" => "darwin",
        other => {
            return Err(ActionError::install(format!(
                "no prebuilt archive for \"{}\", use install-mode \"goinstall\" instead",
                other
            )))
        }
    };
    let arch = match env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => {
            return Err(ActionError::install(format!(
                "no prebuilt archive for \"{}\", use install-mode \"goinstall\" instead",
                other
            )))
        }
    };
    Ok((os, arch))
}

fn install_root() -> PathBuf {
    if let Some(root) = env::var_os("RUNNER_TOOL_CACHE") {
        return PathBuf::from(root);
    }
    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".cache").join("lint-action");
    }
    env::temp_dir().join("lint-action-tools")
}
