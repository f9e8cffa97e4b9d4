use amplify_metrics::Report;
use anyhow::{Context as AnyhowContext, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DATA_FILE: &str = "data.js";
pub const INDEX_FILE: &str = "index.html";
pub const DATA_VARIABLE: &str = "AMPLIFY_DATA";

static CACHE_BUST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"data\.js\?v=[A-Za-z0-9._-]*").expect("valid cache-bust pattern")
});

pub fn render_data_file(report: &Report) -> Result<String> {
    let json = report.to_json_pretty().context("Failed to serialize report")?;
    Ok(format!(
        "// Auto-generated by amplify-update on {}\n\
         // Do not edit manually. Run: amplify-update\n\n\
         const {DATA_VARIABLE} = {json};\n",
        report.last_updated
    ))
}

/// Writes `data.js` through a temp sibling so readers never see a partial file.
pub fn write_data_file(site_dir: &Path, report: &Report) -> Result<PathBuf> {
    fs::create_dir_all(site_dir)
        .with_context(|| format!("Failed to create {}", site_dir.display()))?;
    let path = site_dir.join(DATA_FILE);
    let tmp_path = temp_path_for(&path);
    fs::write(&tmp_path, render_data_file(report)?)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path).with_context(|| {
        format!(
            "Failed to move {} to {}",
            tmp_path.display(),
            path.display()
        )
    })?;
    Ok(path)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    PathBuf::from(format!("{}.{}.tmp", path.display(), ts))
}

/// Rewrites every `data.js?v=...` reference in `index.html` to `token`.
/// Returns whether the page changed; a missing page is skipped.
pub fn bust_cache(site_dir: &Path, token: &str) -> Result<bool> {
    let path = site_dir.join(INDEX_FILE);
    if !path.exists() {
        log::warn!("{} not found, skipping cache-bust", path.display());
        return Ok(false);
    }
    let html =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let updated = rewrite_cache_token(&html, token);
    if updated == html {
        return Ok(false);
    }
    fs::write(&path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

pub fn rewrite_cache_token(html: &str, token: &str) -> String {
    let replacement = format!("{DATA_FILE}?v={token}");
    CACHE_BUST
        .replace_all(html, regex::NoExpand(&replacement))
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Pushed,
    NothingToCommit,
}

/// Commits the generated files and pushes to the configured remote.
pub fn publish(site_dir: &Path, last_updated: &str) -> Result<PublishOutcome> {
    let mut add_args = vec!["add"];
    add_args.extend(staged_files(site_dir));
    let add = git(site_dir, &add_args)?;
    ensure_success("git add", &add)?;

    let message = format!("Auto-update from Streak ({last_updated})");
    let commit = git(site_dir, &["commit", "-m", &message])?;
    if is_nothing_to_commit(&commit) {
        return Ok(PublishOutcome::NothingToCommit);
    }
    ensure_success("git commit", &commit)?;

    let push = git(site_dir, &["push"])?;
    ensure_success("git push", &push)?;
    Ok(PublishOutcome::Pushed)
}

/// Generated files present in the site directory; a missing `index.html` is not staged.
fn staged_files(site_dir: &Path) -> Vec<&'static str> {
    [DATA_FILE, INDEX_FILE]
        .into_iter()
        .filter(|name| site_dir.join(name).exists())
        .collect()
}

fn git(site_dir: &Path, args: &[&str]) -> Result<Output> {
    log::debug!("git {}", args.join(" "));
    Command::new("git")
        .arg("-C")
        .arg(site_dir)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run git {}", args.first().unwrap_or(&"")))
}

fn ensure_success(step: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    anyhow::bail!(
        "{step} failed: {}",
        String::from_utf8_lossy(&output.stderr).trim()
    )
}

fn is_nothing_to_commit(output: &Output) -> bool {
    let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).contains("nothing to commit");
    text(&output.stdout) || text(&output.stderr)
}
