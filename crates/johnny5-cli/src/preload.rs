//! # Preload Commands
//!
//! - `johnny5 run -- <cmd>` - run a command with the shim preloaded
//! - `johnny5 env` - print shell exports for `eval`

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use johnny5_config::{
    log_cli_debug, log_cli_info, log_preload_debug, PRELOAD_ENV, PRELOAD_SEPARATOR, PROJECT_DIR,
    SHIM_FILE_NAME,
};

/// Loader variable that makes macOS honour same-name overrides from an inserted library.
pub const FLAT_NAMESPACE_ENV: &str = "DYLD_FORCE_FLAT_NAMESPACE";

/// Environment a child needs for the shim to be loaded ahead of libc.
///
/// `existing` is the current value of the preload variable, kept after ours.
pub fn preload_env(library: &Path, existing: Option<&str>, flat_namespace: bool) -> Vec<(String, String)> {
    let library = library.to_string_lossy();
    let value = match existing.filter(|v| !v.trim().is_empty()) {
        Some(rest) => format!("{}{}{}", library, PRELOAD_SEPARATOR, rest),
        None => library.into_owned(),
    };
    log_preload_debug!("Prepending library", var = PRELOAD_ENV, value = value.as_str());

    let mut vars = vec![(PRELOAD_ENV.to_string(), value)];
    if cfg!(target_os = "macos") && flat_namespace {
        vars.push((FLAT_NAMESPACE_ENV.to_string(), "1".to_string()));
    }
    vars
}

/// Run `command` with the shim preloaded and return the child's exit code.
pub fn cmd_run(library: &Path, flat_namespace: bool, command: &[String]) -> Result<i32> {
    let (program, args) = command
        .split_first()
        .context("no command given; usage: johnny5 run -- <command> [args...]")?;

    let existing = env::var(PRELOAD_ENV).ok();
    let vars = preload_env(library, existing.as_deref(), flat_namespace);

    log_cli_info!("Spawning child", program = program.as_str());
    let status = Command::new(program)
        .args(args)
        .envs(vars)
        .status()
        .with_context(|| format!("failed to spawn {}", program))?;

    log_cli_debug!("Child exited", status = status.to_string().as_str());
    Ok(exit_code(status))
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// Generate shell script for `eval "$(johnny5 env)"`
pub fn cmd_env(library: &Path, flat_namespace: bool) -> Result<()> {
    let existing = env::var(PRELOAD_ENV).ok();
    println!("# johnny5 - uname interposer");
    for (key, value) in preload_env(library, existing.as_deref(), flat_namespace) {
        println!("export {}={}", key, shell_quote(&value));
    }
    Ok(())
}

/// Single-quote `value` for POSIX shells; embedded `'` becomes `'\''`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Places searched for the shim, in order, when no path is given.
pub fn candidate_paths(cwd: &Path, exe: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = vec![cwd.join(PROJECT_DIR).join(SHIM_FILE_NAME)];

    if let Some(exe_dir) = exe.and_then(Path::parent) {
        // Same directory as johnny5 binary
        candidates.push(exe_dir.join(SHIM_FILE_NAME));
        // ../lib/ relative to bin/
        if let Some(prefix) = exe_dir.parent() {
            candidates.push(prefix.join("lib").join(SHIM_FILE_NAME));
        }
    }

    // Cargo target directory (development mode)
    candidates.push(cwd.join("target/debug").join(SHIM_FILE_NAME));
    candidates.push(cwd.join("target/release").join(SHIM_FILE_NAME));
    candidates
}

/// Locate the shim: `explicit`, then `configured`, then [`candidate_paths`].
pub fn find_shim_library(explicit: Option<&Path>, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit.or(configured) {
        anyhow::ensure!(path.exists(), "shim library {} does not exist", path.display());
        return path.canonicalize().context("resolve shim path");
    }

    let cwd = env::current_dir().context("read current directory")?;
    let exe = env::current_exe().ok();
    for candidate in candidate_paths(&cwd, exe.as_deref()) {
        if candidate.exists() {
            return candidate.canonicalize().context("resolve shim path");
        }
    }

    anyhow::bail!(
        "Could not find {}. Please run 'cargo build -p johnny5-shim' first.",
        SHIM_FILE_NAME
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preload_env_without_existing_value() {
        let vars = preload_env(Path::new("/opt/lib/shim.so"), None, false);
        assert_eq!(vars, vec![(PRELOAD_ENV.to_string(), "/opt/lib/shim.so".to_string())]);
    }

    #[test]
    fn test_preload_env_keeps_existing_entries_after_ours() {
        let vars = preload_env(Path::new("/a/shim"), Some("/b/other"), false);
        assert_eq!(vars[0].1, format!("/a/shim{}/b/other", PRELOAD_SEPARATOR));

        let vars = preload_env(Path::new("/a/shim"), Some("  "), false);
        assert_eq!(vars[0].1, "/a/shim");
    }

    #[test]
    fn test_flat_namespace_only_on_macos() {
        let vars = preload_env(Path::new("/a/shim"), None, true);
        let has_flat = vars.iter().any(|(k, v)| k == FLAT_NAMESPACE_ENV && v == "1");
        assert_eq!(has_flat, cfg!(target_os = "macos"));
    }

    #[test]
    fn test_candidate_order() {
        let cwd = Path::new("/work");
        let exe = Path::new("/usr/local/bin/johnny5");
        let candidates = candidate_paths(cwd, Some(exe));
        assert_eq!(
            candidates,
            vec![
                cwd.join(".johnny5").join(SHIM_FILE_NAME),
                Path::new("/usr/local/bin").join(SHIM_FILE_NAME),
                Path::new("/usr/local/lib").join(SHIM_FILE_NAME),
                cwd.join("target/debug").join(SHIM_FILE_NAME),
                cwd.join("target/release").join(SHIM_FILE_NAME),
            ]
        );
    }

    #[test]
    fn test_explicit_library_must_exist() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join(SHIM_FILE_NAME);
        assert!(find_shim_library(Some(&missing), None).is_err());

        std::fs::write(&missing, b"").unwrap();
        let found = find_shim_library(None, Some(&missing)).unwrap();
        assert_eq!(found, missing.canonicalize().unwrap());
    }

    #[test]
    fn test_shell_quote_neutralises_metacharacters() {
        assert_eq!(shell_quote("/opt/lib/shim.so"), "'/opt/lib/shim.so'");
        assert_eq!(shell_quote("/a b/$HOME/`id`/\"q\""), "'/a b/$HOME/`id`/\"q\"'");
        assert_eq!(shell_quote("/it's/shim.so"), r"'/it'\''s/shim.so'");
    }

    #[test]
    fn test_shell_quote_round_trips_through_sh() {
        let value = "/tmp/it's $HOME `id` \"x\"/libjohnny5_shim.so";
        let output = Command::new("sh")
            .arg("-c")
            .arg(format!("printf %s {}", shell_quote(value)))
            .output()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), value);
    }

    #[test]
    fn test_run_requires_command() {
        assert!(cmd_run(Path::new("/nonexistent"), false, &[]).is_err());
    }
}
