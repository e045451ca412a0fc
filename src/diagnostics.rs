//! System diagnostics and dependency checking.
//!
//! Verifies that the external audio tools are installed and runnable.

use crate::config::Config;
use crate::error::BookcastError;
use crate::exec::CommandExecutor;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool is installed and working, with its version line
    Ok(String),
    /// Tool is not found
    NotFound,
    /// Tool is found but failed to report its version
    Warning(String),
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, CheckResult::Ok(_))
    }
}

/// Runs `<tool> -version` and keeps the first line of its banner.
pub fn check_tool(executor: &dyn CommandExecutor, tool: &str) -> CheckResult {
    match executor.execute(tool, &["-version"]) {
        Ok(output) => {
            let banner = output.stdout.lines().next().unwrap_or("").trim().to_string();
            CheckResult::Ok(banner)
        }
        Err(BookcastError::ToolNotFound { .. }) => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(e.to_string()),
    }
}

/// Checks every tool the configuration names.
pub fn check_dependencies(
    executor: &dyn CommandExecutor,
    config: &Config,
) -> Vec<(String, CheckResult)> {
    [&config.tools.ffmpeg, &config.tools.ffprobe]
        .into_iter()
        .map(|tool| (tool.clone(), check_tool(executor, tool)))
        .collect()
}

/// Prints the results of [`check_dependencies`]; returns whether all passed.
pub fn print_report(results: &[(String, CheckResult)]) -> bool {
    println!("Checking system dependencies...\n");
    for (tool, result) in results {
        print!("{tool}: ");
        match result {
            CheckResult::Ok(banner) if banner.is_empty() => println!("✓ OK"),
            CheckResult::Ok(banner) => println!("✓ OK ({banner})"),
            CheckResult::NotFound => {
                println!("✗ NOT FOUND");
                println!("  Install: sudo apt install ffmpeg  (Debian/Ubuntu)");
                println!("           sudo pacman -S ffmpeg    (Arch)");
                println!("           brew install ffmpeg      (macOS)");
            }
            CheckResult::Warning(msg) => println!("⚠ WARNING: {msg}"),
        }
    }
    results.iter().all(|(_, result)| result.is_ok())
}
