use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    clap::Subcommand,
    tollgate_config::{Severity, default_config_template, validate},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Write a documented config template.
    Init {
        /// Destination (defaults to ./tollgate.toml).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved configuration (file + environment), secrets redacted.
    Show,
}

pub async fn handle_config(config_path: Option<&Path>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(config_path, verbose),
        ConfigAction::Init { path, force } => init(path, force),
        ConfigAction::Show => show(config_path),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let result = validate(config_path);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        anyhow::bail!("config has {errors} error(s)");
    }

    Ok(())
}

fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from("tollgate.toml"));
    write_template(&path, force)?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

fn write_template(path: &Path, force: bool) -> Result<()> {
    anyhow::ensure!(
        force || !path.exists(),
        "{} already exists (use --force to overwrite)",
        path.display()
    );
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, default_config_template())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn show(config_path: Option<&Path>) -> Result<()> {
    let mut config = tollgate_config::load(config_path)?;
    let redacted = || Some(secrecy::Secret::new("[REDACTED]".to_string()));
    if config.auth.client_secret.is_some() {
        config.auth.client_secret = redacted();
    }
    if config.auth.access_token.is_some() {
        config.auth.access_token = redacted();
    }
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tollgate.toml");

        write_template(&path, false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[server]"));

        let err = write_template(&path, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        write_template(&path, true).unwrap();
    }

    #[test]
    fn written_template_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.toml");
        write_template(&path, false).unwrap();
        let result = validate(Some(&path));
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
    }

    #[test]
    fn check_with_errors_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.toml");
        std::fs::write(&path, "[server]\ntimeout_secs = 0\n").unwrap();
        let err = check(Some(&path), false).unwrap_err();
        assert!(err.to_string().starts_with("config has "), "{err}");
    }
}
