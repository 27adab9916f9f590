//! `courier check`: validate the configuration and the command and locale
//! directories without connecting to anything.

use {
    anyhow::{Result, bail},
    clap::ValueEnum,
    courier_commands::{CommandRegistry, LocaleBundle, load_commands},
    courier_config::{CourierConfig, Role, Severity, validate},
};

/// Process role to validate for.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CheckRole {
    Bridge,
    Worker,
    Standalone,
}

impl From<CheckRole> for Role {
    fn from(role: CheckRole) -> Self {
        match role {
            CheckRole::Bridge => Self::Bridge,
            CheckRole::Worker => Self::Worker,
            CheckRole::Standalone => Self::Standalone,
        }
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn check(config: &CourierConfig, role: CheckRole, verbose: bool) -> Result<()> {
    let result = validate(config, role.into());

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        shown += 1;
    }

    let mut errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    match load_commands(&config.commands.dir)
        .and_then(|d| CommandRegistry::build(d, config.commands.handler_set))
    {
        Ok(registry) => {
            if verbose {
                let names: Vec<_> = registry
                    .descriptors()
                    .iter()
                    .map(|d| d.name.as_str())
                    .collect();
                eprintln!("  {BOLD}{GREEN}ok{RESET} commands: {}", names.join(", "));
            }
        },
        Err(e) => {
            eprintln!("  {BOLD}{RED}error{RESET} commands: {e}");
            errors += 1;
            shown += 1;
        },
    }

    let locales = LocaleBundle::load(&config.locales.dir, config.locales.default_locale.clone());
    if locales.is_empty() {
        eprintln!(
            "  {BOLD}{CYAN}info{RESET} locales: none found in {}",
            config.locales.dir.display()
        );
        shown += 1;
    } else if verbose {
        eprintln!("  {BOLD}{GREEN}ok{RESET} locales: {} loaded", locales.len());
    }

    if shown > 0 {
        eprintln!();
    }
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        bail!("configuration check failed");
    }
    Ok(())
}
