//! # Terminal Output
//!
//! Everything `herder` prints goes through this module: project headings,
//! result markers, the pre-flight status table, progress bars and the batch
//! summary. The engine itself never prints.
//!
//! Color and emoji use one switch. `--color` picks `always`, `never` or
//! `auto`; in `auto` mode the usual conventions apply, checked in order:
//!
//! | variable         | effect                              |
//! |------------------|-------------------------------------|
//! | `NO_COLOR`       | set to anything: plain output       |
//! | `CLICOLOR=0`     | plain output                        |
//! | `CLICOLOR_FORCE` | non-zero: color even without a TTY  |
//! | `TERM=dumb`      | plain output                        |
//!
//! Otherwise color follows whether stdout is a capable terminal.
//!
//! ```rust,ignore
//! use herder::output::{emoji, OutputConfig};
//!
//! let out = OutputConfig::for_flag("auto");
//! println!("{} herding", emoji(&out, "🐑", "[HERD]"));
//! ```

use std::env;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::engine::Outcome;
use crate::error::Result;
use crate::manifest::ResolvedProject;
use crate::scheduler::BatchReport;

/// Whether to decorate output with color and emoji.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` flag. Unknown values behave like `auto`.
    ///
    /// Also switches the `console` crate's global styling on or off, so
    /// progress bars agree with the rest of the output.
    pub fn for_flag(color_flag: &str) -> Self {
        let use_color = if color_flag.eq_ignore_ascii_case("always") {
            true
        } else if color_flag.eq_ignore_ascii_case("never") {
            false
        } else {
            terminal_wants_color()
        };
        console::set_colors_enabled(use_color);
        Self { use_color }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { use_color: false }
    }

    #[cfg(test)]
    pub fn colored() -> Self {
        Self { use_color: true }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::for_flag("auto")
    }
}

fn env_is(name: &str, pred: impl Fn(&str) -> bool) -> bool {
    env::var(name).map(|v| pred(&v)).unwrap_or(false)
}

/// `auto` mode: environment conventions first, then the terminal itself.
fn terminal_wants_color() -> bool {
    if env::var_os("NO_COLOR").is_some() || env_is("CLICOLOR", |v| v == "0") {
        return false;
    }
    if env_is("CLICOLOR_FORCE", |v| !v.is_empty() && v != "0") {
        return true;
    }
    if env_is("TERM", |v| v == "dumb") {
        return false;
    }
    console::Term::stdout().features().colors_supported()
}

/// `fancy` when decorating output, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, fancy: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        fancy
    } else {
        plain
    }
}

/// `name (path)` heading printed above a project's result.
pub fn project_header(config: &OutputConfig, project: &ResolvedProject) -> String {
    let path = project.path.display().to_string();
    let location = if path == project.name {
        String::new()
    } else {
        format!(" ({})", path)
    };
    if config.use_color {
        format!("{}{}", style(&project.name).bold().cyan(), style(location).dim())
    } else {
        format!("{}{}", project.name, location)
    }
}

/// One result line: a status marker followed by the outcome or error text.
pub fn result_line(config: &OutputConfig, result: &Result<Outcome>) -> String {
    match result {
        Ok(Outcome::Changed(message)) => format!("{} {}", emoji(config, "✅", "[OK]"), message),
        Ok(Outcome::Unchanged(message)) => format!("{} {}", emoji(config, "✔️", "[--]"), message),
        Ok(Outcome::Skipped(message)) => format!("{} {}", emoji(config, "⏭️", "[SKIP]"), message),
        Err(e) => format!("{} {}", emoji(config, "❌", "[ERR]"), e),
    }
}

/// Print a project's heading and result, as sequential runs do.
pub fn print_result(config: &OutputConfig, project: &ResolvedProject, result: &Result<Outcome>) {
    println!("{}", project_header(config, project));
    println!("   {}", result_line(config, result));
}

/// The consolidated status printed before a parallel run.
pub fn print_preflight(config: &OutputConfig, statuses: &[(String, String)]) {
    println!("{} Current state:", emoji(config, "📋", "[STATUS]"));
    let width = statuses.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    for (name, status) in statuses {
        println!("   {:width$}  {}", name, status, width = width);
    }
    println!();
}

/// Progress bar for a parallel run over `len` projects.
pub fn progress_bar(config: &OutputConfig, len: usize, verb: &str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    let template = if config.use_color {
        "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}"
    } else {
        "{msg} [{bar:40}] {pos}/{len}"
    };
    let bar_style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    bar.set_style(bar_style);
    bar.set_message(verb.to_string());
    bar
}

/// Summary printed after every batch; failures are listed individually.
pub fn print_report(config: &OutputConfig, operation: &str, report: &BatchReport) {
    println!();
    if report.is_success() {
        println!(
            "{} {}: {} succeeded ({} changed), {} skipped",
            emoji(config, "🎉", "[DONE]"),
            operation,
            report.succeeded.len(),
            report.changed(),
            report.skipped.len()
        );
    } else {
        println!(
            "{} {}: {} succeeded, {} failed, {} skipped",
            emoji(config, "⚠️", "[WARN]"),
            operation,
            report.succeeded.len(),
            report.failed.len(),
            report.skipped.len()
        );
        for (name, error) in &report.failed {
            println!("   {} {}: {}", emoji(config, "❌", "[ERR]"), name, error);
        }
    }
    if report.not_started > 0 {
        println!(
            "   {} project(s) not started after the first failure",
            report.not_started
        );
    }
}
