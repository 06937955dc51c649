use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use ctrld_sync::{ProfileOutcome, RunReport};

const OK: &str = "✅";
const FAILED: &str = "❌";

/// Format an integer with comma thousands separators.
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn icon(success: bool) -> &'static str {
    if success { OK } else { FAILED }
}

/// Render the run as a markdown job summary.
pub fn render_markdown(report: &RunReport) -> String {
    let mut out = String::new();
    let total = report.profiles.len();

    let _ = writeln!(out, "## Control D × Hagezi Sync\n");
    if report.all_succeeded() {
        let _ = writeln!(out, "> {OK} All {total} profile(s) synced successfully\n");
    } else {
        let _ = writeln!(out, "> {FAILED} {}/{total} profile(s) failed\n", report.failed());
    }

    for profile in &report.profiles {
        render_profile(&mut out, profile);
    }
    out
}

fn render_profile(out: &mut String, profile: &ProfileOutcome) {
    let _ = writeln!(
        out,
        "### {} Profile `{}`\n",
        icon(profile.success),
        profile.profile_id
    );
    let _ = writeln!(out, "| Folder | Rules Pushed | Duplicates Skipped | Status |");
    let _ = writeln!(out, "|--------|--------------|--------------------|--------|");

    for folder in &profile.folders {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            folder.name,
            format_number(folder.rules_pushed),
            format_number(folder.duplicates_skipped),
            icon(folder.success)
        );
    }

    let _ = writeln!(
        out,
        "| **Total** | **{}** | **{}** | |\n",
        format_number(profile.total_pushed()),
        format_number(profile.total_duplicates())
    );
}

/// Append the markdown summary to `path`, creating it if needed.
pub fn append_markdown(path: &Path, report: &RunReport) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open summary file {}", path.display()))?;

    file.write_all(render_markdown(report).as_bytes())
        .with_context(|| format!("could not write summary file {}", path.display()))
}

/// Write the full report as JSON.
pub fn write_json(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("could not write report to {}", path.display()))
}

/// Print a plain-text table of every profile to stdout.
pub fn print_summary(report: &RunReport) {
    let name_width = report
        .profiles
        .iter()
        .flat_map(|p| p.folders.iter().map(|f| f.name.chars().count()))
        .max()
        .unwrap_or(0)
        .max("Folder".len());

    for profile in &report.profiles {
        println!(
            "Profile {} [{}]",
            profile.profile_id,
            if profile.success { "ok" } else { "FAILED" }
        );
        if profile.folders.is_empty() {
            println!("  (aborted at {:?})", profile.stage);
            continue;
        }

        println!(
            "  {:<name_width$}  {:>12}  {:>10}  Status",
            "Folder", "Rules Pushed", "Duplicates"
        );
        for folder in &profile.folders {
            println!(
                "  {:<name_width$}  {:>12}  {:>10}  {}",
                folder.name,
                format_number(folder.rules_pushed),
                format_number(folder.duplicates_skipped),
                if folder.success { "ok" } else { "FAILED" }
            );
        }
    }

    println!(
        "\n{}/{} profiles synced successfully",
        report.succeeded,
        report.profiles.len()
    );
}
