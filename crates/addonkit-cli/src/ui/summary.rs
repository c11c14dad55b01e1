//! End-of-pass summary.

use addonkit_core::PassReport;
use addonkit_core::engine::DisableReason;
use crossterm::style::Stylize;

use super::output::Output;

pub fn print_pass(output: &Output, report: &PassReport) {
    if output.is_quiet() {
        return;
    }
    let theme = output.theme();

    for change in &report.switched {
        let from = change.from.as_deref().unwrap_or("-");
        println!(
            "  {} {} → {}",
            change.name.as_str().with(theme.colors.addon_name),
            from.with(theme.colors.secondary),
            change.to.as_str().with(theme.colors.version)
        );
    }

    for (name, reason) in &report.disabled {
        let why = match reason {
            DisableReason::Incompatible => "no compatible version",
            DisableReason::RemovedFromCatalog => "removed from catalog",
        };
        println!(
            "  {} {} disabled ({why})",
            theme.icons.warning.with(theme.colors.warning),
            name.as_str().with(theme.colors.addon_name)
        );
    }

    for name in &report.held {
        println!(
            "  {} {} held (malformed catalog entry)",
            theme.icons.warning.with(theme.colors.warning),
            name.as_str().with(theme.colors.addon_name)
        );
    }

    let line = format!(
        "  {} new, {} switched, {} installed, {} removed",
        report.added.len(),
        report.switched.len(),
        report.installed.len(),
        report.removed.len()
    );
    println!();
    println!("{}", line.with(theme.colors.secondary));

    if !report.failures.is_empty() {
        println!(
            "  {} {} failure(s); they will be retried on the next sync",
            theme.icons.error.with(theme.colors.error),
            report.failures.len()
        );
    }
}
