//! Table rendering for `addonkit list`.

use addonkit_core::AddonState;
use chrono::{DateTime, Local};
use comfy_table::presets::NOTHING;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use super::theme::Theme;

/// State column of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    /// Derived against a freshly fetched catalog.
    Derived(AddonState),
    /// No catalog: only the stored flag is known.
    Stored { enabled: bool },
}

impl RowState {
    fn label(self) -> String {
        match self {
            Self::Derived(AddonState::Unknown) => "new".to_string(),
            Self::Derived(state) => state.to_string(),
            Self::Stored { enabled: true } => "enabled".to_string(),
            Self::Stored { enabled: false } => "disabled".to_string(),
        }
    }

    fn color(self) -> Color {
        match self {
            Self::Derived(AddonState::EnabledCompatible) | Self::Stored { enabled: true } => {
                Color::Green
            }
            Self::Derived(AddonState::EnabledNoVersion) => Color::Yellow,
            Self::Derived(AddonState::EnabledIncompatible | AddonState::Orphaned) => Color::Red,
            Self::Derived(AddonState::Disabled | AddonState::Unknown)
            | Self::Stored { enabled: false } => Color::DarkGrey,
        }
    }
}

/// Whether the artifact for the chosen version is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    Present { modified: Option<DateTime<Local>> },
    Missing,
    /// Disabled, or no version chosen.
    NotExpected,
}

#[derive(Debug, Clone)]
pub struct AddonRow {
    pub name: String,
    pub state: RowState,
    pub version: Option<String>,
    pub artifact: ArtifactStatus,
    pub description: Option<String>,
}

pub fn render_list(rows: &[AddonRow]) -> Table {
    let icons = Theme::default().icons;

    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["name", "state", "version", "artifact", "description"]
                .into_iter()
                .map(|h| Cell::new(h).fg(Color::DarkGrey)),
        );

    for row in rows {
        let artifact = match &row.artifact {
            ArtifactStatus::Present { modified } => {
                let date = modified
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                Cell::new(format!("{} {date}", icons.success)).fg(Color::Green)
            }
            ArtifactStatus::Missing => Cell::new(format!("{} missing", icons.error)).fg(Color::Red),
            ArtifactStatus::NotExpected => Cell::new(icons.absent).fg(Color::DarkGrey),
        };

        table.add_row(vec![
            Cell::new(&row.name).fg(Color::Cyan),
            Cell::new(row.state.label()).fg(row.state.color()),
            Cell::new(row.version.as_deref().unwrap_or("-")),
            artifact,
            Cell::new(row.description.as_deref().unwrap_or("")).fg(Color::DarkGrey),
        ]);
    }

    table
}

/// Print the table plus a one-line footer.
pub fn print_list(rows: &[AddonRow]) {
    println!("{}", render_list(rows));

    let enabled = rows
        .iter()
        .filter(|r| {
            matches!(
                r.state,
                RowState::Stored { enabled: true }
                    | RowState::Derived(
                        AddonState::EnabledCompatible
                            | AddonState::EnabledIncompatible
                            | AddonState::EnabledNoVersion
                            | AddonState::Orphaned
                    )
            )
        })
        .count();
    println!();
    println!("  {} addons, {enabled} enabled", rows.len());
}
