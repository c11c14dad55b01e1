//! Terminal reporter.
//!
//! Engine messages arrive through [`Reporter`] and are printed right away:
//! info and success on stdout, warnings and errors on stderr. `quiet`
//! drops everything below warning.

use addonkit_core::reporter::{LogLevel, Reporter};
use crossterm::style::Stylize;

use super::theme::Theme;

#[derive(Debug, Clone, Default)]
pub struct Output {
    theme: Theme,
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self {
            theme: Theme::default(),
            quiet,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

impl Reporter for Output {
    fn log(&self, level: LogLevel, msg: &str) {
        let icons = &self.theme.icons;
        let colors = &self.theme.colors;
        match level {
            LogLevel::Error => eprintln!("  {} {}", icons.error.with(colors.error), msg),
            LogLevel::Warning => eprintln!("  {} {}", icons.warning.with(colors.warning), msg),
            LogLevel::Success if !self.quiet => {
                println!("  {} {}", icons.success.with(colors.success), msg);
            }
            LogLevel::Info if !self.quiet => println!("  {} {}", icons.info, msg),
            LogLevel::Info | LogLevel::Success => {}
        }
    }

    fn section(&self, title: &str) {
        if !self.quiet {
            println!();
            println!("{}", title.with(self.theme.colors.header));
        }
    }
}
