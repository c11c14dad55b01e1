//! UI Theme - colors and icons

use crossterm::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: ColorScheme,
    pub icons: Icons,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            colors: ColorScheme::default(),
            icons: Icons::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColorScheme {
    /// Addon names
    pub addon_name: Color,
    /// Version numbers
    pub version: Color,
    /// Secondary info (dates, descriptions)
    pub secondary: Color,
    /// Headers and labels
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            addon_name: Color::Cyan,
            version: Color::White,
            secondary: Color::DarkGrey,
            header: Color::DarkGrey,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Icons {
    pub success: &'static str,
    pub error: &'static str,
    pub warning: &'static str,
    pub info: &'static str,
    /// Artifact missing or not applicable
    pub absent: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            success: "✓",
            error: "✗",
            warning: "⚠",
            info: "ℹ",
            absent: "○",
        }
    }
}
