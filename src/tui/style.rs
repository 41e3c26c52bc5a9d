//! Color constants and auto-scaling helpers for the TUI.

use ratatui::style::Color;

use crate::sim::types::{GridStatus, WeatherForecast};

pub const LOAD_COLOR: Color = Color::Cyan;
pub const SOLAR_COLOR: Color = Color::Yellow;
pub const WIND_COLOR: Color = Color::Green;
pub const GRID_COLOR: Color = Color::DarkGray;
/// Header bar foreground.
pub const HEADER_FG: Color = Color::White;
/// Header bar background.
pub const HEADER_BG: Color = Color::DarkGray;
/// Footer help text color.
pub const FOOTER_FG: Color = Color::DarkGray;
/// System log lines.
pub const SYSTEM_FG: Color = Color::Magenta;

/// Banner color for the grid status.
pub fn status_color(status: GridStatus) -> Color {
    match status {
        GridStatus::Normal => Color::Green,
        GridStatus::Optimizing => Color::Red,
    }
}

/// Forecast badge color.
pub fn forecast_color(forecast: WeatherForecast) -> Color {
    match forecast {
        WeatherForecast::Clear => Color::Green,
        WeatherForecast::FogIncoming | WeatherForecast::LowWindCorridor => Color::Yellow,
    }
}

/// Carbon intensity color against the configured ceiling.
pub fn co2_color(intensity: f64, max: f64) -> Color {
    if intensity > max {
        Color::Red
    } else if intensity > max * 0.75 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Computes Y-axis bounds from chart series with 10% padding.
pub fn auto_bounds_y(series: &[&[(f64, f64)]]) -> [f64; 2] {
    let all = series.iter().flat_map(|s| s.iter()).map(|&(_, y)| y);
    let min = all.clone().fold(f64::INFINITY, f64::min);
    let max = all.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    let range = (max - min).max(0.1);
    let pad = range * 0.1;
    [(min - pad).max(0.0), max + pad]
}
