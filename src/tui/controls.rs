//! Keyboard input handling for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::runtime::{App, Dial};

/// Maps a key event to an application action.
///
/// Guards on [`KeyEventKind::Press`] to avoid double-fire on some terminals.
/// Lowercase dial keys lower a value, uppercase raise it.
pub fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    match key.code {
        KeyCode::Char('q') => app.quit = true,
        KeyCode::Esc if app.esg_report.is_some() => app.dismiss_report(),
        KeyCode::Esc => app.quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit = true,
        KeyCode::Char(' ') => app.toggle_pause(),
        KeyCode::Char('+' | '=') | KeyCode::Right => app.speed_up(),
        KeyCode::Char('-') | KeyCode::Left => app.speed_down(),
        KeyCode::Char('r') => app.restart(),
        KeyCode::Char('s') => app.simulate_stress(),
        KeyCode::Char('o') => app.simulate_fog(),
        KeyCode::Char('d') => app.cycle_source(),
        KeyCode::Char('e') => app.request_report(),
        KeyCode::Char(c) => {
            if let Some((dial, steps)) = dial_for(c) {
                app.adjust(dial, steps);
            }
        }
        _ => {}
    }
}

fn dial_for(c: char) -> Option<(Dial, i32)> {
    let dial = match c.to_ascii_lowercase() {
        'b' => Dial::Bias,
        'v' => Dial::VoltageDrop,
        'l' => Dial::LoadIncrease,
        'f' => Dial::FrequencyDeviation,
        'c' => Dial::MaxCo2,
        _ => return None,
    };
    Some((dial, if c.is_ascii_uppercase() { 1 } else { -1 }))
}
