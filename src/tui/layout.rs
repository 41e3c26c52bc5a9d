//! TUI layout and widget rendering.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Clear, Dataset, Paragraph, Wrap};

use super::runtime::App;
use super::style;
use crate::sim::types::{AgentRole, MetricSample};

/// Renders the full TUI frame.
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // header
            Constraint::Min(10),    // chart + side panels
            Constraint::Length(10), // agent log
            Constraint::Length(1),  // footer
        ])
        .split(frame.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(36)])
        .split(chunks[1]);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(7)])
        .split(middle[1]);

    render_header(frame, app, chunks[0]);
    render_chart(frame, app, middle[0]);
    render_metrics(frame, app, side[0]);
    render_dials(frame, app, side[1]);
    render_log(frame, app, chunks[2]);
    render_footer(frame, chunks[3]);

    if let Some(report) = &app.esg_report {
        render_report(frame, report, frame.area());
    }
}

/// Header bar: status banner, source, narrator, clock, speed, run state.
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let engine = app.engine();
    let (state_icon, state_label) = if app.paused {
        ("‖", "PAUSED")
    } else {
        ("▶", "RUNNING")
    };
    let negotiating = if app.is_negotiating() { " │ negotiating…" } else { "" };

    let header = Line::from(vec![
        Span::styled(
            " GREENGRID ",
            Style::default()
                .fg(style::HEADER_FG)
                .bg(style::HEADER_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            engine.status().to_string(),
            Style::default()
                .fg(style::status_color(engine.status()))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " │ {} │ {} │ t={:.0}s │ {}ms │ {} {}{} ",
            app.source,
            app.narrator_name(),
            engine.elapsed_ms() as f64 / 1000.0,
            app.tick_interval_ms(),
            state_icon,
            state_label,
            negotiating,
        )),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn series(app: &App, value: fn(&MetricSample) -> f64) -> Vec<(f64, f64)> {
    app.engine()
        .history()
        .iter()
        .map(|s| (s.tick as f64, value(s)))
        .collect()
}

/// Load and generation mix over the rolling history.
fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let load = series(app, |s| s.load_kw);
    let solar = series(app, |s| s.solar_kw);
    let wind = series(app, |s| s.wind_kw);
    let grid = series(app, |s| s.grid_supply_kw);

    let y_bounds = style::auto_bounds_y(&[
        load.as_slice(),
        solar.as_slice(),
        wind.as_slice(),
        grid.as_slice(),
    ]);
    let x_lo = load.first().map_or(0.0, |p| p.0);
    let x_hi = load.last().map_or(1.0, |p| p.0).max(x_lo + 1.0);

    let datasets = vec![
        Dataset::default()
            .name("Load")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(style::LOAD_COLOR))
            .data(&load),
        Dataset::default()
            .name("Solar")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(style::SOLAR_COLOR))
            .data(&solar),
        Dataset::default()
            .name("Wind")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(style::WIND_COLOR))
            .data(&wind),
        Dataset::default()
            .name("Grid")
            .marker(symbols::Marker::Dot)
            .style(Style::default().fg(style::GRID_COLOR))
            .data(&grid),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(" Load vs Generation Mix ")
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("tick")
                .bounds([x_lo, x_hi])
                .labels(vec![format!("{}", x_lo as u64), format!("{}", x_hi as u64)]),
        )
        .y_axis(
            Axis::default()
                .title("kW")
                .bounds(y_bounds)
                .labels(vec![
                    format!("{:.0}", y_bounds[0]),
                    format!("{:.0}", y_bounds[1]),
                ]),
        );

    frame.render_widget(chart, area);
}

/// Latest sample readings.
fn render_metrics(frame: &mut Frame, app: &App, area: Rect) {
    let max_co2 = app.engine().thresholds().max_co2_intensity;
    let lines = if let Some(s) = app.last_sample() {
        vec![
            Line::from(format!(" voltage   {:>8.2} V", s.voltage_v)),
            Line::from(format!(" frequency {:>8.2} Hz", s.frequency_hz)),
            Line::from(format!(" load      {:>8.1} kW", s.load_kw)),
            Line::from(format!(" battery   {:>8.1} kW", s.battery_discharge_kw)),
            Line::from(vec![
                Span::raw(" co2       "),
                Span::styled(
                    format!("{:>8.1} g/kWh", s.co2_intensity),
                    Style::default().fg(style::co2_color(s.co2_intensity, max_co2)),
                ),
            ]),
            Line::from(format!(" cost      {:>8.3} $/kWh", s.cost_per_kwh)),
            Line::from(format!(" co2 saved {:>8.1} kg", s.accumulated_co2_saved_kg)),
            Line::from(vec![
                Span::raw(" forecast  "),
                Span::styled(
                    s.weather_forecast.as_str(),
                    Style::default().fg(style::forecast_color(s.weather_forecast)),
                ),
            ]),
        ]
    } else {
        vec![Line::from(" Waiting for first tick...")]
    };

    let title = if app.engine().is_overridden() {
        " Telemetry (override) "
    } else {
        " Telemetry "
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Operator dials.
fn render_dials(frame: &mut Frame, app: &App, area: Rect) {
    let c = app.engine().config();
    let t = app.engine().thresholds();
    let lines = vec![
        Line::from(format!(" bias {:>5.0}   load x{:.1}", c.optimization_bias, c.load_multiplier)),
        Line::from(format!(" V drop {:>4.0}%  solar x{:.1}", t.voltage_drop_percent, c.solar_efficiency)),
        Line::from(format!(" load +{:>4.0}%", t.load_increase_percent)),
        Line::from(format!(" freq ±{:>4.1} Hz", t.frequency_deviation_hz)),
        Line::from(format!(" co2 max {:>4.0} g/kWh", t.max_co2_intensity)),
    ];
    let block = Block::default().title(" Dials ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Newest agent log lines, oldest at the top.
fn render_log(frame: &mut Frame, app: &App, area: Rect) {
    let visible = usize::from(area.height.saturating_sub(2));
    let logs = app.engine().logs();
    let lines: Vec<Line> = logs
        .iter()
        .skip(logs.len().saturating_sub(visible))
        .map(|l| {
            let color = if l.role == AgentRole::System {
                style::SYSTEM_FG
            } else {
                style::HEADER_FG
            };
            Line::from(vec![
                Span::styled(
                    format!("[{:>6.1}s] {:<19} ", l.elapsed_ms as f64 / 1000.0, l.role),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(l.message.as_str()),
            ])
        })
        .collect();

    let block = Block::default().title(" Agent Log ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Centered compliance report overlay.
fn render_report(frame: &mut Frame, report: &str, area: Rect) {
    let width = area.width.saturating_mul(2) / 3;
    let height = area.height / 2;
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .title(" ESG Compliance Report (Esc to close) ")
        .borders(Borders::ALL);
    frame.render_widget(
        Paragraph::new(report).wrap(Wrap { trim: true }).block(block),
        popup,
    );
}

/// Footer with keybinding hints.
fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(Span::styled(
        " q:Quit  Space:Pause  +/-:Speed  r:Restart  s:Stress  o:Fog  d:Source  e:Report  b/v/l/f/c:Dials (Shift raises)",
        Style::default().fg(style::FOOTER_FG),
    )));
    frame.render_widget(footer, area);
}
