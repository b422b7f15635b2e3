//! Waveform display.
//!
//! Presentation only: nothing downstream depends on what a display does with a signal.

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    DefaultTerminal, Frame,
};
use std::io;

/// Something that can show a signal to the user.
pub trait WaveformDisplay {
    /// Show `signal`. May block until the user dismisses it.
    fn display(&mut self, title: &str, signal: &[f64]) -> io::Result<()>;
}

/// Discards everything. Used when there is no terminal to draw on.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl WaveformDisplay for NullDisplay {
    fn display(&mut self, _title: &str, _signal: &[f64]) -> io::Result<()> {
        Ok(())
    }
}

/// Full-screen line chart in the terminal's alternate screen.
///
/// Each call blocks until `q`, `Esc` or `Enter` is pressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalDisplay;

impl WaveformDisplay for TerminalDisplay {
    fn display(&mut self, title: &str, signal: &[f64]) -> io::Result<()> {
        let mut terminal = ratatui::try_init()?;
        let result = run_chart(&mut terminal, title, signal);
        ratatui::restore();
        result
    }
}

fn run_chart(terminal: &mut DefaultTerminal, title: &str, signal: &[f64]) -> io::Result<()> {
    loop {
        terminal.draw(|frame| render(frame, title, signal))?;

        // Any other event (resize included) just redraws
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press
                && matches!(
                    key.code,
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc | KeyCode::Enter
                )
            {
                return Ok(());
            }
        }
    }
}

fn render(frame: &mut Frame, title: &str, signal: &[f64]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),    // Chart
            Constraint::Length(1), // Help bar
        ])
        .split(frame.area());

    render_waveform(frame, chunks[0], title, signal);

    let help = Paragraph::new(format!(
        " {} samples  [Q/Esc/Enter] Continue",
        signal.len()
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[1]);
}

fn render_waveform(frame: &mut Frame, area: Rect, title: &str, signal: &[f64]) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL);

    // Braille packs two dots per cell horizontally
    let data = envelope(signal, area.width as usize * 2);
    let peak = amplitude_bound(signal);
    let x_max = signal.len().max(1) as f64;

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(["0".to_string(), signal.len().to_string()])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-peak, peak])
                .labels([format!("{:.1}", -peak), format!("{:.1}", peak)])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

/// Reduce `signal` to at most `columns` min/max pairs, keyed by sample index.
///
/// Signals that already fit are returned point for point.
pub fn envelope(signal: &[f64], columns: usize) -> Vec<(f64, f64)> {
    let columns = columns.max(1);
    if signal.len() <= columns * 2 {
        return signal
            .iter()
            .enumerate()
            .map(|(i, &s)| (i as f64, s))
            .collect();
    }

    let bucket = signal.len().div_ceil(columns);
    let mut points = Vec::with_capacity(columns * 2);
    for (n, chunk) in signal.chunks(bucket).enumerate() {
        let x = (n * bucket) as f64;
        let (lo, hi) = chunk
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            });
        points.push((x, lo));
        points.push((x, hi));
    }
    points
}

/// Symmetric y-axis bound: at least full scale, wider when the signal exceeds it.
pub fn amplitude_bound(signal: &[f64]) -> f64 {
    signal
        .iter()
        .filter(|s| s.is_finite())
        .fold(1.0_f64, |acc, s| acc.max(s.abs()))
}
