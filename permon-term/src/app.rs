//! Full-screen chart loop

use anyhow::{bail, Context, Result};
use crossterm::cursor::{Hide, MoveTo, MoveToNextLine, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use permon_core::{
    Frame, MetricSource, Monitor, PermonConfig, PermonError, Resolution, StatRegistry,
};

const COLORS: [Color; 5] = [
    Color::Green,
    Color::Red,
    Color::Blue,
    Color::Cyan,
    Color::Yellow,
];

/// Puts the terminal into full-screen mode and restores it on drop.
struct TerminalGuard {
    stdout: Stdout,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(Self { stdout })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = execute!(self.stdout, Show, LeaveAlternateScreen) {
            log::warn!("failed to leave alternate screen: {e}");
        }
        if let Err(e) = disable_raw_mode() {
            log::warn!("failed to disable raw mode: {e}");
        }
    }
}

/// Create the configured stats, skipping the ones this host cannot provide.
fn create_sources(
    registry: &StatRegistry,
    config: &PermonConfig,
) -> Result<Vec<Box<dyn MetricSource>>> {
    let mut sources = Vec::with_capacity(config.stats.len());
    for spec in &config.stats {
        match registry.create(spec.tag(), &spec.settings()) {
            Ok(source) => sources.push(source),
            Err(
                e @ (PermonError::SourceUnavailable { .. } | PermonError::ExternalTool { .. }),
            ) => {
                log::warn!("skipping {}: {e}", spec.tag());
            }
            Err(e) => return Err(e).with_context(|| format!("cannot start {}", spec.tag())),
        }
    }
    Ok(sources)
}

pub fn run(registry: &StatRegistry, config: &PermonConfig) -> Result<()> {
    let sources = create_sources(registry, config)?;
    if sources.is_empty() {
        bail!("no stats to display");
    }

    let (cols, rows) = terminal::size().context("cannot determine terminal size")?;
    // One spare line at the top and one at the bottom.
    let height = usize::from(rows).saturating_sub(2) / sources.len();
    let resolution = Resolution::new(height, usize::from(cols));

    let mut monitors = sources
        .into_iter()
        .map(|source| Monitor::new(source, resolution, config.layout()))
        .collect::<Result<Vec<_>, _>>()
        .context("terminal too small for the selected stats")?;

    let mut guard = TerminalGuard::enter()?;
    let frame_time = Duration::from_secs_f64(1.0 / f64::from(config.fps.max(1)));
    let result = event_loop(&mut guard.stdout, &mut monitors, frame_time);

    // Stop sampler and iostat threads before the terminal is handed back.
    drop(monitors);
    drop(guard);
    result
}

fn event_loop(stdout: &mut Stdout, monitors: &mut [Monitor], frame_time: Duration) -> Result<()> {
    loop {
        let deadline = Instant::now() + frame_time;

        queue!(stdout, MoveTo(0, 1))?;
        for (i, monitor) in monitors.iter_mut().enumerate() {
            monitor.update();
            let frame = monitor.paint()?;
            draw(stdout, &frame, COLORS[i % COLORS.len()])?;
        }
        stdout.flush()?;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if !event::poll(deadline - now)? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if is_quit(&key) => return Ok(()),
                Event::Resize(..) => queue!(stdout, Clear(ClearType::All))?,
                _ => {}
            }
        }
    }
}

/// Title and line take the chart colour; the axis stays uncoloured.
fn draw(stdout: &mut Stdout, frame: &Frame, color: Color) -> io::Result<()> {
    queue!(
        stdout,
        SetForegroundColor(color),
        Print(&frame.title),
        ResetColor,
        Clear(ClearType::UntilNewLine),
        MoveToNextLine(1)
    )?;
    for row in &frame.rows {
        queue!(
            stdout,
            Print(&row.label),
            SetForegroundColor(color),
            Print(&row.line),
            ResetColor
        )?;
        if let Some(gutter) = &row.gutter {
            queue!(stdout, Print(gutter))?;
        }
        queue!(stdout, Clear(ClearType::UntilNewLine), MoveToNextLine(1))?;
    }
    Ok(())
}

fn is_quit(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_keys() {
        let press = |code, modifiers| KeyEvent::new(code, modifiers);
        assert!(is_quit(&press(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(&press(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(&press(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit(&press(KeyCode::Char('x'), KeyModifiers::NONE)));
    }
}
