//! Interactive keyboard controller and status line.
//!
//! Runs on an ordinary thread. It only touches the ring through its gain,
//! mute and peak accessors, so nothing here can stall the audio callbacks.
//!
//! | Key        | Action                    |
//! |------------|---------------------------|
//! | `q`        | quit                      |
//! | `m`        | toggle mute               |
//! | Up / Down  | gain ± one step           |

use std::io::{self, Write};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{execute, queue};
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::meter::LevelMeter;
use crate::ring::{RingBuffer, MAX_GAIN, MIN_GAIN};

/// Something the operator asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleMute,
    GainUp,
    GainDown,
}

/// Map a key event to a command. Releases and unbound keys map to `None`.
pub fn command_for(key: &KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(Command::Quit),
        KeyCode::Char('m') | KeyCode::Char('M') => Some(Command::ToggleMute),
        KeyCode::Up => Some(Command::GainUp),
        KeyCode::Down => Some(Command::GainDown),
        _ => None,
    }
}

/// `current + delta`, rounded to one decimal and clamped to the ring's gain range.
pub fn step_gain(current: f32, delta: f32) -> f32 {
    let stepped = ((current + delta) * 10.0).round() / 10.0;
    stepped.clamp(MIN_GAIN, MAX_GAIN)
}

/// Raw terminal mode with a hidden cursor, restored on drop.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn acquire() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = Self { _private: () };
        execute!(io::stdout(), Hide)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, Show);
        let _ = terminal::disable_raw_mode();
        let _ = writeln!(stdout);
    }
}

/// Drives gain/mute from the keyboard and redraws the status line.
pub struct Controller {
    ring: Arc<RingBuffer>,
    meter: LevelMeter,
    lookback: usize,
    gain_step: f32,
    refresh: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Controller {
    /// `shutdown` may be set from elsewhere (e.g. a signal handler) to stop [`run`](Self::run).
    pub fn new(ring: Arc<RingBuffer>, config: &MonitorConfig, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            ring,
            meter: LevelMeter::new(&config.meter),
            lookback: config.meter.lookback,
            gain_step: config.gain_step,
            refresh: config.refresh_interval,
            shutdown,
        }
    }

    /// Apply one command to the ring.
    pub fn apply(&self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Quit => {
                self.shutdown.store(true, Ordering::SeqCst);
                return ControlFlow::Break(());
            }
            Command::ToggleMute => {
                let muted = self.ring.toggle_mute();
                debug!(muted, "mute toggled");
            }
            Command::GainUp => {
                let gain = step_gain(self.ring.gain(), self.gain_step);
                self.ring.set_gain(gain);
                debug!(gain, "gain raised");
            }
            Command::GainDown => {
                let gain = step_gain(self.ring.gain(), -self.gain_step);
                self.ring.set_gain(gain);
                debug!(gain, "gain lowered");
            }
        }
        ControlFlow::Continue(())
    }

    /// `Volume: 120% | MUTED | [#####.....] -12.3 dB`
    pub fn status_line(&self) -> String {
        let volume = (self.ring.gain() * 100.0).round() as u32;
        let mute = if self.ring.is_muted() { "MUTED" } else { "live " };
        let level = self.meter.render(self.ring.peak(self.lookback));
        format!("Volume: {:>3}% | {} | {}", volume, mute, level)
    }

    /// Take over the terminal until `q` is pressed or shutdown is requested.
    pub fn run(&self) -> Result<()> {
        let _guard = TerminalGuard::acquire()?;
        let mut stdout = io::stdout();
        write!(stdout, "q: quit  m: mute  up/down: volume\r\n")?;

        while !self.shutdown.load(Ordering::SeqCst) {
            if event::poll(self.refresh)? {
                if let Event::Key(key) = event::read()? {
                    if let Some(command) = command_for(&key) {
                        if self.apply(command).is_break() {
                            break;
                        }
                    }
                }
            }
            self.redraw(&mut stdout)?;
        }

        info!(stats = ?self.ring.stats(), "controller finished");
        Ok(())
    }

    fn redraw(&self, out: &mut impl Write) -> Result<()> {
        queue!(out, Clear(ClearType::CurrentLine))?;
        write!(out, "\r{}", self.status_line())?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn controller() -> Controller {
        let ring = Arc::new(RingBuffer::new(4096));
        Controller::new(ring, &MonitorConfig::default(), Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(command_for(&key(KeyCode::Char('q'))), Some(Command::Quit));
        assert_eq!(command_for(&key(KeyCode::Char('m'))), Some(Command::ToggleMute));
        assert_eq!(command_for(&key(KeyCode::Up)), Some(Command::GainUp));
        assert_eq!(command_for(&key(KeyCode::Down)), Some(Command::GainDown));
        assert_eq!(command_for(&key(KeyCode::Char('x'))), None);
        assert_eq!(
            command_for(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
    }

    #[test]
    fn key_release_is_ignored() {
        let mut release = key(KeyCode::Char('m'));
        release.kind = KeyEventKind::Release;
        assert_eq!(command_for(&release), None);
    }

    #[test]
    fn gain_steps_round_to_one_decimal() {
        assert_relative_eq!(step_gain(1.0, 0.1), 1.1);
        assert_relative_eq!(step_gain(0.30000001, 0.1), 0.4);
        assert_relative_eq!(step_gain(0.1, -0.1), 0.0);
    }

    #[test]
    fn gain_steps_clamp() {
        assert_eq!(step_gain(3.0, 0.1), 3.0);
        assert_eq!(step_gain(2.95, 0.1), 3.0);
        assert_eq!(step_gain(0.0, -0.1), 0.0);
    }

    #[test]
    fn apply_adjusts_ring() {
        let c = controller();
        assert!(c.apply(Command::GainUp).is_continue());
        assert_relative_eq!(c.ring.gain(), 1.1);
        c.apply(Command::GainDown);
        c.apply(Command::GainDown);
        assert_relative_eq!(c.ring.gain(), 0.9);

        c.apply(Command::ToggleMute);
        assert!(c.ring.is_muted());
        c.apply(Command::ToggleMute);
        assert!(!c.ring.is_muted());
    }

    #[test]
    fn quit_sets_shutdown() {
        let c = controller();
        assert!(c.apply(Command::Quit).is_break());
        assert!(c.shutdown.load(Ordering::SeqCst));
    }

    #[test]
    fn status_line_shows_volume_mute_and_level() {
        let c = controller();
        c.ring.set_gain(1.2);
        c.ring.write(&[1.0]);
        let line = c.status_line();
        assert!(line.starts_with("Volume: 120% | live  | ["), "{}", line);
        assert!(line.ends_with("0.0 dB"), "{}", line);

        c.apply(Command::ToggleMute);
        assert!(c.status_line().contains("MUTED"));
    }

    #[test]
    fn redraw_writes_status_line() {
        let c = controller();
        let mut out = Vec::new();
        c.redraw(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("Volume: 100%"));
    }
}
