//! Emulator application state and driver loop.

use crate::config::RunMode;
use crate::cpu::{Cpu, DirtyFlags, Registers, Step};
use crate::program::disasm::{window, DisasmLine};
use crossterm::event::KeyCode;
use std::time::{Duration, Instant};

/// Shortest wait between polls while free-run is paused.
const PAUSED_POLL: Duration = Duration::from_millis(10);

/// Emulator application state.
///
/// The panels draw from cached views rather than from the CPU directly.
/// A view is only refreshed when the matching dirty flag comes back from
/// a step, and the flag is cleared once the view has been updated.
pub struct EmulatorApp {
    /// The CPU being run.
    pub cpu: Cpu,
    /// Pacing mode.
    pub mode: RunMode,
    /// Free-run execution is suspended.
    pub paused: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Register panel contents.
    pub registers: Registers,
    /// Screen panel contents.
    pub screen: [[bool; 4]; 4],
    /// Memory panel contents, one entry per nibble.
    pub memory: Vec<u8>,
    /// Flags not yet consumed by the views.
    pending: DirtyFlags,
}

impl EmulatorApp {
    /// Create an application with a loaded program.
    pub fn new(program: &[u8], mode: RunMode) -> Self {
        let cpu = Cpu::with_program(program);
        let status = match mode {
            RunMode::Step => "Step mode. Any key: step, q: quit.".to_string(),
            RunMode::FreeRun { .. } => "Running. p: pause, q: quit.".to_string(),
        };

        Self {
            registers: cpu.regs.clone(),
            screen: cpu.ram.screen_rows(),
            memory: cpu.ram.nibbles().collect(),
            cpu,
            mode,
            paused: false,
            should_quit: false,
            status,
            pending: DirtyFlags::CLEAN,
        }
    }

    /// Step one instruction and refresh whatever it touched.
    pub fn step(&mut self) -> Step {
        let step = self.cpu.step();
        self.pending |= step.dirty;
        self.refresh_views();
        step
    }

    /// Update the cached views for every pending flag, clearing each one.
    fn refresh_views(&mut self) {
        if self.pending.take_regs() {
            self.registers = self.cpu.regs.clone();
        }
        if self.pending.take_screen() {
            self.screen = self.cpu.ram.screen_rows();
        }
        if self.pending.take_ram() {
            self.memory.clear();
            self.memory.extend(self.cpu.ram.nibbles());
        }
        // PC moves on every step, dirty or not
        self.registers.pc = self.cpu.regs.pc;
    }

    /// Flags still waiting for a view refresh.
    pub fn pending(&self) -> DirtyFlags {
        self.pending
    }

    /// Toggle pause in free-run mode.
    pub fn toggle_pause(&mut self) {
        if let RunMode::FreeRun { .. } = self.mode {
            self.paused = !self.paused;
            self.status = if self.paused {
                "Paused. p: resume, s: step, q: quit.".into()
            } else {
                "Running. p: pause, q: quit.".into()
            };
        }
    }

    /// React to a key press.
    ///
    /// In step mode every key other than quit executes one instruction.
    /// In free-run mode keys only pause, quit, or step while paused.
    pub fn handle_key(&mut self, code: KeyCode) {
        match (code, self.mode) {
            (KeyCode::Char('q') | KeyCode::Esc, _) => self.should_quit = true,
            (_, RunMode::Step) => {
                self.step();
            }
            (KeyCode::Char('p'), RunMode::FreeRun { .. }) => self.toggle_pause(),
            (KeyCode::Char('s'), RunMode::FreeRun { .. }) if self.paused => {
                self.step();
            }
            _ => {}
        }
    }

    /// Get disassembly around the current PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<DisasmLine> {
        window(&self.cpu.rom, self.cpu.regs.pc, lines)
    }
}

/// Run the emulator in the terminal.
pub fn run_emulator(program: &[u8], mode: RunMode) -> std::io::Result<()> {
    use crossterm::terminal::enable_raw_mode;

    enable_raw_mode()?;

    let mut app = EmulatorApp::new(program, mode);
    let result = setup_and_drive(&mut app);
    let restored = restore_terminal();

    log::info!("Stopped after {} cycles", app.cpu.cycles);
    // A loop error is more useful than a teardown error
    result.and(restored)
}

fn setup_and_drive(app: &mut EmulatorApp) -> std::io::Result<()> {
    use crossterm::{terminal::EnterAlternateScreen, ExecutableCommand};
    use ratatui::prelude::*;
    use std::io::stdout;

    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.hide_cursor()?;

    drive(&mut terminal, app)
}

/// Put the terminal back the way we found it.
///
/// Every step is attempted even if an earlier one fails; the first
/// error is returned.
fn restore_terminal() -> std::io::Result<()> {
    use crossterm::{
        cursor::Show,
        terminal::{disable_raw_mode, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use std::io::stdout;

    let raw = disable_raw_mode();
    let screen = stdout().execute(LeaveAlternateScreen).map(|_| ());
    let cursor = stdout().execute(Show).map(|_| ());

    for err in [&raw, &screen, &cursor].into_iter().filter_map(|r| r.as_ref().err()) {
        log::error!("Failed to restore terminal: {}", err);
    }
    raw.and(screen).and(cursor)
}

/// Time left until `deadline`, or `None` once it has been reached.
fn time_left(deadline: Instant, now: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(now)
        .filter(|left| !left.is_zero())
}

/// Main loop: wait according to the run mode, step, redraw.
fn drive<B: ratatui::backend::Backend>(
    terminal: &mut ratatui::Terminal<B>,
    app: &mut EmulatorApp,
) -> std::io::Result<()> {
    use crossterm::event::{self, Event, KeyEventKind};

    loop {
        terminal.draw(|frame| super::ui::draw(frame, app))?;

        match app.mode {
            RunMode::Step => {
                // Block until one key press, then execute one instruction
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        app.handle_key(key.code);
                    }
                }
            }
            RunMode::FreeRun { delay } => {
                let wait = if app.paused { delay.max(PAUSED_POLL) } else { delay };
                let deadline = Instant::now() + wait;

                // Keys arriving mid-wait must not bring the next step forward
                while let Some(left) = time_left(deadline, Instant::now()) {
                    if !event::poll(left)? {
                        continue;
                    }
                    if let Event::Key(key) = event::read()? {
                        if key.kind == KeyEventKind::Press {
                            app.handle_key(key.code);
                        }
                    }
                    // Redraw right away after a pause, manual step or quit
                    if app.paused || app.should_quit {
                        break;
                    }
                }

                if !app.paused && !app.should_quit {
                    app.step();
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FREE_RUN: RunMode = RunMode::FreeRun { delay: Duration::ZERO };

    #[test]
    fn test_views_follow_dirty_flags() {
        // WTZ 9, WT2 5, ZTR, WT2 0, ZTR
        let mut app = EmulatorApp::new(&[0x79, 0x45, 0x80, 0x40, 0x80], FREE_RUN);

        app.step();
        assert_eq!(app.registers.z, 9);

        app.step();
        app.step();
        assert_eq!(app.memory[5], 9);
        // Nibble 5 is off screen
        assert_eq!(app.screen, [[false; 4]; 4]);

        app.step();
        app.step();
        assert_eq!(app.screen[0], [true, false, false, true]);
        assert_eq!(app.memory[0], 9);
        assert_eq!(app.pending(), DirtyFlags::CLEAN);
    }

    #[test]
    fn test_pc_view_tracks_every_step() {
        let mut app = EmulatorApp::new(&[0x00, 0x00], FREE_RUN);
        app.step();
        app.step();
        assert_eq!(app.registers.pc, 2);
    }

    #[test]
    fn test_pause_only_in_free_run() {
        let mut app = EmulatorApp::new(&[0x00], RunMode::Step);
        app.toggle_pause();
        assert!(!app.paused);

        let mut app = EmulatorApp::new(&[0x00], FREE_RUN);
        app.toggle_pause();
        assert!(app.paused);
    }

    #[test]
    fn test_keys_in_step_mode() {
        let mut app = EmulatorApp::new(&[0x55, 0x66], RunMode::Step);
        app.handle_key(KeyCode::Char('x'));
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.cpu.regs.pc, 2);
        assert_eq!(app.registers.y, 6);

        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
        assert_eq!(app.cpu.cycles, 2);
    }

    #[test]
    fn test_keys_do_not_step_while_running() {
        let mut app = EmulatorApp::new(&[0x55, 0x66], FREE_RUN);
        app.handle_key(KeyCode::Char('x'));
        app.handle_key(KeyCode::Char('s'));
        assert_eq!(app.cpu.cycles, 0);

        app.handle_key(KeyCode::Char('p'));
        assert!(app.paused);
        app.handle_key(KeyCode::Char('s'));
        assert_eq!(app.cpu.cycles, 1);

        app.handle_key(KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_time_left_until_deadline() {
        let now = Instant::now();
        let deadline = now + Duration::from_millis(50);

        assert_eq!(time_left(deadline, now), Some(Duration::from_millis(50)));
        assert_eq!(
            time_left(deadline, now + Duration::from_millis(20)),
            Some(Duration::from_millis(30))
        );
        assert_eq!(time_left(deadline, deadline), None);
        assert_eq!(time_left(deadline, deadline + Duration::from_millis(1)), None);
    }

    #[test]
    fn test_disassembly_window() {
        let app = EmulatorApp::new(&[0x55, 0x66, 0x10], FREE_RUN);
        let lines = app.get_disassembly(5);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].addr, None);
        assert_eq!(lines[2].text, "WTX 5");
        assert!(lines[2].is_current);
    }
}
