//! Command-line configuration.
//!
//! The emulator takes one positional program path plus a handful of
//! flags. `Cli` is the raw clap surface; `RunConfig` is the validated
//! form the driver consumes.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default pause between steps in free-run mode.
pub const DEFAULT_DELAY_US: u64 = 100_000;

/// Default step budget for `--headless`.
pub const DEFAULT_MAX_STEPS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "pbpu-emu")]
#[command(author = "PixelBrush")]
#[command(version)]
#[command(about = "Emulator and visualizer for the PBPU 4-bit CPU")]
pub struct Cli {
    /// Raw program file (one instruction per byte, at most 255 bytes)
    pub program: Option<PathBuf>,

    /// Single step mode: execute one instruction per key press
    #[arg(long)]
    pub step: bool,

    /// Delay between steps in microseconds (free-run mode)
    #[arg(long, value_name = "MICROSECONDS", allow_hyphen_values = true)]
    pub delay: Option<String>,

    /// Run without the terminal UI and print the final machine state
    #[arg(long)]
    pub headless: bool,

    /// Number of steps to execute in headless mode
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_STEPS)]
    pub max_steps: u64,

    /// Print the headless result as JSON
    #[arg(long, requires = "headless")]
    pub json: bool,

    /// Print a disassembly of the program and exit
    #[arg(long, conflicts_with = "headless")]
    pub disasm: bool,
}

/// How the interactive driver paces execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Step continuously, sleeping `delay` between steps.
    FreeRun { delay: Duration },
    /// Step once per key press.
    Step,
}

/// What the binary should do with the loaded program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run in the terminal UI.
    Interactive(RunMode),
    /// Run `max_steps` instructions without a UI.
    Headless { max_steps: u64, json: bool },
    /// Print the program listing.
    Disassemble,
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub program: PathBuf,
    pub action: Action,
}

impl Cli {
    /// Validate the parsed arguments.
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        // Checked before the program path so a bad flag is reported first
        let delay = match self.delay.as_deref() {
            Some(raw) => parse_delay(raw)?,
            None => Duration::from_micros(DEFAULT_DELAY_US),
        };

        let program = self.program.ok_or(ConfigError::MissingProgramArgument)?;

        let action = if self.disasm {
            Action::Disassemble
        } else if self.headless {
            Action::Headless {
                max_steps: self.max_steps,
                json: self.json,
            }
        } else if self.step {
            Action::Interactive(RunMode::Step)
        } else {
            Action::Interactive(RunMode::FreeRun { delay })
        };

        Ok(RunConfig { program, action })
    }
}

/// Parse a `--delay` value in microseconds.
pub fn parse_delay(raw: &str) -> Result<Duration, ConfigError> {
    let value: i64 = raw.trim().parse().map_err(|_| ConfigError::InvalidDelayValue {
        value: raw.to_string(),
        reason: "not an integer",
    })?;

    let micros = u64::try_from(value).map_err(|_| ConfigError::InvalidDelayValue {
        value: raw.to_string(),
        reason: "delay can't be negative",
    })?;

    Ok(Duration::from_micros(micros))
}

/// Errors in the command-line configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no program passed in")]
    MissingProgramArgument,

    #[error("invalid delay value {value:?}: {reason}")]
    InvalidDelayValue { value: String, reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Result<RunConfig, ConfigError> {
        let argv = std::iter::once("pbpu-emu").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap().into_config()
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&["prog.bin"]).unwrap();
        assert_eq!(cfg.program, PathBuf::from("prog.bin"));
        assert_eq!(
            cfg.action,
            Action::Interactive(RunMode::FreeRun {
                delay: Duration::from_micros(DEFAULT_DELAY_US)
            })
        );
    }

    #[test]
    fn test_step_and_delay() {
        let cfg = config(&["--delay=250", "prog.bin"]).unwrap();
        assert_eq!(
            cfg.action,
            Action::Interactive(RunMode::FreeRun { delay: Duration::from_micros(250) })
        );

        let cfg = config(&["prog.bin", "--step"]).unwrap();
        assert_eq!(cfg.action, Action::Interactive(RunMode::Step));
    }

    #[test]
    fn test_zero_delay_allowed() {
        assert_eq!(parse_delay("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_bad_delay() {
        assert!(matches!(
            config(&["--delay=-5", "prog.bin"]),
            Err(ConfigError::InvalidDelayValue { reason: "delay can't be negative", .. })
        ));
        assert!(matches!(
            config(&["--delay=fast", "prog.bin"]),
            Err(ConfigError::InvalidDelayValue { reason: "not an integer", .. })
        ));
    }

    #[test]
    fn test_missing_program() {
        assert_eq!(config(&["--step"]), Err(ConfigError::MissingProgramArgument));
    }

    #[test]
    fn test_headless() {
        let cfg = config(&["prog.bin", "--headless", "--max-steps", "12", "--json"]).unwrap();
        assert_eq!(cfg.action, Action::Headless { max_steps: 12, json: true });
    }

    #[test]
    fn test_json_requires_headless() {
        let argv = ["pbpu-emu", "prog.bin", "--json"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
