//! PBPU Emulator - CLI Entry Point
//!
//! Usage:
//! - `pbpu-emu <program>` - Run a program in the terminal UI
//! - `pbpu-emu <program> --step` - One instruction per key press
//! - `pbpu-emu <program> --headless` - Run without UI and print the final state
//! - `pbpu-emu <program> --disasm` - Print a program listing

use clap::Parser;
use log::LevelFilter;
use pbpu::config::{Action, Cli, RunConfig};
use pbpu::{Cpu, Registers, Step};
use serde::Serialize;
use simple_logger::SimpleLogger;

fn main() {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    let program = match pbpu::load_program(&config.program) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    match config.action {
        Action::Interactive(mode) => run_interactive(&program, mode),
        Action::Headless { max_steps, json } => run_headless(&program, max_steps, json),
        Action::Disassemble => print!("{}", pbpu::disassemble(&program)),
    }
}

/// Log to stderr; keep quiet under the TUI so it doesn't tear the screen.
fn init_logging(config: &RunConfig) {
    let level = match config.action {
        Action::Interactive(_) => LevelFilter::Error,
        _ => LevelFilter::Warn,
    };

    if let Err(e) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("⚠️  Logging unavailable: {}", e);
    }
}

#[cfg(feature = "tui")]
fn run_interactive(program: &[u8], mode: pbpu::RunMode) {
    if let Err(e) = pbpu::run_emulator(program, mode) {
        eprintln!("❌ Terminal error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn run_interactive(_program: &[u8], _mode: pbpu::RunMode) {
    eprintln!("❌ Built without the terminal UI; use --headless");
    std::process::exit(1);
}

/// Machine state printed at the end of a headless run.
#[derive(Serialize)]
struct Report<'a> {
    cycles: u64,
    registers: &'a Registers,
    last_step: Option<Step>,
    screen: [[bool; 4]; 4],
    ram: Vec<u8>,
}

fn run_headless(program: &[u8], max_steps: u64, json: bool) {
    let mut cpu = Cpu::with_program(program);
    let mut last_step = None;
    for _ in 0..max_steps {
        last_step = Some(cpu.step());
    }

    if json {
        let report = Report {
            cycles: cpu.cycles,
            registers: &cpu.regs,
            last_step,
            screen: cpu.ram.screen_rows(),
            ram: cpu.ram.nibbles().collect(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to encode state: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    print_state(&cpu);
}

fn print_state(cpu: &Cpu) {
    let regs = &cpu.regs;

    println!("━━━ Result ━━━");
    println!("Cycles: {}", cpu.cycles);
    println!("X: {:X}  Y: {:X}  Z: {:X}", regs.x, regs.y, regs.z);
    println!("PC: {:02X}  TMP_PC: {:02X}  LOC: {:02X}", regs.pc, regs.tmp_pc, regs.loc);
    println!("Carry: {}  Use carry: {}", regs.carry, regs.use_carry);
    println!();

    println!("━━━ Screen ━━━");
    for row in cpu.ram.screen_rows() {
        let line: String = row.iter().map(|&lit| if lit { "##" } else { ".." }).collect();
        println!("{}", line);
    }
    println!();

    println!("━━━ Memory ━━━");
    let nibbles: Vec<u8> = cpu.ram.nibbles().collect();
    for (row, chunk) in nibbles.chunks(16).enumerate() {
        let cells: Vec<String> = chunk.iter().map(|n| format!("{:X}", n)).collect();
        println!("{:02X}: {}", row * 16, cells.join(" "));
    }
}
