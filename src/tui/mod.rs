//! Terminal front end for the PBPU emulator.
//!
//! Provides an interactive terminal view with:
//! - Register panel (X, Y, Z, PC, LOC, carry flags)
//! - The 4x4 pixel screen
//! - A full 256-nibble RAM dump
//! - Disassembly centered on PC
//!
//! Execution is paced either by a fixed delay or one step per key press.

mod app;
mod ui;

pub use app::{EmulatorApp, run_emulator};
