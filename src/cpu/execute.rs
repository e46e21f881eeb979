//! CPU execution engine for the PBPU.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! A step cannot fail: every byte decodes to a defined opcode and every
//! 8-bit RAM address is in range.

use crate::cpu::{DirtyFlags, Ram, Registers, Rom};
use crate::cpu::decode::{Instruction, Opcode};
use serde::{Serialize, Deserialize};

/// Outcome of one `Cpu::step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Address the instruction was fetched from.
    pub pc: u8,
    /// The instruction that was executed.
    pub instruction: Instruction,
    /// What this instruction changed.
    pub dirty: DirtyFlags,
}

/// The PBPU CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Data memory.
    pub ram: Ram,
    /// Program memory.
    pub rom: Rom,
    /// Instruction count (for display only).
    pub cycles: u64,
}

impl Cpu {
    /// Create a new CPU with an empty (all-NOP) ROM.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            ram: Ram::new(),
            rom: Rom::new(),
            cycles: 0,
        }
    }

    /// Create a CPU with `program` loaded at ROM address 0.
    pub fn with_program(program: &[u8]) -> Self {
        Self {
            rom: Rom::from_program(program),
            ..Self::new()
        }
    }

    /// Reset registers, RAM and cycle count. ROM is kept.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.ram.clear();
        self.cycles = 0;
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that ran and the state it touched.
    pub fn step(&mut self) -> Step {
        // Fetch
        let pc = self.regs.pc;
        let instruction = Instruction::from_byte(self.rom.read(pc));

        // Execute
        let dirty = self.execute(instruction);

        // X, Y and Z are 4 bits wide no matter what ran
        self.regs.mask();
        // PC always advances, JMP included
        self.regs.advance_pc();
        self.cycles += 1;

        log::trace!(
            "{:02X}: {} {:X} -> X={:X} Y={:X} Z={:X} LOC={:02X} C={}",
            pc,
            instruction.opcode,
            instruction.imm,
            self.regs.x,
            self.regs.y,
            self.regs.z,
            self.regs.loc,
            u8::from(self.regs.carry),
        );

        Step { pc, instruction, dirty }
    }

    /// Execute `count` instructions.
    ///
    /// Returns the union of the dirty flags of every step.
    pub fn run_for(&mut self, count: u64) -> DirtyFlags {
        let mut dirty = DirtyFlags::CLEAN;
        for _ in 0..count {
            dirty |= self.step().dirty;
        }
        dirty
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> DirtyFlags {
        let regs = &mut self.regs;
        let imm = instr.imm;

        match instr.opcode {
            Opcode::Nop => DirtyFlags::CLEAN,

            // ==================== ALU ====================

            Opcode::Add => {
                let sum = regs.x.wrapping_add(regs.y).wrapping_add(regs.carry_in());
                regs.z = sum;
                regs.carry = (sum >> 4) & 1 == 1;
                DirtyFlags::REGS
            }

            Opcode::Sub => {
                // Not a real borrow: set when no borrow was needed
                let subtrahend = regs.y.wrapping_add(regs.carry_in());
                regs.z = regs.x.wrapping_sub(subtrahend);
                regs.carry = regs.x >= subtrahend;
                DirtyFlags::REGS
            }

            Opcode::Usc => {
                regs.use_carry = !regs.use_carry;
                DirtyFlags::REGS
            }

            // ==================== Immediates ====================

            Opcode::Wt1 => {
                regs.set_loc_high(imm);
                DirtyFlags::REGS
            }

            Opcode::Wt2 => {
                regs.set_loc_low(imm);
                DirtyFlags::REGS
            }

            Opcode::Wtx => {
                regs.x = imm;
                DirtyFlags::REGS
            }

            Opcode::Wty => {
                regs.y = imm;
                DirtyFlags::REGS
            }

            Opcode::Wtz => {
                regs.z = imm;
                DirtyFlags::REGS
            }

            // ==================== Memory ====================

            Opcode::Ztr => {
                self.ram.write(regs.loc, regs.z);
                DirtyFlags::ram_write(Ram::is_screen_addr(regs.loc))
            }

            Opcode::Rtz => {
                regs.z = self.ram.read(regs.loc);
                DirtyFlags::REGS
            }

            Opcode::Rtx => {
                regs.x = self.ram.read(regs.loc);
                DirtyFlags::REGS
            }

            Opcode::Rty => {
                regs.y = self.ram.read(regs.loc);
                DirtyFlags::REGS
            }

            // ==================== Control ====================

            Opcode::Pc1 => {
                regs.set_tmp_pc_low(imm);
                DirtyFlags::REGS
            }

            Opcode::Pc2 => {
                regs.set_tmp_pc_high(imm);
                DirtyFlags::REGS
            }

            Opcode::Jmp => {
                // The step's PC increment lands exactly on the target
                regs.tmp_pc = regs.tmp_pc.wrapping_sub(1);
                regs.pc = regs.tmp_pc;
                DirtyFlags::REGS
            }
        }
    }

    /// The instruction at `addr` in ROM.
    pub fn instruction_at(&self, addr: u8) -> Instruction {
        Instruction::from_byte(self.rom.read(addr))
    }

    /// The instruction that the next `step` will execute.
    pub fn next_instruction(&self) -> Instruction {
        self.instruction_at(self.regs.pc)
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("ram", &self.ram)
            .field("rom", &self.rom)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;
    use proptest::prelude::*;

    fn make_program(instructions: &[(Opcode, u8)]) -> Vec<u8> {
        instructions
            .iter()
            .map(|&(op, imm)| encode(&Instruction::new(op, imm)))
            .collect()
    }

    #[test]
    fn test_add_program() {
        let mut cpu = Cpu::with_program(&make_program(&[
            (Opcode::Wtx, 5),
            (Opcode::Wty, 6),
            (Opcode::Add, 0),
        ]));

        cpu.run_for(3);

        assert_eq!(cpu.regs.z, 0xB);
        assert!(!cpu.regs.carry);
        assert_eq!(cpu.regs.pc, 3);
        assert_eq!(cpu.cycles, 3);
    }

    #[test]
    fn test_add_carry_out_and_in() {
        let mut cpu = Cpu::with_program(&make_program(&[
            (Opcode::Add, 0),
            (Opcode::Usc, 0),
            (Opcode::Add, 0),
        ]));
        cpu.regs.x = 0xF;
        cpu.regs.y = 0x1;

        cpu.step();
        assert_eq!(cpu.regs.z, 0x0);
        assert!(cpu.regs.carry);

        cpu.step();
        assert!(cpu.regs.use_carry);

        cpu.step();
        assert_eq!(cpu.regs.z, 0x1);
        assert!(cpu.regs.carry);
    }

    #[test]
    fn test_carry_persists_across_other_ops() {
        let mut cpu = Cpu::with_program(&make_program(&[
            (Opcode::Add, 0),
            (Opcode::Wtx, 0),
            (Opcode::Nop, 0),
        ]));
        cpu.regs.x = 0x8;
        cpu.regs.y = 0x8;

        cpu.run_for(3);
        assert!(cpu.regs.carry);
    }

    #[test]
    fn test_sub_not_borrow_flag() {
        let mut cpu = Cpu::with_program(&make_program(&[
            (Opcode::Wtx, 7),
            (Opcode::Wty, 3),
            (Opcode::Sub, 0),
        ]));
        cpu.run_for(3);
        assert_eq!(cpu.regs.z, 4);
        assert!(cpu.regs.carry);

        let mut cpu = Cpu::with_program(&make_program(&[
            (Opcode::Wtx, 3),
            (Opcode::Wty, 7),
            (Opcode::Sub, 0),
        ]));
        cpu.run_for(3);
        assert_eq!(cpu.regs.z, 0xC);
        assert!(!cpu.regs.carry);
    }

    #[test]
    fn test_sub_with_carry_in() {
        let mut cpu = Cpu::with_program(&make_program(&[(Opcode::Sub, 0)]));
        cpu.regs.x = 5;
        cpu.regs.y = 5;
        cpu.regs.carry = true;
        cpu.regs.use_carry = true;

        cpu.step();
        // 5 - (5 + 1)
        assert_eq!(cpu.regs.z, 0xF);
        assert!(!cpu.regs.carry);
    }

    #[test]
    fn test_jmp_lands_on_target() {
        let mut program = make_program(&[
            (Opcode::Pc1, 0x0),
            (Opcode::Pc2, 0x1),
            (Opcode::Jmp, 0),
        ]);
        program.resize(0x10, 0);
        program.push(encode(&Instruction::new(Opcode::Wtx, 9)));
        let mut cpu = Cpu::with_program(&program);

        cpu.run_for(2);
        assert_eq!(cpu.regs.tmp_pc, 0x10);

        let step = cpu.step();
        assert_eq!(step.instruction.opcode, Opcode::Jmp);
        assert_eq!(cpu.regs.pc, 0x10);
        // The compensation is visible in TMP_PC
        assert_eq!(cpu.regs.tmp_pc, 0x0F);

        cpu.step();
        assert_eq!(cpu.regs.x, 9);
    }

    #[test]
    fn test_jmp_to_zero() {
        let mut cpu = Cpu::with_program(&make_program(&[
            (Opcode::Nop, 0),
            (Opcode::Jmp, 0),
        ]));

        cpu.run_for(2);
        assert_eq!(cpu.regs.pc, 0);
        assert_eq!(cpu.regs.tmp_pc, 0xFF);
    }

    #[test]
    fn test_pc_wraps() {
        let mut cpu = Cpu::new();
        cpu.regs.pc = 0xFF;
        cpu.step();
        assert_eq!(cpu.regs.pc, 0);
    }

    #[test]
    fn test_store_and_reload() {
        let mut cpu = Cpu::with_program(&make_program(&[
            (Opcode::Wt1, 0x2),
            (Opcode::Wt2, 0x5),
            (Opcode::Wtz, 0xD),
            (Opcode::Ztr, 0),
            (Opcode::Rtx, 0),
            (Opcode::Rty, 0),
            (Opcode::Wtz, 0),
            (Opcode::Rtz, 0),
        ]));

        cpu.run_for(8);
        assert_eq!(cpu.regs.loc, 0x25);
        assert_eq!(cpu.ram.read(0x25), 0xD);
        // 0x25 is odd: high nibble of byte 0x12
        assert_eq!(cpu.ram.bytes()[0x12], 0xD0);
        assert_eq!((cpu.regs.x, cpu.regs.y, cpu.regs.z), (0xD, 0xD, 0xD));
    }

    #[test]
    fn test_screen_dirty_scoping() {
        let mut cpu = Cpu::with_program(&make_program(&[(Opcode::Ztr, 0)]));
        cpu.regs.loc = 3;
        let step = cpu.step();
        assert!(step.dirty.ram);
        assert!(step.dirty.screen);
        assert!(!step.dirty.regs);

        let mut cpu = Cpu::with_program(&make_program(&[(Opcode::Ztr, 0)]));
        cpu.regs.loc = 4;
        let step = cpu.step();
        assert!(step.dirty.ram);
        assert!(!step.dirty.screen);
    }

    #[test]
    fn test_dirty_flags_are_per_step() {
        let mut cpu = Cpu::with_program(&make_program(&[
            (Opcode::Ztr, 0),
            (Opcode::Nop, 0),
            (Opcode::Wtx, 1),
        ]));

        assert_eq!(cpu.step().dirty, DirtyFlags::ram_write(true));
        assert_eq!(cpu.step().dirty, DirtyFlags::CLEAN);
        assert_eq!(cpu.step().dirty, DirtyFlags::REGS);
    }

    #[test]
    fn test_reset_keeps_rom() {
        let mut cpu = Cpu::with_program(&make_program(&[(Opcode::Wtz, 4), (Opcode::Ztr, 0)]));
        cpu.run_for(2);
        cpu.reset();

        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(cpu.ram.read(0), 0);
        assert_eq!(cpu.cycles, 0);
        assert_eq!(cpu.next_instruction(), Instruction::new(Opcode::Wtz, 4));
    }

    #[test]
    fn test_deserialize_rejects_short_rom() {
        let mut state = serde_json::to_value(Cpu::with_program(&[0x51])).unwrap();
        assert!(serde_json::from_value::<Cpu>(state.clone()).is_ok());

        state["rom"] = serde_json::json!([0x51]);
        assert!(serde_json::from_value::<Cpu>(state).is_err());
    }

    proptest! {
        #[test]
        fn prop_registers_stay_four_bits(
            byte in any::<u8>(),
            x in any::<u8>(),
            y in any::<u8>(),
            z in any::<u8>(),
            loc in any::<u8>(),
            carry in any::<bool>(),
            use_carry in any::<bool>(),
        ) {
            let mut cpu = Cpu::with_program(&[byte]);
            cpu.regs.x = x;
            cpu.regs.y = y;
            cpu.regs.z = z;
            cpu.regs.loc = loc;
            cpu.regs.carry = carry;
            cpu.regs.use_carry = use_carry;

            cpu.step();
            prop_assert!(cpu.regs.x <= 0xF);
            prop_assert!(cpu.regs.y <= 0xF);
            prop_assert!(cpu.regs.z <= 0xF);
        }

        #[test]
        fn prop_non_jump_wraps_pc(byte in any::<u8>()) {
            let instr = Instruction::from_byte(byte);
            prop_assume!(instr.opcode != Opcode::Jmp);

            let mut program = vec![0u8; 256];
            program[255] = byte;
            let mut cpu = Cpu::with_program(&program);
            cpu.regs.pc = 255;

            cpu.step();
            prop_assert_eq!(cpu.regs.pc, 0);
        }

        #[test]
        fn prop_jmp_reaches_tmp_pc(target in any::<u8>(), at in any::<u8>()) {
            let mut program = vec![0u8; 256];
            program[usize::from(at)] = encode(&Instruction::new(Opcode::Jmp, 0));
            let mut cpu = Cpu::with_program(&program);
            cpu.regs.pc = at;
            cpu.regs.tmp_pc = target;

            cpu.step();
            prop_assert_eq!(cpu.regs.pc, target);
        }
    }
}
