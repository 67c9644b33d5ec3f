//! Ties the register file, system bus, decoder and executor together into a runnable hart.

use crate::bus::Bus;
use crate::decoder::{decode, Instruction};
use crate::error::ExecutionError;
use crate::execute::{execute, StepOutcome};
use crate::memory::SystemBus;
use crate::registers::Registers;

/// How a [`Machine::run`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// `ebreak` retired after this many instructions.
    Halted { steps: u64 },
    /// The `--max-steps` bound was reached before any halt.
    MaxStepsReached { steps: u64 },
}

/// A complete RV32I hart: register file, cache-backed memory, and the decode policy controlling
/// how illegal instructions are handled.
pub struct Machine {
    registers: Registers,
    bus: SystemBus,
    strict: bool,
    trace: bool,
}

impl Machine {
    #[must_use]
    pub fn new(ram_size_bytes: usize, strict: bool, trace: bool) -> Self {
        Self { registers: Registers::new(), bus: SystemBus::new(ram_size_bytes), strict, trace }
    }

    pub fn load_firmware(&mut self, image: &[u8]) {
        self.bus.load_image(image);
    }

    #[must_use]
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    #[must_use]
    pub fn ram_size(&self) -> usize {
        self.bus.ram_size()
    }

    /// Fetches, decodes and executes one instruction.
    ///
    /// In the default decode policy an illegal instruction is logged at `warn` and treated as a
    /// no-op; under `--strict` it is surfaced as [`ExecutionError::IllegalInstruction`] and the
    /// caller is expected to stop the loop.
    pub fn step(&mut self) -> Result<StepOutcome, ExecutionError> {
        let pc = self.registers.pc();
        let word = self.bus.fetch_word(pc);
        self.registers.set_pc(pc.wrapping_add(4));

        let instruction = decode(word);
        if let Instruction::Illegal { word } = instruction {
            if self.strict {
                return Err(ExecutionError::IllegalInstruction { pc, instruction: word });
            }
            log::warn!("illegal instruction 0x{word:08X} at pc=0x{pc:08X}, ignoring");
            return Ok(StepOutcome::Continue);
        }

        if self.trace {
            log::trace!("pc=0x{pc:08X} word=0x{word:08X} {instruction:?}");
        }

        Ok(execute(instruction, pc, &mut self.registers, &mut self.bus))
    }

    /// Steps until `ebreak` retires or `max_steps` instructions have run, whichever comes first.
    /// `max_steps = None` means run until `ebreak` unconditionally.
    pub fn run(&mut self, max_steps: Option<u64>) -> Result<RunOutcome, ExecutionError> {
        let mut steps = 0u64;
        loop {
            if max_steps.is_some_and(|limit| steps >= limit) {
                return Ok(RunOutcome::MaxStepsReached { steps });
            }

            match self.step()? {
                StepOutcome::Continue => steps += 1,
                StepOutcome::Halt => {
                    steps += 1;
                    return Ok(RunOutcome::Halted { steps });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s7_ebreak_halts_after_one_step() {
        let mut machine = Machine::new(1 << 16, false, false);
        machine.load_firmware(&[0x00, 0x10, 0x00, 0x73]);

        let outcome = machine.run(None).unwrap();

        assert_eq!(outcome, RunOutcome::Halted { steps: 1 });
    }

    #[test]
    fn scenario_s8_strict_mode_rejects_illegal_instruction() {
        let mut machine = Machine::new(1 << 16, true, false);
        machine.load_firmware(&[0x00, 0x00, 0x00, 0x00]);

        let err = machine.run(None).unwrap_err();

        assert_eq!(err, ExecutionError::IllegalInstruction { pc: 0, instruction: 0 });
    }

    #[test]
    fn non_strict_mode_no_ops_illegal_instruction_and_continues() {
        let mut machine = Machine::new(1 << 16, false, false);
        machine.load_firmware(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x73]);

        let outcome = machine.run(None).unwrap();

        assert_eq!(outcome, RunOutcome::Halted { steps: 2 });
    }

    #[test]
    fn scenario_s9_max_steps_bounds_a_non_halting_program() {
        let mut machine = Machine::new(1 << 16, false, false);
        // jal x0, 0: an unconditional jump to its own address.
        machine.load_firmware(&[0x00, 0x00, 0x00, 0x6F]);

        let outcome = machine.run(Some(10)).unwrap();

        assert_eq!(outcome, RunOutcome::MaxStepsReached { steps: 10 });
    }
}
