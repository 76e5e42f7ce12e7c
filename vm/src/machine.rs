//! The stack machine.

use tracing::trace;

use crate::error::VmError;
use crate::instruction::Instruction;
use crate::state::ContractState;

/// Runs transaction bytecode against contract state.
pub trait Executor: Send + Sync {
    fn run(&self, code: &[u8], state: &ContractState) -> Result<(), VmError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackValue {
    Int(i64),
    Byte(u8),
    Bytes(Vec<u8>),
}

/// The default executor. Each `run` gets a fresh stack.
#[derive(Clone, Copy, Debug, Default)]
pub struct StackVm;

struct Frame<'a> {
    code: &'a [u8],
    pc: usize,
    stack: Vec<StackValue>,
}

impl Frame<'_> {
    fn pop(&mut self) -> Result<StackValue, VmError> {
        self.stack
            .pop()
            .ok_or(VmError::StackUnderflow { pc: self.pc })
    }

    fn pop_int(&mut self) -> Result<i64, VmError> {
        match self.pop()? {
            StackValue::Int(v) => Ok(v),
            _ => Err(VmError::TypeMismatch {
                pc: self.pc,
                expected: "int",
            }),
        }
    }

    fn pop_byte(&mut self) -> Result<u8, VmError> {
        match self.pop()? {
            StackValue::Byte(b) => Ok(b),
            _ => Err(VmError::TypeMismatch {
                pc: self.pc,
                expected: "byte",
            }),
        }
    }

    fn pop_bytes(&mut self) -> Result<Vec<u8>, VmError> {
        match self.pop()? {
            StackValue::Bytes(b) => Ok(b),
            _ => Err(VmError::TypeMismatch {
                pc: self.pc,
                expected: "bytes",
            }),
        }
    }

    /// The byte immediately before the current instruction.
    fn operand(&self) -> Result<u8, VmError> {
        self.pc
            .checked_sub(1)
            .map(|i| self.code[i])
            .ok_or(VmError::StackUnderflow { pc: self.pc })
    }

    fn exec(&mut self, instr: Instruction, state: &ContractState) -> Result<(), VmError> {
        let pc = self.pc;
        match instr {
            Instruction::PushInt => {
                let v = self.operand()?;
                self.stack.push(StackValue::Int(i64::from(v)));
            }
            Instruction::PushByte => {
                let v = self.operand()?;
                self.stack.push(StackValue::Byte(v));
            }
            Instruction::Add => {
                let a = self.pop_int()?;
                let b = self.pop_int()?;
                let sum = a.checked_add(b).ok_or(VmError::Overflow { pc })?;
                self.stack.push(StackValue::Int(sum));
            }
            Instruction::Sub => {
                let a = self.pop_int()?;
                let b = self.pop_int()?;
                let diff = a.checked_sub(b).ok_or(VmError::Overflow { pc })?;
                self.stack.push(StackValue::Int(diff));
            }
            Instruction::Pack => {
                let n = usize::try_from(self.pop_int()?).map_err(|_| VmError::TypeMismatch {
                    pc,
                    expected: "non-negative length",
                })?;
                let mut bytes = vec![0u8; n];
                for slot in bytes.iter_mut().rev() {
                    *slot = self.pop_byte()?;
                }
                self.stack.push(StackValue::Bytes(bytes));
            }
            Instruction::Store => {
                let key = self.pop_bytes()?;
                let value = self.pop_int()?;
                state.put(key, value.to_le_bytes().to_vec())?;
            }
        }
        Ok(())
    }
}

impl StackVm {
    pub fn new() -> Self {
        Self
    }

    /// Run and return the final stack; used by tests and debugging tools.
    pub fn run_with_stack(
        &self,
        code: &[u8],
        state: &ContractState,
    ) -> Result<Vec<StackValue>, VmError> {
        let mut frame = Frame {
            code,
            pc: 0,
            stack: Vec::new(),
        };
        while frame.pc < code.len() {
            if let Some(instr) = Instruction::from_byte(code[frame.pc]) {
                trace!(pc = frame.pc, ?instr, "vm step");
                frame.exec(instr, state)?;
            }
            frame.pc += 1;
        }
        Ok(frame.stack)
    }
}

impl Executor for StackVm {
    fn run(&self, code: &[u8], state: &ContractState) -> Result<(), VmError> {
        self.run_with_stack(code, state).map(|_| ())
    }
}
