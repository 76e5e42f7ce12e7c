//! Nullable executor: records every program it is asked to run.

use meridian_vm::{ContractState, Executor, VmError};
use std::sync::Mutex;

/// A scripted [`Executor`].
///
/// Programs whose first byte equals the configured failure marker fail with
/// a stack underflow; everything else succeeds without touching state.
pub struct NullExecutor {
    calls: Mutex<Vec<Vec<u8>>>,
    fail_marker: Option<u8>,
}

impl NullExecutor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_marker: None,
        }
    }

    /// Fail any program starting with `marker`.
    pub fn failing_on(marker: u8) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_marker: Some(marker),
        }
    }

    /// Programs run so far, in call order.
    pub fn calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for NullExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for NullExecutor {
    fn run(&self, code: &[u8], _state: &ContractState) -> Result<(), VmError> {
        self.calls.lock().unwrap().push(code.to_vec());
        match (self.fail_marker, code.first()) {
            (Some(marker), Some(first)) if marker == *first => {
                Err(VmError::StackUnderflow { pc: 0 })
            }
            _ => Ok(()),
        }
    }
}
