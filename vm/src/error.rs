use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("contract state keys must not be empty")]
    EmptyKey,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("stack underflow at pc {pc}")]
    StackUnderflow { pc: usize },

    #[error("type mismatch at pc {pc}: expected {expected}")]
    TypeMismatch { pc: usize, expected: &'static str },

    #[error("integer overflow at pc {pc}")]
    Overflow { pc: usize },

    #[error(transparent)]
    State(#[from] StateError),
}
