//! Instruction bytes.
//!
//! Bytes that do not decode to an instruction are operands for the
//! instruction that follows them (`PushInt` and `PushByte` read the byte
//! before themselves).

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    PushInt = 0x0a,
    Add = 0x0b,
    PushByte = 0x0c,
    Pack = 0x0d,
    Sub = 0x0e,
    Store = 0x0f,
}

impl Instruction {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x0a => Some(Self::PushInt),
            0x0b => Some(Self::Add),
            0x0c => Some(Self::PushByte),
            0x0d => Some(Self::Pack),
            0x0e => Some(Self::Sub),
            0x0f => Some(Self::Store),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_matches_repr() {
        for i in [
            Instruction::PushInt,
            Instruction::Add,
            Instruction::PushByte,
            Instruction::Pack,
            Instruction::Sub,
            Instruction::Store,
        ] {
            assert_eq!(Instruction::from_byte(i as u8), Some(i));
        }
        assert_eq!(Instruction::from_byte(0x03), None);
    }
}
