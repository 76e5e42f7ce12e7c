use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown message type 0x{0:02x}")]
pub struct UnknownMessageType(pub u8);

/// One-byte message tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum MessageType {
    Tx = 0x01,
    Block = 0x02,
    GetBlocks = 0x03,
    Status = 0x04,
    GetStatus = 0x05,
    Blocks = 0x06,
}

impl MessageType {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Tx => "tx",
            MessageType::Block => "block",
            MessageType::GetBlocks => "get_blocks",
            MessageType::Status => "status",
            MessageType::GetStatus => "get_status",
            MessageType::Blocks => "blocks",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = UnknownMessageType;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        Ok(match b {
            0x01 => MessageType::Tx,
            0x02 => MessageType::Block,
            0x03 => MessageType::GetBlocks,
            0x04 => MessageType::Status,
            0x05 => MessageType::GetStatus,
            0x06 => MessageType::Blocks,
            other => return Err(UnknownMessageType(other)),
        })
    }
}

impl From<MessageType> for u8 {
    fn from(t: MessageType) -> u8 {
        t.as_byte()
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
