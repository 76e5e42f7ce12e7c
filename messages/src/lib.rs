//! Network message types for Meridian node-to-node communication.
//!
//! Every frame on the wire carries a [`Message`]: a one-byte type tag and
//! an opaque payload. The payload is the bincode encoding of the type the
//! tag names; [`Payload`] is the decoded form the node dispatches on.

mod message_type;

use meridian_ledger::Block;
use meridian_transactions::Transaction;
use serde::{Deserialize, Serialize};

pub use message_type::{MessageType, UnknownMessageType};

/// The wire envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub header: MessageType,
    pub data: Vec<u8>,
}

impl Message {
    pub fn new(header: MessageType, data: Vec<u8>) -> Self {
        Self { header, data }
    }
}

/// Reply to [`MessageType::GetStatus`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Node identifier from config.
    pub id: String,
    pub version: u32,
    pub current_height: u64,
}

/// Request for a contiguous block range. `to == 0` means "up to your tip".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlocksMessage {
    pub from: u64,
    pub to: u64,
}

/// Reply to [`GetBlocksMessage`], ascending by height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocksMessage {
    pub blocks: Vec<Block>,
}

/// A decoded message body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Transaction(Transaction),
    Block(Block),
    GetBlocks(GetBlocksMessage),
    Status(StatusMessage),
    GetStatus,
    Blocks(BlocksMessage),
}

impl Payload {
    /// The tag this payload travels under.
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::Transaction(_) => MessageType::Tx,
            Payload::Block(_) => MessageType::Block,
            Payload::GetBlocks(_) => MessageType::GetBlocks,
            Payload::Status(_) => MessageType::Status,
            Payload::GetStatus => MessageType::GetStatus,
            Payload::Blocks(_) => MessageType::Blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_tag_is_one_byte_on_the_wire() {
        let msg = Message::new(MessageType::Status, vec![9, 9]);
        let bytes = bincode::serialize(&msg).unwrap();
        assert_eq!(bytes[0], 0x04);
        let back: Message = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn unknown_tag_fails_envelope_decode() {
        let mut bytes = bincode::serialize(&Message::new(MessageType::Tx, vec![])).unwrap();
        bytes[0] = 0x7f;
        assert!(bincode::deserialize::<Message>(&bytes).is_err());
    }

    #[test]
    fn payload_reports_its_tag() {
        assert_eq!(Payload::GetStatus.message_type(), MessageType::GetStatus);
        let gb = Payload::GetBlocks(GetBlocksMessage { from: 1, to: 0 });
        assert_eq!(gb.message_type(), MessageType::GetBlocks);
        let blocks = Payload::Blocks(BlocksMessage { blocks: vec![] });
        assert_eq!(blocks.message_type().as_byte(), 0x06);
    }
}
