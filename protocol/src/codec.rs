//! Message codec: framing and serialization for the wire protocol.
//!
//! A frame is a 4-byte big-endian body length followed by the bincode
//! encoding of a [`Message`]. The message's `data` is in turn the bincode
//! encoding of the payload its header names.

use bincode::Options;
use meridian_messages::{
    BlocksMessage, GetBlocksMessage, Message, MessageType, Payload, StatusMessage,
};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ProtocolError;

/// Maximum message size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16 MiB

/// Same layout as `bincode::serialize`, but refuses to allocate past the
/// frame limit while decoding.
fn bounded() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_MESSAGE_SIZE as u64)
}

fn from_bytes<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProtocolError> {
    Ok(bounded().deserialize(data)?)
}

/// Wrap a payload in its envelope.
pub fn encode_payload(payload: &Payload) -> Result<Message, ProtocolError> {
    let data = match payload {
        Payload::Transaction(tx) => bincode::serialize(tx)?,
        Payload::Block(block) => bincode::serialize(block)?,
        Payload::GetBlocks(m) => bincode::serialize(m)?,
        Payload::Status(m) => bincode::serialize(m)?,
        Payload::GetStatus => Vec::new(),
        Payload::Blocks(m) => bincode::serialize(m)?,
    };
    Ok(Message::new(payload.message_type(), data))
}

/// Decode an envelope's body according to its header.
pub fn decode_payload(message: &Message) -> Result<Payload, ProtocolError> {
    let data = &message.data;
    Ok(match message.header {
        MessageType::Tx => Payload::Transaction(from_bytes(data)?),
        MessageType::Block => Payload::Block(from_bytes(data)?),
        MessageType::GetBlocks => Payload::GetBlocks(from_bytes::<GetBlocksMessage>(data)?),
        MessageType::Status => Payload::Status(from_bytes::<StatusMessage>(data)?),
        MessageType::GetStatus => Payload::GetStatus,
        MessageType::Blocks => Payload::Blocks(from_bytes::<BlocksMessage>(data)?),
    })
}

/// Serialize an envelope (without the length prefix).
pub fn encode_message(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let body = bincode::serialize(message)?;
    if body.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: body.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(body)
}

/// Deserialize an envelope body.
pub fn decode_message(body: &[u8]) -> Result<Message, ProtocolError> {
    if body.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: body.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    from_bytes(body)
}

/// Length prefix + envelope, ready to write in one call.
pub fn encode_frame(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let body = encode_message(message)?;
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, message: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. `Ok(None)` on a clean close between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Message>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let body_len = u32::from_be_bytes(len_buf) as usize;
    if body_len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: body_len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut body = vec![0u8; body_len];
    reader.read_exact(&mut body).await?;
    decode_message(&body).map(Some)
}
