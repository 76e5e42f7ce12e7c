//! Wire protocol: message framing, envelope encoding/decoding, versioning.

pub mod codec;
pub mod error;
pub mod version;

pub use codec::{
    decode_message, decode_payload, encode_frame, encode_message, encode_payload, read_frame,
    write_frame, MAX_MESSAGE_SIZE,
};
pub use error::ProtocolError;
pub use version::{is_compatible, MIN_PROTOCOL_VERSION, PROTOCOL_VERSION};
