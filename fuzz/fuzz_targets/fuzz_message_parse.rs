#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Envelope first, then the typed payload inside it: the exact path a
    // frame body takes through a peer's read loop and the event loop.
    if let Ok(message) = meridian_protocol::decode_message(data) {
        if let Ok(payload) = meridian_protocol::decode_payload(&message) {
            // Anything that decodes must re-encode under the same type.
            let again = meridian_protocol::encode_payload(&payload)
                .expect("decoded payload must re-encode");
            assert_eq!(again.header, message.header);
        }
    }

    // Arbitrary message-type bytes.
    if let Some(&b) = data.first() {
        let _ = meridian_messages::MessageType::try_from(b);
    }
});
