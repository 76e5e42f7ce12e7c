#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Stored and relayed blocks are plain bincode; malformed bytes must
    // produce an error, never a panic.
    if let Ok(block) = bincode::deserialize::<meridian_ledger::Block>(data) {
        let _ = block.hash();
        let _ = block.verify();
    }

    if let Ok(tx) = bincode::deserialize::<meridian_transactions::Transaction>(data) {
        let _ = tx.hash();
        let _ = tx.verify();
    }

    let _ = bincode::deserialize::<meridian_ledger::Header>(data);
    let _ = bincode::deserialize::<meridian_types::Hash>(data);
});
