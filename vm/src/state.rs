//! Key/value storage written by contracts.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StateError;

/// Thread-safe contract storage. Keys must be non-empty.
#[derive(Debug, Default)]
pub struct ContractState {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl ContractState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StateError> {
        if key.is_empty() {
            return Err(StateError::EmptyKey);
        }
        self.data
            .write()
            .expect("contract state lock poisoned")
            .insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data
            .read()
            .expect("contract state lock poisoned")
            .get(key)
            .cloned()
    }

    /// Convenience for values written by the `Store` instruction.
    pub fn get_int(&self, key: &[u8]) -> Option<i64> {
        let bytes: [u8; 8] = self.get(key)?.try_into().ok()?;
        Some(i64::from_le_bytes(bytes))
    }

    pub fn len(&self) -> usize {
        self.data.read().expect("contract state lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_rejected() {
        let s = ContractState::new();
        assert_eq!(s.put(vec![], vec![1]), Err(StateError::EmptyKey));
        assert!(s.is_empty());
    }

    #[test]
    fn put_get_overwrite() {
        let s = ContractState::new();
        s.put(b"k".to_vec(), 5i64.to_le_bytes().to_vec()).unwrap();
        assert_eq!(s.get_int(b"k"), Some(5));
        s.put(b"k".to_vec(), vec![1]).unwrap();
        assert_eq!(s.get(b"k"), Some(vec![1]));
        assert_eq!(s.get_int(b"k"), None);
        assert_eq!(s.len(), 1);
    }
}
