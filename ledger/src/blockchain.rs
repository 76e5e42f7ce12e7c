//! The canonical chain and the state derived from it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use meridian_crypto::derive_address;
use meridian_store::BlockStore;
use meridian_transactions::{CollectionTx, MintTx, Transaction, TxInner};
use meridian_types::{Address, Hash};
use meridian_vm::{ContractState, Executor, StackVm};
use tracing::{info, warn};

use crate::block::{Block, Header};
use crate::error::{ApplyError, LedgerError};
use crate::state::{AccountState, NftState};
use crate::validator::{BlockValidator, ChainReader, Validator};

/// Headers, blocks and lookup indexes. Guarded as one unit so that
/// validation and append happen under a single write lock.
#[derive(Default)]
struct ChainIndex {
    headers: Vec<Header>,
    blocks: Vec<Block>,
    by_hash: HashMap<Hash, u64>,
    /// tx hash -> (block height, position in block)
    tx_location: HashMap<Hash, (u64, usize)>,
}

impl ChainIndex {
    fn current_height(&self) -> u64 {
        self.headers.len().saturating_sub(1) as u64
    }

    fn check_height(&self, height: u64) -> Result<usize, LedgerError> {
        let current = self.current_height();
        if height > current || self.headers.is_empty() {
            return Err(LedgerError::OutOfRange { height, current });
        }
        Ok(height as usize)
    }
}

impl ChainReader for ChainIndex {
    fn height(&self) -> u64 {
        self.current_height()
    }

    fn has_block(&self, height: u64) -> bool {
        (height as usize) < self.headers.len()
    }

    fn get_header(&self, height: u64) -> Result<Header, LedgerError> {
        let idx = self.check_height(height)?;
        Ok(self.headers[idx].clone())
    }

    fn has_transaction(&self, hash: &Hash) -> bool {
        self.tx_location.contains_key(hash)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSummary {
    pub height: u64,
    pub current_hash: Hash,
    pub transactions: u64,
    pub accounts: u64,
}

pub struct Blockchain {
    chain: RwLock<ChainIndex>,
    accounts: AccountState,
    nfts: NftState,
    contracts: ContractState,
    store: Arc<dyn BlockStore>,
    executor: Arc<dyn Executor>,
    validator: Box<dyn Validator>,
}

impl Blockchain {
    /// A ledger with the stack VM and the standard validator, seeded with
    /// `genesis`.
    pub fn new(genesis: Block, store: Arc<dyn BlockStore>) -> Result<Self, LedgerError> {
        Self::with_parts(genesis, store, Arc::new(StackVm::new()), Box::new(BlockValidator))
    }

    pub fn with_parts(
        genesis: Block,
        store: Arc<dyn BlockStore>,
        executor: Arc<dyn Executor>,
        validator: Box<dyn Validator>,
    ) -> Result<Self, LedgerError> {
        if genesis.height() != 0 {
            return Err(LedgerError::InvalidGenesis(genesis.height()));
        }
        let chain = Self {
            chain: RwLock::new(ChainIndex::default()),
            accounts: AccountState::new(),
            nfts: NftState::new(),
            contracts: ContractState::new(),
            store,
            executor,
            validator,
        };
        {
            let mut index = chain.chain.write().map_err(|_| LedgerError::Poisoned)?;
            chain.append(&mut index, genesis, true);
        }
        Ok(chain)
    }

    /// Validate `block` and, if it extends the chain, apply and append it.
    pub fn add_block(&self, block: Block) -> Result<(), LedgerError> {
        // A writer that panicked may have left the index half-updated.
        let mut index = self.chain.write().map_err(|_| LedgerError::Poisoned)?;
        self.validator.validate_block(&*index, &block)?;
        self.append(&mut index, block, false);
        Ok(())
    }

    fn append(&self, index: &mut ChainIndex, block: Block, genesis: bool) {
        let hash = block.hash();
        let height = block.height();

        for tx in &block.transactions {
            if let Err(e) = self.apply_transaction(tx, genesis) {
                warn!(tx = %tx.hash(), block = %hash, error = %e, "skipping transaction");
            }
        }

        for (pos, tx) in block.transactions.iter().enumerate() {
            index.tx_location.insert(tx.hash(), (height, pos));
        }
        index.by_hash.insert(hash, height);
        index.headers.push(block.header.clone());

        match bincode::serialize(&block) {
            Ok(bytes) => {
                if let Err(e) = self.store.put_block(&hash, &bytes) {
                    warn!(block = %hash, error = %e, "failed to persist block");
                }
            }
            Err(e) => warn!(block = %hash, error = %e, "failed to encode block"),
        }

        info!(
            hash = %hash,
            height,
            transactions = block.transactions.len(),
            "new block"
        );
        index.blocks.push(block);
    }

    /// Contract code, then the payload variant, then the value transfer.
    /// The first failing step aborts the rest of this transaction.
    fn apply_transaction(&self, tx: &Transaction, genesis: bool) -> Result<(), ApplyError> {
        if !tx.data.is_empty() {
            self.executor.run(&tx.data, &self.contracts)?;
        }

        match &tx.inner {
            TxInner::Transfer => {}
            TxInner::CollectionCreate(collection) => {
                self.nfts.add_collection(tx.hash(), collection.clone());
            }
            TxInner::Mint(mint) => {
                self.nfts.add_mint(tx.hash(), mint.clone())?;
            }
        }

        if tx.value > 0 {
            let to = tx.to.as_ref().ok_or(ApplyError::MissingRecipient)?;
            let to = derive_address(to);
            match &tx.from {
                Some(from) => self.accounts.transfer(derive_address(from), to, tx.value)?,
                None if genesis => self.accounts.credit(to, tx.value),
                None => return Err(ApplyError::MissingSender),
            }
        }
        Ok(())
    }

    /// Reads keep serving after a writer panic; only appends are refused.
    fn index(&self) -> RwLockReadGuard<'_, ChainIndex> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn height(&self) -> u64 {
        self.index().current_height()
    }

    pub fn has_block(&self, height: u64) -> bool {
        ChainReader::has_block(&*self.index(), height)
    }

    pub fn get_header(&self, height: u64) -> Result<Header, LedgerError> {
        ChainReader::get_header(&*self.index(), height)
    }

    pub fn current_header(&self) -> Header {
        let index = self.index();
        // Genesis is inserted at construction, so the chain is never empty.
        index.headers[index.headers.len() - 1].clone()
    }

    pub fn get_block(&self, height: u64) -> Result<Block, LedgerError> {
        let index = self.index();
        let idx = index.check_height(height)?;
        Ok(index.blocks[idx].clone())
    }

    /// Blocks `from..=to`; `to == 0` means up to the current height.
    pub fn get_blocks(&self, from: u64, to: u64) -> Result<Vec<Block>, LedgerError> {
        let index = self.index();
        let current = index.current_height();
        let to = if to == 0 { current } else { to };
        if from > to {
            return Err(LedgerError::InvalidRange { from, to });
        }
        index.check_height(to)?;
        Ok(index.blocks[from as usize..=to as usize].to_vec())
    }

    /// Like [`Blockchain::get_blocks`], but stops before the encoded total
    /// would pass `max_bytes`. The first block is always included.
    pub fn get_blocks_capped(
        &self,
        from: u64,
        to: u64,
        max_bytes: u64,
    ) -> Result<Vec<Block>, LedgerError> {
        let index = self.index();
        let current = index.current_height();
        let to = if to == 0 { current } else { to };
        if from > to {
            return Err(LedgerError::InvalidRange { from, to });
        }
        index.check_height(to)?;

        let mut blocks = Vec::new();
        let mut used = 0u64;
        for block in &index.blocks[from as usize..=to as usize] {
            let size = block.encoded_size()?;
            if !blocks.is_empty() && used.saturating_add(size) > max_bytes {
                break;
            }
            used = used.saturating_add(size);
            blocks.push(block.clone());
        }
        Ok(blocks)
    }

    pub fn get_block_by_hash(&self, hash: &Hash) -> Result<Block, LedgerError> {
        let index = self.index();
        let height = index
            .by_hash
            .get(hash)
            .ok_or_else(|| LedgerError::NotFound(format!("block {hash}")))?;
        Ok(index.blocks[*height as usize].clone())
    }

    pub fn has_transaction(&self, hash: &Hash) -> bool {
        ChainReader::has_transaction(&*self.index(), hash)
    }

    pub fn get_tx_by_hash(&self, hash: &Hash) -> Result<Transaction, LedgerError> {
        let index = self.index();
        let (height, pos) = index
            .tx_location
            .get(hash)
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {hash}")))?;
        Ok(index.blocks[*height as usize].transactions[*pos].clone())
    }

    /// Read a block back from the backing store rather than memory.
    pub fn load_stored_block(&self, hash: &Hash) -> Result<Block, LedgerError> {
        let bytes = self.store.get_block(hash)?;
        bincode::deserialize(&bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.accounts.balance(address)
    }

    pub fn collection(&self, hash: &Hash) -> Option<CollectionTx> {
        self.nfts.collection(hash)
    }

    pub fn mint(&self, hash: &Hash) -> Option<MintTx> {
        self.nfts.mint(hash)
    }

    pub fn contract_state(&self) -> &ContractState {
        &self.contracts
    }

    pub fn summary(&self) -> LedgerSummary {
        let index = self.index();
        LedgerSummary {
            height: index.current_height(),
            current_hash: index.blocks.last().map(Block::hash).unwrap_or(Hash::ZERO),
            transactions: index.tx_location.len() as u64,
            accounts: self.accounts.account_count() as u64,
        }
    }
}

impl ChainReader for Blockchain {
    fn height(&self) -> u64 {
        Blockchain::height(self)
    }

    fn has_block(&self, height: u64) -> bool {
        Blockchain::has_block(self, height)
    }

    fn get_header(&self, height: u64) -> Result<Header, LedgerError> {
        Blockchain::get_header(self, height)
    }

    fn has_transaction(&self, hash: &Hash) -> bool {
        Blockchain::has_transaction(self, hash)
    }
}
