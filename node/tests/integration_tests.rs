//! Multi-node tests: two event loops wired over the in-memory transport,
//! plus full `MeridianNode`s talking over loopback TCP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use meridian_consensus::{StakeRegistry, ValidatorSelector};
use meridian_crypto::{derive_address, keypair_from_seed};
use meridian_ledger::{create_genesis_block, Block, Blockchain, GenesisConfig};
use meridian_mempool::TxPool;
use meridian_messages::{BlocksMessage, GetBlocksMessage, Message, Payload};
use meridian_network::{
    LocalTransport, NetworkError, NewPeer, PeerHandle, PeerReader, OUTBOUND_QUEUE,
};
use meridian_node::{
    MeridianNode, NodeConfig, NodeMetrics, Server, ServerConfig, ServerContext, ShutdownController,
};
use meridian_nullables::NullStore;
use meridian_protocol::{decode_payload, encode_frame, encode_payload, read_frame, write_frame};
use meridian_rpc::{LocalSubmission, TxSubmitted};
use meridian_transactions::Transaction;
use meridian_types::{KeyPair, PublicKey};
use tokio::sync::{mpsc, oneshot};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestNode {
    ledger: Arc<Blockchain>,
    mempool: Arc<TxPool>,
    transport: LocalTransport,
    submissions: mpsc::Sender<LocalSubmission>,
    metrics: Arc<NodeMetrics>,
    shutdown: ShutdownController,
}

fn new_ledger() -> Arc<Blockchain> {
    Arc::new(
        Blockchain::new(
            create_genesis_block(&GenesisConfig::default()),
            Arc::new(NullStore::new()),
        )
        .unwrap(),
    )
}

fn spawn_node(port: u16, ledger: Arc<Blockchain>, validator: Option<KeyPair>) -> TestNode {
    spawn_node_with_stake(port, ledger, validator, 100)
}

/// `stake == 0` leaves the validator key out of the registry.
fn spawn_node_with_stake(
    port: u16,
    ledger: Arc<Blockchain>,
    validator: Option<KeyPair>,
    stake: u64,
) -> TestNode {
    let stakes = Arc::new(StakeRegistry::new());
    if let Some(kp) = validator.as_ref().filter(|_| stake > 0) {
        stakes.add_stake(derive_address(&kp.public), stake);
    }
    let mempool = Arc::new(TxPool::new(64));
    let metrics = Arc::new(NodeMetrics::new());
    let shutdown = ShutdownController::new();
    let ctx = ServerContext {
        ledger: ledger.clone(),
        mempool: mempool.clone(),
        proposer: Arc::new(ValidatorSelector::with_seed(stakes, 7)),
        metrics: metrics.clone(),
        shutdown: shutdown.clone(),
    };
    let config = ServerConfig {
        id: format!("node-{port}"),
        block_time: Duration::from_millis(100),
        sync_interval: Duration::from_millis(50),
    };
    let (server, channels) = Server::with_channels(config, validator, ctx);
    let transport = LocalTransport::new(SocketAddr::from(([10, 0, 0, 1], port)), channels.peers);
    tokio::spawn(server.run());
    TestNode {
        ledger,
        mempool,
        transport,
        submissions: channels.submissions,
        metrics,
        shutdown,
    }
}

fn extend(ledger: &Blockchain, n: usize) {
    let kp = keypair_from_seed(&[3; 32]);
    for _ in 0..n {
        let mut block = Block::from_prev_header(&ledger.current_header(), vec![]);
        block.sign(&kp.private);
        ledger.add_block(block).unwrap();
    }
}

/// A block of `txs` contract transactions with 60 KiB of no-op code each.
fn heavy_block(ledger: &Blockchain, txs: usize) -> Block {
    let sender = keypair_from_seed(&[5; 32]);
    let txs = (0..txs)
        .map(|_| {
            let mut tx = Transaction::new(vec![0; 60 * 1024]);
            tx.sign(&sender.private);
            tx
        })
        .collect();
    let mut block = Block::from_prev_header(&ledger.current_header(), txs);
    block.sign(&keypair_from_seed(&[3; 32]).private);
    block
}

/// A bare link into `node`: a handle for sending to it and the inbox of
/// what it sends back.
async fn raw_peer(port: u16, node: &TestNode) -> (PeerHandle, mpsc::Receiver<Message>) {
    let (tx, mut rx) = mpsc::channel(1);
    let raw = LocalTransport::new(SocketAddr::from(([10, 0, 0, 2], port)), tx);
    raw.connect(&node.transport).await.unwrap();
    let NewPeer { handle, reader } = rx.recv().await.unwrap();
    let PeerReader::Local(inbox) = reader else {
        panic!("local link yields a local reader");
    };
    (handle, inbox)
}

fn send_payload(peer: &PeerHandle, payload: &Payload) {
    peer.send(encode_payload(payload).unwrap()).unwrap();
}

fn signed_tx(value: u64) -> Transaction {
    let kp = keypair_from_seed(&[5; 32]);
    let mut tx = Transaction::transfer(PublicKey([6; 32]), value);
    tx.sign(&kp.private);
    tx
}

async fn submit_tx(node: &TestNode, tx: Transaction) -> Result<TxSubmitted, String> {
    let (reply, rx) = oneshot::channel();
    node.submissions
        .send(LocalSubmission::Transaction { tx, reply })
        .await
        .unwrap();
    rx.await.unwrap()
}

async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// ---------------------------------------------------------------------------
// In-memory transport
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lagging_node_syncs_from_taller_peer() {
    let tall = new_ledger();
    extend(&tall, 5);
    let a = spawn_node(1, tall, None);
    let b = spawn_node(2, new_ledger(), None);

    b.transport.connect(&a.transport).await.unwrap();
    wait_until("sync", || b.ledger.height() == 5).await;

    for h in 0..=5 {
        assert_eq!(
            a.ledger.get_block(h).unwrap().hash(),
            b.ledger.get_block(h).unwrap().hash()
        );
    }
    a.shutdown.shutdown();
    b.shutdown.shutdown();
}

#[tokio::test]
async fn taller_node_does_not_regress() {
    let tall = new_ledger();
    extend(&tall, 2);
    let a = spawn_node(3, tall, None);
    let b = spawn_node(4, new_ledger(), None);

    a.transport.connect(&b.transport).await.unwrap();
    wait_until("sync", || b.ledger.height() == 2).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(a.ledger.height(), 2);
}

#[tokio::test]
async fn relayed_block_past_tip_triggers_catch_up() {
    let a = spawn_node(11, new_ledger(), None);
    let b = spawn_node(12, new_ledger(), None);
    a.transport.connect(&b.transport).await.unwrap();
    // Let the Status exchange settle at height 0 on both sides.
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Blocks appended behind the loop's back are never relayed.
    extend(&a.ledger, 3);

    let kp = keypair_from_seed(&[4; 32]);
    let mut block = Block::from_prev_header(&a.ledger.current_header(), vec![]);
    block.sign(&kp.private);
    let (reply, rx) = oneshot::channel();
    a.submissions
        .send(LocalSubmission::Block { block, reply })
        .await
        .unwrap();
    rx.await.unwrap().unwrap();

    wait_until("gap filled", || b.ledger.height() == 4).await;
    assert_eq!(
        a.ledger.current_header().hash(),
        b.ledger.current_header().hash()
    );
}

#[tokio::test]
async fn submitted_transaction_reaches_peer_mempool() {
    let a = spawn_node(5, new_ledger(), None);
    let b = spawn_node(6, new_ledger(), None);
    a.transport.connect(&b.transport).await.unwrap();

    let tx = signed_tx(42);
    let hash = tx.hash();
    let submitted = submit_tx(&a, tx.clone()).await.unwrap();
    assert!(submitted.new);
    assert_eq!(submitted.hash, hash);

    wait_until("relay", || b.mempool.contains(&hash)).await;

    let again = submit_tx(&a, tx).await.unwrap();
    assert!(!again.new);
    assert_eq!(b.mempool.count(), 1);
}

#[tokio::test]
async fn unsigned_transaction_is_not_pooled() {
    let a = spawn_node(7, new_ledger(), None);
    let tx = Transaction::transfer(PublicKey([6; 32]), 1);
    assert!(submit_tx(&a, tx).await.is_err());
    assert_eq!(a.mempool.count(), 0);
}

#[tokio::test]
async fn validator_produces_and_peer_follows() {
    let validator = keypair_from_seed(&[11; 32]);
    let producer_key = validator.public;
    let a = spawn_node(8, new_ledger(), Some(validator));
    let b = spawn_node(9, new_ledger(), None);
    a.transport.connect(&b.transport).await.unwrap();

    let tx = signed_tx(9);
    let hash = tx.hash();
    submit_tx(&a, tx).await.unwrap();

    wait_until("pending cleared", || a.mempool.pending_count() == 0).await;
    wait_until("follower catches up", || b.ledger.height() >= 2).await;
    // The follower pooled the relayed copy and drops it once it is in a block.
    wait_until("follower pooled", || b.mempool.contains(&hash)).await;
    wait_until("follower pending cleared", || b.mempool.pending_count() == 0).await;

    let included = (1..=a.ledger.height())
        .filter_map(|h| a.ledger.get_block(h).ok())
        .any(|block| block.transactions.iter().any(|t| t.hash() == hash));
    assert!(included, "transaction never made it into a block");

    let first = b.ledger.get_block(1).unwrap();
    assert_eq!(first.validator, Some(producer_key));
    assert_eq!(first.proposer, Some(derive_address(&producer_key)));
    // Produced blocks leave the transaction in `all`.
    assert!(a.mempool.contains(&hash));
}

#[tokio::test]
async fn non_validator_never_produces() {
    let a = spawn_node(10, new_ledger(), None);
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(a.ledger.height(), 0);
}

#[tokio::test]
async fn unstaked_validator_skips_slots_but_keeps_serving() {
    let a = spawn_node_with_stake(14, new_ledger(), Some(keypair_from_seed(&[12; 32])), 0);
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(a.ledger.height(), 0);

    let submitted = tokio::time::timeout(Duration::from_secs(5), submit_tx(&a, signed_tx(3)))
        .await
        .expect("event loop stopped answering")
        .unwrap();
    assert!(submitted.new);
    assert_eq!(a.mempool.pending_count(), 1);
    assert_eq!(a.ledger.height(), 0);
}

#[tokio::test]
async fn bad_block_stops_the_rest_of_its_batch() {
    let source = new_ledger();
    extend(&source, 3);
    let blocks = source.get_blocks(1, 3).unwrap();
    let mut forged = blocks[1].clone();
    forged.validator = Some(keypair_from_seed(&[8; 32]).public);

    let a = spawn_node(13, new_ledger(), None);
    let (peer, _inbox) = raw_peer(13, &a).await;
    // Were the batch not cut at the forged block, the genuine copies after
    // it would take the chain to height 3.
    let batch = vec![blocks[0].clone(), forged, blocks[1].clone(), blocks[2].clone()];
    send_payload(&peer, &Payload::Blocks(BlocksMessage { blocks: batch }));
    wait_until("first block", || a.ledger.height() >= 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(a.ledger.height(), 1);

    send_payload(
        &peer,
        &Payload::Blocks(BlocksMessage {
            blocks: blocks[1..].to_vec(),
        }),
    );
    wait_until("clean batch applied", || a.ledger.height() == 3).await;
}

#[tokio::test]
async fn stalled_peer_is_dropped_without_blocking_the_loop() {
    let a = spawn_node(15, new_ledger(), None);
    let (peer, mut inbox) = raw_peer(15, &a).await;
    wait_until("peer registered", || a.metrics.peer_count.get() == 1).await;

    // Each request earns a reply that is never read.
    let request = encode_payload(&Payload::GetStatus).unwrap();
    let mut sent = 0;
    while sent < 2 * OUTBOUND_QUEUE {
        match peer.send(request.clone()) {
            Ok(()) => sent += 1,
            Err(NetworkError::QueueFull(_)) => tokio::task::yield_now().await,
            Err(e) => panic!("link to node failed: {e}"),
        }
    }

    let submitted = tokio::time::timeout(Duration::from_secs(5), submit_tx(&a, signed_tx(4)))
        .await
        .expect("event loop stalled on a full peer")
        .unwrap();
    assert!(submitted.new);

    wait_until("stalled peer dropped", || a.metrics.peer_count.get() == 0).await;
    // The node let go of its end, so the inbox closes once drained.
    let mut received = 0;
    while tokio::time::timeout(Duration::from_secs(5), inbox.recv())
        .await
        .expect("dropped link left open")
        .is_some()
    {
        received += 1;
    }
    assert_eq!(received, OUTBOUND_QUEUE);
}

#[tokio::test]
async fn block_replies_are_split_to_fit_a_frame() {
    // Four blocks of ~4.3 MB: more than one wire frame in total, and more
    // than the block budget for any two of them.
    let tall = new_ledger();
    for _ in 0..4 {
        let block = heavy_block(&tall, 70);
        tall.add_block(block).unwrap();
    }
    let a = spawn_node(16, tall, None);
    let (peer, mut inbox) = raw_peer(16, &a).await;
    send_payload(&peer, &Payload::GetBlocks(GetBlocksMessage { from: 1, to: 0 }));

    let (reply, batch) = loop {
        let message = tokio::time::timeout(Duration::from_secs(10), inbox.recv())
            .await
            .expect("no reply to GetBlocks")
            .expect("link closed");
        if let Payload::Blocks(batch) = decode_payload(&message).unwrap() {
            break (message, batch);
        }
    };
    assert_eq!(batch.blocks.len(), 1);
    assert_eq!(batch.blocks[0].height(), 1);
    assert!(encode_frame(&reply).is_ok());

    // A lagging node still gets the whole chain, one slice at a time.
    let b = spawn_node(17, new_ledger(), None);
    b.transport.connect(&a.transport).await.unwrap();
    wait_until("sync", || b.ledger.height() == 4).await;
    assert_eq!(
        a.ledger.current_header().hash(),
        b.ledger.current_header().hash()
    );
}

#[tokio::test]
async fn confirmed_transaction_is_not_pooled_again() {
    let ledger = new_ledger();
    let tx = signed_tx(7);
    let mut block = Block::from_prev_header(&ledger.current_header(), vec![tx.clone()]);
    block.sign(&keypair_from_seed(&[3; 32]).private);
    ledger.add_block(block).unwrap();

    let a = spawn_node(18, ledger, None);
    let submitted = submit_tx(&a, tx).await.unwrap();
    assert!(!submitted.new);
    assert_eq!(a.mempool.count(), 0);
}

// ---------------------------------------------------------------------------
// Full nodes over TCP
// ---------------------------------------------------------------------------

fn tcp_config(id: &str) -> NodeConfig {
    NodeConfig {
        id: id.to_string(),
        listen_address: "127.0.0.1:0".to_string(),
        rpc_enabled: false,
        block_time_secs: 1,
        sync_interval_secs: 1,
        ..NodeConfig::default()
    }
}

#[tokio::test]
async fn tcp_follower_tracks_validator() {
    let mut validator_cfg = tcp_config("validator");
    validator_cfg.validator_seed = Some("07".repeat(32));
    let validator = MeridianNode::new(validator_cfg, Arc::new(NullStore::new())).unwrap();
    assert!(validator.is_validator());
    let validator = validator.start().await.unwrap();

    let mut follower_cfg = tcp_config("follower");
    follower_cfg.seed_nodes = vec![validator.p2p_addr.to_string()];
    let follower = MeridianNode::new(follower_cfg, Arc::new(NullStore::new()))
        .unwrap()
        .start()
        .await
        .unwrap();

    let (v, f) = (validator.ledger.clone(), follower.ledger.clone());
    wait_until("follower height", || f.height() >= 1).await;
    let h = f.height();
    assert_eq!(
        v.get_block(h).unwrap().hash(),
        f.get_block(h).unwrap().hash()
    );

    follower.stop().await;
    validator.stop().await;
}

#[tokio::test]
async fn unread_tcp_peer_does_not_stall_other_peers() {
    let node = MeridianNode::new(tcp_config("server"), Arc::new(NullStore::new())).unwrap();
    for _ in 0..8 {
        let block = heavy_block(&node.ledger, 17);
        node.ledger.add_block(block).unwrap();
    }
    let node = node.start().await.unwrap();

    // Asks for the whole chain over and over and never reads a byte.
    let mut greedy = tokio::net::TcpStream::connect(node.p2p_addr).await.unwrap();
    let request = encode_payload(&Payload::GetBlocks(GetBlocksMessage { from: 1, to: 0 })).unwrap();
    for _ in 0..20 {
        write_frame(&mut greedy, &request).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut polite = tokio::net::TcpStream::connect(node.p2p_addr).await.unwrap();
    write_frame(&mut polite, &encode_payload(&Payload::GetStatus).unwrap())
        .await
        .unwrap();
    let status = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let message = read_frame(&mut polite).await.unwrap().expect("node closed");
            if let Payload::Status(status) = decode_payload(&message).unwrap() {
                break status;
            }
        }
    })
    .await
    .expect("event loop stalled behind an unread peer");
    assert_eq!(status.current_height, 8);

    drop(greedy);
    node.stop().await;
}

#[tokio::test]
async fn validator_key_is_self_staked() {
    let mut cfg = tcp_config("staker");
    cfg.validator_seed = Some("09".repeat(32));
    cfg.validator_stake = 250;
    let node = MeridianNode::new(cfg, Arc::new(NullStore::new())).unwrap();
    let address = derive_address(&keypair_from_seed(&[9; 32]).public);
    assert_eq!(node.stakes.get_stake(&address).unwrap(), 250);
}

#[tokio::test]
async fn rpc_binds_when_enabled() {
    let mut cfg = tcp_config("rpc");
    cfg.rpc_enabled = true;
    cfg.rpc_address = "127.0.0.1:0".to_string();
    let node = MeridianNode::new(cfg, Arc::new(NullStore::new()))
        .unwrap()
        .start()
        .await
        .unwrap();
    let rpc = node.rpc_addr.expect("rpc address");
    assert_ne!(rpc.port(), 0);
    tokio::net::TcpStream::connect(rpc).await.unwrap();
    node.stop().await;
}

#[tokio::test]
async fn lmdb_backed_node_persists_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(meridian_store_lmdb::LmdbBlockStore::open(dir.path()).unwrap());
    let node = MeridianNode::new(tcp_config("lmdb"), store.clone()).unwrap();
    extend(&node.ledger, 2);

    use meridian_store::BlockStore;
    assert_eq!(store.block_count().unwrap(), 3);
    let tip = node.ledger.current_header().hash();
    assert!(store.exists(&tip).unwrap());
}
