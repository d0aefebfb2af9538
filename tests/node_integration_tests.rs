//! Node integration tests
//!
//! Exercises the consensus flows end to end through the public node API:
//! genesis identity, mining, double-spend handling, fork adoption and the
//! wire protocol over real sockets.

use ember_chain::core::work;
use ember_chain::{
    genesis_block, genesis_secret, Block, Message, Node, Peers, Reaction, Server, Wallet,
    BLOCK_REWARD,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Mine the next block through repeated single attempts. Required difficulty
/// in these tests stays in the low single digits, so this converges fast;
/// the bound only guards against a broken miner looping forever.
fn mine_block(node: &mut Node) -> Block {
    for _ in 0..5_000_000 {
        if let Some(block) = node.mine_step().unwrap() {
            return block;
        }
    }
    panic!("mining never met the required difficulty");
}

#[test]
fn test_genesis_identity() {
    let genesis_wallet = Wallet::from_secret(&genesis_secret()).unwrap();
    let fresh_wallet = Wallet::new();

    let node = Node::new(Wallet::new());
    assert_eq!(node.chain().height(), 1);
    assert_eq!(node.chain().tip(), genesis_block());
    assert_eq!(
        node.chain().balance_of(&genesis_wallet.public_key_hex()),
        10
    );
    assert_eq!(node.chain().balance_of(&fresh_wallet.public_key_hex()), 0);
}

#[test]
fn test_mine_one_block() {
    let mut node = Node::new(Wallet::new());
    let block = mine_block(&mut node);

    // An empty pool yields a block holding only the coinbase
    assert_eq!(block.get_txs().len(), 1);
    let coinbase = block.coinbase().unwrap();
    assert_eq!(coinbase.get_outputs().len(), 1);
    assert_eq!(coinbase.get_outputs()[0].get_amount(), BLOCK_REWARD);
    assert_eq!(
        coinbase.get_outputs()[0].get_public_key(),
        node.wallet().public_key_hex()
    );
    assert_eq!(node.chain().height(), 2);
    assert_eq!(
        node.chain().balance_of(&node.wallet().public_key_hex()),
        BLOCK_REWARD
    );
}

#[test]
fn test_double_spend_rejected_by_pool() {
    let genesis_wallet = Wallet::from_secret(&genesis_secret()).unwrap();
    let mut node = Node::new(Wallet::new());

    let first = genesis_wallet
        .make_tx(6, &Wallet::new().public_key_hex(), node.chain().utxos())
        .unwrap();
    let second = genesis_wallet
        .make_tx(8, &Wallet::new().public_key_hex(), node.chain().utxos())
        .unwrap();

    // Both spend the single genesis UTXO; only the first gets in
    assert!(matches!(
        node.handle_message(Message::Transaction { tx: first.clone() }),
        Reaction::Broadcast(_)
    ));
    assert!(matches!(
        node.handle_message(Message::Transaction { tx: second }),
        Reaction::Ignore
    ));
    assert_eq!(node.pool().len(), 1);
    assert_eq!(node.pool().transactions()[0].get_hash(), first.get_hash());
}

#[test]
fn test_spend_confirms_into_balances() {
    let genesis_wallet = Wallet::from_secret(&genesis_secret()).unwrap();
    let recipient = Wallet::new();
    let mut node = Node::new(genesis_wallet);

    node.send(6, &recipient.public_key_hex()).unwrap();
    let block = mine_block(&mut node);
    assert_eq!(block.get_txs().len(), 2);
    assert!(node.pool().is_empty());

    // 6 to the recipient; change 2 plus the coinbase 11 stay with us
    assert_eq!(node.chain().balance_of(&recipient.public_key_hex()), 6);
    assert_eq!(
        node.chain().balance_of(&node.wallet().public_key_hex()),
        2 + BLOCK_REWARD + 1
    );
}

#[test]
fn test_fork_adoption_clears_pool() {
    let genesis_wallet = Wallet::from_secret(&genesis_secret()).unwrap();
    let mut node = Node::new(genesis_wallet);
    node.send(6, &Wallet::new().public_key_hex()).unwrap();
    assert_eq!(node.pool().len(), 1);

    // A competitor mines two blocks; its cumulative work strictly exceeds
    // our single genesis block.
    let mut competitor = Node::new(Wallet::new());
    mine_block(&mut competitor);
    mine_block(&mut competitor);
    let candidate = competitor.chain().blocks().to_vec();

    match node.handle_message(Message::Blockchain { chain: candidate }) {
        Reaction::Broadcast(Message::LatestBlock { block }) => {
            assert_eq!(block.get_hash(), competitor.chain().tip().get_hash());
        }
        other => panic!("expected the adopted tip broadcast, got {other:?}"),
    }
    assert_eq!(node.chain().height(), 3);
    assert!(node.pool().is_empty());
}

#[test]
fn test_equal_work_chain_is_not_swapped() {
    let mut node = Node::new(Wallet::new());
    mine_block(&mut node);
    let tip_before = node.chain().tip().get_hash().to_string();

    let snapshot = node.chain().blocks().to_vec();
    assert!(matches!(
        node.handle_message(Message::Blockchain { chain: snapshot }),
        Reaction::Ignore
    ));
    assert_eq!(node.chain().tip().get_hash(), tip_before);
}

#[test]
fn test_block_round_trip_through_the_wire_format() {
    let mut source = Node::new(Wallet::new());
    let block = mine_block(&mut source);

    let frame = serde_json::to_string(&Message::LatestBlock {
        block: block.clone(),
    })
    .unwrap();
    let reparsed = match serde_json::from_str::<Message>(&frame).unwrap() {
        Message::LatestBlock { block } => block,
        other => panic!("wrong variant: {other:?}"),
    };
    assert_eq!(reparsed, block);

    // Accepted against the same prior state
    let mut same_state = Node::new(Wallet::new());
    assert!(matches!(
        same_state.handle_message(Message::LatestBlock {
            block: reparsed.clone()
        }),
        Reaction::Broadcast(_)
    ));

    // Rejected against modified prior state: this node already advanced
    let mut advanced = Node::new(Wallet::new());
    mine_block(&mut advanced);
    assert!(matches!(
        advanced.handle_message(Message::LatestBlock { block: reparsed }),
        Reaction::Respond(Message::Blockchain { .. })
    ));
}

#[test]
fn test_required_difficulty_rises_while_mining_fast() {
    let mut node = Node::new(Wallet::new());
    for _ in 0..4 {
        mine_block(&mut node);
    }
    // Consecutive blocks land a second or so apart, well under the fast
    // threshold, so the requirement climbs with each one (the first gap,
    // from the genesis block at time zero, is slow and clamps at zero).
    let required = work::next_difficulty(node.chain().blocks());
    assert!(
        (1..=3).contains(&required),
        "unexpected required difficulty {required}"
    );
}

#[test]
fn test_peers_sync_over_tcp() {
    let port_a = 36151;
    let port_b = 36152;

    // Node A has mined a block; node B is fresh
    let mut mined = Node::new(Wallet::new());
    mine_block(&mut mined);
    let tip_a = mined.chain().tip().get_hash().to_string();

    let node_a = Arc::new(Mutex::new(mined));
    let peers_a = Arc::new(Peers::new());
    let server_a = Arc::new(Server::new(Arc::clone(&node_a), Arc::clone(&peers_a)));
    {
        let server = Arc::clone(&server_a);
        thread::spawn(move || server.run(port_a));
    }

    let node_b = Arc::new(Mutex::new(Node::new(Wallet::new())));
    let peers_b = Arc::new(Peers::new());
    let server_b = Arc::new(Server::new(Arc::clone(&node_b), Arc::clone(&peers_b)));
    {
        let server = Arc::clone(&server_b);
        thread::spawn(move || server.run(port_b));
    }

    // Give the listeners a moment, then dial A from B. B greets with its
    // genesis tip; A answers with its chain; B swaps it in.
    thread::sleep(Duration::from_millis(100));
    server_b.connect(("127.0.0.1", port_a)).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        {
            let guard = node_b.lock().unwrap();
            if guard.chain().height() == 2 {
                assert_eq!(guard.chain().tip().get_hash(), tip_a);
                break;
            }
        }
        assert!(Instant::now() < deadline, "node B never caught up");
        thread::sleep(Duration::from_millis(20));
    }
}
