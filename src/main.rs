// Entry point: bring up the P2P server, dial any peers given on the command
// line, and hand stdin to a small REPL of dot-commands that drives the node.

use clap::Parser;
use ember_chain::core::work;
use ember_chain::{Message, Node, Opt, Peers, ReplCommand, Server, Wallet, GLOBAL_CONFIG};
use log::{error, info, warn, LevelFilter};
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();
    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = opt.port {
        GLOBAL_CONFIG.set_port(port);
    }
    let port = GLOBAL_CONFIG.get_port();

    let wallet = Wallet::new();
    println!("Node key: {}", wallet.public_key_hex());

    let node = Arc::new(Mutex::new(Node::new(wallet)));
    let peers = Arc::new(Peers::new());
    let server = Arc::new(Server::new(Arc::clone(&node), Arc::clone(&peers)));

    {
        let server = Arc::clone(&server);
        thread::spawn(move || {
            if let Err(e) = server.run(port) {
                error!("Server error: {e}");
            }
        });
    }

    for peer in &opt.peers {
        let addr = with_default_port(peer, port);
        match server.connect(addr.as_str()) {
            Ok(()) => println!("Connected to {addr}"),
            Err(e) => println!("Could not reach {addr}: {e}"),
        }
    }

    let miner = MinerControl::new(Arc::clone(&node), Arc::clone(&peers));
    if opt.mine {
        miner.start();
    }

    repl(&node, &peers, &server, &miner)
}

/// Bare addresses get the node's own port appended
fn with_default_port(addr: &str, port: u16) -> String {
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{addr}:{port}")
    }
}

/// The mining timer: while running, each tick takes the node lock for one
/// attempt, so blocks and chains accepted from peers between ticks are
/// picked up by the next candidate automatically.
struct MinerControl {
    node: Arc<Mutex<Node>>,
    peers: Arc<Peers>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl MinerControl {
    fn new(node: Arc<Mutex<Node>>, peers: Arc<Peers>) -> MinerControl {
        MinerControl {
            node,
            peers,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            println!("Already mining");
            return;
        }
        let node = Arc::clone(&self.node);
        let peers = Arc::clone(&self.peers);
        let running = Arc::clone(&self.running);
        let interval = GLOBAL_CONFIG.get_mine_interval();

        let handle = thread::spawn(move || {
            info!("Mining started");
            while running.load(Ordering::SeqCst) {
                let outcome = node
                    .lock()
                    .expect("Failed to acquire node lock - this should never happen")
                    .mine_step();
                match outcome {
                    Ok(Some(block)) => {
                        info!("Mined block {}", block.get_hash());
                        peers.broadcast(&Message::LatestBlock { block });
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Mining attempt failed: {e}"),
                }
                thread::sleep(interval);
            }
            info!("Mining stopped");
        });
        *self
            .worker
            .lock()
            .expect("Failed to acquire miner lock - this should never happen") = Some(handle);
    }

    /// Clears the flag and waits the worker out, so a following `.mine`
    /// never races a timer tick that is still in flight.
    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self
            .worker
            .lock()
            .expect("Failed to acquire miner lock - this should never happen")
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn repl(
    node: &Arc<Mutex<Node>>,
    peers: &Arc<Peers>,
    server: &Arc<Server>,
    miner: &MinerControl,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    prompt()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            prompt()?;
            continue;
        }
        match trimmed.parse::<ReplCommand>() {
            Ok(ReplCommand::Exit) => break,
            Ok(command) => dispatch(command, node, peers, server, miner),
            Err(diagnostic) => println!("{diagnostic}"),
        }
        prompt()?;
    }
    miner.stop();
    Ok(())
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

fn dispatch(
    command: ReplCommand,
    node: &Arc<Mutex<Node>>,
    peers: &Arc<Peers>,
    server: &Arc<Server>,
    miner: &MinerControl,
) {
    let lock_node = || {
        node.lock()
            .expect("Failed to acquire node lock - this should never happen")
    };
    match command {
        ReplCommand::Mine => miner.start(),
        ReplCommand::Stop => miner.stop(),
        ReplCommand::Add(addr) => {
            let addr = with_default_port(&addr, GLOBAL_CONFIG.get_port());
            match server.connect(addr.as_str()) {
                Ok(()) => println!("Connected to {addr}"),
                Err(e) => println!("Could not reach {addr}: {e}"),
            }
        }
        ReplCommand::Peers => {
            let addresses = peers.addresses();
            if addresses.is_empty() {
                println!("No peers");
            }
            for addr in addresses {
                println!("{addr}");
            }
        }
        ReplCommand::Chain => {
            for (height, block) in lock_node().chain().blocks().iter().enumerate() {
                println!(
                    "#{height} time={} nonce={} txs={} difficulty={} hash={}",
                    block.get_time(),
                    block.get_nonce(),
                    block.get_txs().len(),
                    work::block_difficulty(block),
                    block.get_hash(),
                );
            }
        }
        ReplCommand::Utxos => {
            for utxo in lock_node().chain().utxos().iter() {
                println!(
                    "{}:{} {} -> {}",
                    utxo.get_hash(),
                    utxo.get_index(),
                    utxo.get_amount(),
                    utxo.get_public_key(),
                );
            }
        }
        ReplCommand::Intervals => {
            println!("{:?}", lock_node().chain().intervals());
        }
        ReplCommand::Balance => {
            let guard = lock_node();
            let key = guard.wallet().public_key_hex();
            println!("{}", guard.chain().balance_of(&key));
        }
        ReplCommand::Key => {
            println!("{}", lock_node().wallet().public_key_hex());
        }
        ReplCommand::Send { amount, recipient } => {
            let sent = lock_node().send(amount, &recipient);
            match sent {
                Ok(tx) => {
                    let hash = tx.get_hash().to_string();
                    peers.broadcast(&Message::Transaction { tx });
                    println!("Pooled and broadcast {hash}");
                }
                Err(e) => println!("{e}"),
            }
        }
        ReplCommand::Pool => {
            for tx in lock_node().pool().transactions() {
                println!(
                    "{} ({} in, {} out)",
                    tx.get_hash(),
                    tx.get_inputs().len(),
                    tx.get_outputs().len(),
                );
            }
        }
        ReplCommand::Clear => {
            lock_node().clear_pool();
            println!("Pool cleared");
        }
        ReplCommand::Exit => unreachable!("handled by the REPL loop"),
    }
}
