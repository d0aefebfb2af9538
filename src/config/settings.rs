use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::sync::RwLock;
use std::time::Duration;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

/// Default TCP port for peer links
pub const DEFAULT_PORT: u16 = 3151;
/// Default cap on inbound peer connections
pub const DEFAULT_MAX_INBOUND_PEERS: usize = 100;
/// Default delay between mining attempts, in milliseconds
pub const DEFAULT_MINE_INTERVAL_MS: u64 = 50;

const NODE_PORT_KEY: &str = "NODE_PORT";
const MAX_INBOUND_PEERS_KEY: &str = "MAX_INBOUND_PEERS";
const MINE_INTERVAL_MS_KEY: &str = "MINE_INTERVAL_MS";

pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        let mut map = HashMap::new();
        for key in [NODE_PORT_KEY, MAX_INBOUND_PEERS_KEY, MINE_INTERVAL_MS_KEY] {
            if let Ok(value) = env::var(key) {
                map.insert(String::from(key), value);
            }
        }

        Config {
            inner: RwLock::new(map),
        }
    }

    pub fn get_port(&self) -> u16 {
        self.get_parsed(NODE_PORT_KEY).unwrap_or(DEFAULT_PORT)
    }

    pub fn set_port(&self, port: u16) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(String::from(NODE_PORT_KEY), port.to_string());
    }

    pub fn get_max_inbound_peers(&self) -> usize {
        self.get_parsed(MAX_INBOUND_PEERS_KEY)
            .unwrap_or(DEFAULT_MAX_INBOUND_PEERS)
    }

    pub fn get_mine_interval(&self) -> Duration {
        Duration::from_millis(
            self.get_parsed(MINE_INTERVAL_MS_KEY)
                .unwrap_or(DEFAULT_MINE_INTERVAL_MS),
        )
    }

    fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner.get(key).and_then(|value| value.parse().ok())
    }
}
