use clap::Parser;
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(
    name = "ember-chain",
    about = "Minimalist proof-of-work cryptocurrency node"
)]
pub struct Opt {
    #[arg(long, help = "TCP port to listen on (overrides NODE_PORT)")]
    pub port: Option<u16>,

    #[arg(
        long = "peer",
        help = "Peer to dial at startup (host[:port]); may repeat"
    )]
    pub peers: Vec<String>,

    #[arg(long, help = "Start mining immediately")]
    pub mine: bool,
}

/// The interactive dot-commands accepted on stdin while the node runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Start the mining timer
    Mine,
    /// Stop the mining timer
    Stop,
    /// Dial a peer
    Add(String),
    /// List live peer links
    Peers,
    /// Print the chain, one block per line
    Chain,
    /// Print the confirmed UTXO set
    Utxos,
    /// Print observed inter-block times
    Intervals,
    /// Print our confirmed balance
    Balance,
    /// Print our public key
    Key,
    /// Build, pool and broadcast a spend
    Send { amount: u64, recipient: String },
    /// Print pending pool entries
    Pool,
    /// Drop all pending pool entries
    Clear,
    /// Leave the REPL and shut down
    Exit,
}

impl FromStr for ReplCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let command = parts.next().ok_or_else(|| String::from("Empty command"))?;

        let parsed = match command {
            ".mine" => ReplCommand::Mine,
            ".stop" => ReplCommand::Stop,
            ".add" => {
                let addr = parts
                    .next()
                    .ok_or_else(|| String::from("Usage: .add <ip[:port]>"))?;
                ReplCommand::Add(addr.to_string())
            }
            ".peers" => ReplCommand::Peers,
            ".chain" => ReplCommand::Chain,
            ".utxos" => ReplCommand::Utxos,
            ".intervals" => ReplCommand::Intervals,
            ".balance" => ReplCommand::Balance,
            ".key" => ReplCommand::Key,
            ".send" => {
                let amount = parts
                    .next()
                    .ok_or_else(|| String::from("Usage: .send <amount> <publicKey>"))?
                    .parse::<u64>()
                    .map_err(|e| format!("Invalid amount: {e}"))?;
                let recipient = parts
                    .next()
                    .ok_or_else(|| String::from("Usage: .send <amount> <publicKey>"))?;
                ReplCommand::Send {
                    amount,
                    recipient: recipient.to_string(),
                }
            }
            ".pool" => ReplCommand::Pool,
            ".clear" => ReplCommand::Clear,
            ".exit" => ReplCommand::Exit,
            other => {
                return Err(format!(
                    "Unknown command: {other}. Commands: .mine .stop .add .peers .chain \
                     .utxos .intervals .balance .key .send .pool .clear .exit"
                ))
            }
        };

        if parts.next().is_some() {
            return Err(format!("Trailing arguments after {command}"));
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_commands() {
        assert_eq!(".mine".parse::<ReplCommand>().unwrap(), ReplCommand::Mine);
        assert_eq!(".exit".parse::<ReplCommand>().unwrap(), ReplCommand::Exit);
        assert_eq!(
            " .balance ".trim().parse::<ReplCommand>().unwrap(),
            ReplCommand::Balance
        );
    }

    #[test]
    fn test_add_takes_an_address() {
        assert_eq!(
            ".add 10.0.0.7:3151".parse::<ReplCommand>().unwrap(),
            ReplCommand::Add("10.0.0.7:3151".to_string())
        );
        assert!(".add".parse::<ReplCommand>().is_err());
    }

    #[test]
    fn test_send_takes_amount_and_key() {
        assert_eq!(
            ".send 25 02abcd".parse::<ReplCommand>().unwrap(),
            ReplCommand::Send {
                amount: 25,
                recipient: "02abcd".to_string()
            }
        );
        assert!(".send twelve 02abcd".parse::<ReplCommand>().is_err());
        assert!(".send 25".parse::<ReplCommand>().is_err());
    }

    #[test]
    fn test_unknown_and_trailing_rejected() {
        assert!(".fly".parse::<ReplCommand>().is_err());
        assert!(".mine now".parse::<ReplCommand>().is_err());
    }
}
