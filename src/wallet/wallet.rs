use secp256k1::{PublicKey, SecretKey};

use crate::core::transaction::{MAX_SAFE_INTEGER, MIN_OUTPUT_AMOUNT};
use crate::core::{canonical, Input, Output, Transaction, Utxo};
use crate::error::{NodeError, Result};
use crate::storage::UtxoSet;
use crate::utils::{
    keypair_from_secret, parse_public_key, public_key_hex, random_keypair, sign_tx_hash,
};

/// One secp256k1 keypair, held for the process lifetime. Spends are built
/// from the confirmed UTXOs locked to this key.
pub struct Wallet {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet {
    pub fn new() -> Wallet {
        let (secret_key, public_key) = random_keypair();
        Wallet {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret(secret: &[u8]) -> Result<Wallet> {
        let (secret_key, public_key) = keypair_from_secret(secret)?;
        Ok(Wallet {
            secret_key,
            public_key,
        })
    }

    pub fn public_key_hex(&self) -> String {
        public_key_hex(&self.public_key)
    }

    pub fn balance(&self, utxos: &UtxoSet) -> u64 {
        utxos.balance_of(&self.public_key_hex())
    }

    /// Build and sign a transaction sending `amount` to `recipient`, funded
    /// from this wallet's UTXOs in iteration order. The spend must cover the
    /// amount, the one-unit burn and one fee unit per input; change above
    /// one unit comes back to this wallet, a zero change is simply absent.
    pub fn make_tx(&self, amount: u64, recipient: &str, utxos: &UtxoSet) -> Result<Transaction> {
        if amount <= MIN_OUTPUT_AMOUNT {
            return Err(NodeError::Structural(format!(
                "Send amount must exceed {MIN_OUTPUT_AMOUNT}, got {amount}"
            )));
        }
        if amount > MAX_SAFE_INTEGER {
            return Err(NodeError::Structural(format!(
                "Send amount {amount} exceeds the safe integer range"
            )));
        }
        parse_public_key(recipient)?;

        let own_key = self.public_key_hex();
        let mut selected: Vec<&Utxo> = vec![];
        let mut total: u64 = 0;
        for utxo in utxos.iter().filter(|u| u.get_public_key() == own_key) {
            selected.push(utxo);
            total += utxo.get_amount();
            let needed = amount + 1 + selected.len() as u64;
            // A change of exactly one unit could neither be emitted (dust
            // floor) nor burned (the net-amount rule is exact), so keep
            // accumulating past that case.
            if total >= needed && total - needed != 1 {
                return self.build_spend(amount, recipient, &selected, total - needed);
            }
        }

        Err(NodeError::InsufficientFunds {
            required: amount + 1 + selected.len().max(1) as u64,
            available: total,
        })
    }

    fn build_spend(
        &self,
        amount: u64,
        recipient: &str,
        selected: &[&Utxo],
        change: u64,
    ) -> Result<Transaction> {
        let mut outputs = vec![Output::new(recipient, amount)];
        if change > 1 {
            outputs.push(Output::new(self.public_key_hex(), change));
        }

        let unsigned_inputs: Vec<Input> = selected
            .iter()
            .map(|utxo| Input::new(utxo.get_hash(), utxo.get_index(), ""))
            .collect();
        let unsigned = Transaction::new(unsigned_inputs, outputs.clone(), String::new());
        let hash = canonical::transaction_hash(&unsigned)?;

        let signature = sign_tx_hash(&self.secret_key, &hash)?;
        let inputs = selected
            .iter()
            .map(|utxo| Input::new(utxo.get_hash(), utxo.get_index(), signature.clone()))
            .collect();
        Ok(Transaction::new(inputs, outputs, hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{apply_transaction, Block};
    use crate::utils::sha256_hex;

    fn funded_wallet(amounts: &[u64]) -> (Wallet, UtxoSet) {
        let wallet = Wallet::new();
        let mut utxos = UtxoSet::new();
        for (index, amount) in amounts.iter().enumerate() {
            let hash = sha256_hex(format!("funding {index}").as_bytes());
            utxos.insert(Utxo::new(hash, 0, wallet.public_key_hex(), *amount));
        }
        (wallet, utxos)
    }

    #[test]
    fn test_make_tx_always_validates_against_same_utxos() {
        let recipient = Wallet::new().public_key_hex();
        for amounts in [vec![10], vec![5, 5, 5], vec![2, 2, 2, 2, 2, 2]] {
            let (wallet, utxos) = funded_wallet(&amounts);
            for amount in [3u64, 4, 5, 7] {
                if let Ok(tx) = wallet.make_tx(amount, &recipient, &utxos) {
                    let mut block = Block::building(1);
                    let mut working = utxos.clone();
                    apply_transaction(&tx, &mut block, &mut working).unwrap();
                    assert_eq!(working.balance_of(&recipient), amount);
                }
            }
        }
    }

    #[test]
    fn test_change_returns_to_sender() {
        let recipient = Wallet::new().public_key_hex();
        let (wallet, utxos) = funded_wallet(&[10]);
        // 10 in = 6 sent + 1 fee + 1 burn + 2 change
        let tx = wallet.make_tx(6, &recipient, &utxos).unwrap();
        assert_eq!(tx.get_outputs().len(), 2);
        assert_eq!(tx.get_outputs()[1].get_public_key(), wallet.public_key_hex());
        assert_eq!(tx.get_outputs()[1].get_amount(), 2);
    }

    #[test]
    fn test_exact_spend_has_no_change_output() {
        let recipient = Wallet::new().public_key_hex();
        let (wallet, utxos) = funded_wallet(&[10]);
        // 10 in = 8 sent + 1 fee + 1 burn, change zero
        let tx = wallet.make_tx(8, &recipient, &utxos).unwrap();
        assert_eq!(tx.get_outputs().len(), 1);
    }

    #[test]
    fn test_change_of_one_pulls_another_input() {
        let recipient = Wallet::new().public_key_hex();
        let (wallet, utxos) = funded_wallet(&[10, 5]);
        // The first UTXO alone would leave a change of exactly one unit
        // (10 - 7 - 1 - 1), which no valid transaction can carry; the wallet
        // must fund with both UTXOs instead.
        let tx = wallet.make_tx(7, &recipient, &utxos).unwrap();
        assert_eq!(tx.get_inputs().len(), 2);
        // 15 in = 7 sent + 2 fees + 1 burn + 5 change
        assert_eq!(tx.get_outputs()[1].get_amount(), 5);

        let mut block = Block::building(1);
        let mut working = utxos.clone();
        apply_transaction(&tx, &mut block, &mut working).unwrap();
    }

    #[test]
    fn test_insufficient_funds() {
        let recipient = Wallet::new().public_key_hex();
        let (wallet, utxos) = funded_wallet(&[4]);
        let err = wallet.make_tx(5, &recipient, &utxos).unwrap_err();
        assert!(matches!(err, NodeError::InsufficientFunds { .. }));

        let (poor_wallet, empty) = (Wallet::new(), UtxoSet::new());
        let err = poor_wallet.make_tx(5, &recipient, &empty).unwrap_err();
        assert!(matches!(
            err,
            NodeError::InsufficientFunds {
                available: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_tiny_amount_rejected() {
        let recipient = Wallet::new().public_key_hex();
        let (wallet, utxos) = funded_wallet(&[10]);
        assert!(wallet.make_tx(2, &recipient, &utxos).is_err());
        assert!(wallet.make_tx(0, &recipient, &utxos).is_err());
    }

    #[test]
    fn test_bad_recipient_rejected() {
        let (wallet, utxos) = funded_wallet(&[10]);
        assert!(wallet.make_tx(5, "not a key", &utxos).is_err());
    }

    #[test]
    fn test_only_own_utxos_are_spent() {
        let recipient = Wallet::new().public_key_hex();
        let (wallet, mut utxos) = funded_wallet(&[4]);
        // A fat UTXO belonging to someone else must not be selected
        utxos.insert(Utxo::new(
            sha256_hex(b"foreign"),
            0,
            Wallet::new().public_key_hex(),
            1000,
        ));
        let err = wallet.make_tx(5, &recipient, &utxos).unwrap_err();
        assert!(matches!(err, NodeError::InsufficientFunds { .. }));
    }
}
