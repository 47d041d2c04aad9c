use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::transaction::{Address, UnlockProof};

/// Hex SHA-256 of a compressed public key. This is the identity a
/// perpetuity pays out to and the payload of a plain ownership address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PubKeyHash(String);

impl PubKeyHash {
    /// Parse a hex pubkey hash. Returns normalized (lowercase) hex if valid.
    pub fn from_hex(s: &str) -> Result<Self, &'static str> {
        let bytes = hex::decode(s).map_err(|_| "invalid pubkey hash hex")?;
        if bytes.len() != 32 {
            return Err("pubkey hash must be 32 bytes");
        }
        Ok(Self(hex::encode(bytes)))
    }

    pub fn of_pubkey(pk: &PublicKey) -> Self {
        Self(hex::encode(Sha256::digest(pk.serialize())))
    }

    /// Ownership address for this identity.
    pub fn to_address(&self) -> Address {
        Address::new(self.0.clone())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PubKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A capability able to authorize spends of outputs owned by its identity.
pub trait Signer {
    /// Hex of the compressed public key.
    fn public_key_hex(&self) -> String;

    /// Produce the proof for a transaction sighash.
    fn sign(&self, digest: [u8; 32]) -> UnlockProof;
}

/// secp256k1 keypair used by tests and the dev API.
#[derive(Debug, Clone)]
pub struct Wallet {
    secret: SecretKey,
    public: PublicKey,
}

impl Wallet {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut OsRng);
        Self { secret, public }
    }

    #[cfg(test)]
    pub fn from_secret_hex(sk_hex: &str) -> Result<Self, &'static str> {
        let bytes = hex::decode(sk_hex).map_err(|_| "invalid secret key hex")?;
        let secret = SecretKey::from_slice(&bytes).map_err(|_| "invalid secret key bytes")?;
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Ok(Self { secret, public })
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret.secret_bytes())
    }

    pub fn pubkey_hash(&self) -> PubKeyHash {
        PubKeyHash::of_pubkey(&self.public)
    }

    pub fn address(&self) -> Address {
        self.pubkey_hash().to_address()
    }
}

impl Signer for Wallet {
    fn public_key_hex(&self) -> String {
        hex::encode(self.public.serialize())
    }

    fn sign(&self, digest: [u8; 32]) -> UnlockProof {
        let secp = Secp256k1::signing_only();
        let sig = secp.sign_ecdsa(&Message::from_digest(digest), &self.secret);
        UnlockProof::Signature {
            pubkey: self.public_key_hex(),
            signature: hex::encode(&*sig.serialize_der()),
        }
    }
}

/// Derive the ownership address from a hex compressed pubkey.
pub fn pubkey_to_address_hex(pubkey_hex: &str) -> Result<Address, &'static str> {
    let bytes = hex::decode(pubkey_hex).map_err(|_| "invalid pubkey hex")?;
    let pk = PublicKey::from_slice(&bytes).map_err(|_| "invalid pubkey bytes")?;
    Ok(PubKeyHash::of_pubkey(&pk).to_address())
}

/// Verify a signature (hex DER) against the given pubkey (hex, compressed) and message hash (32 bytes).
pub fn verify_signature_hex(
    pubkey_hex: &str,
    sig_hex: &str,
    msg32: [u8; 32],
) -> Result<bool, &'static str> {
    let secp = Secp256k1::verification_only();

    let sig_bytes = hex::decode(sig_hex).map_err(|_| "invalid signature hex")?;
    let sig = Signature::from_der(&sig_bytes).map_err(|_| "invalid DER signature")?;

    let pk_bytes = hex::decode(pubkey_hex).map_err(|_| "invalid pubkey hex")?;
    let pk = PublicKey::from_slice(&pk_bytes).map_err(|_| "invalid pubkey bytes")?;

    let msg = Message::from_digest_slice(&msg32).map_err(|_| "invalid message length")?;
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}
