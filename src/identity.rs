//! Keyed identities: private key to address and subaccount derivation.
//!
//! Injective uses ethsecp256k1 accounts: the bech32 address is derived from
//! the keccak256 hash of the uncompressed public key (Ethereum-style), not
//! the usual cosmos sha256/ripemd160 path. Subaccounts are the 20-byte
//! account bytes concatenated with a 12-byte big-endian index.

use cosmrs::AccountId;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use secrecy::{ExposeSecret, SecretString};
use sha3::{Digest, Keccak256};

use crate::error::{ChainError, ChainResult};

/// Bech32 human-readable prefix for Injective account addresses.
pub const ADDRESS_PREFIX: &str = "inj";

const PRIVATE_KEY_BYTES: usize = 32;

/// A signing identity derived from a raw private key.
///
/// Derivation is pure and deterministic; the same key always yields the same
/// address and subaccount ids. The key itself is never persisted and never
/// appears in `Debug` output.
pub struct KeyedIdentity {
    signing_key: SigningKey,
    compressed_public_key: [u8; 33],
    account_bytes: [u8; 20],
    address: AccountId,
    bech32: String,
}

impl KeyedIdentity {
    /// Derive an identity from a hex-encoded private key (`0x` prefix
    /// optional).
    pub fn from_hex(private_key: &SecretString) -> ChainResult<Self> {
        let raw = private_key.expose_secret().trim();
        let raw = raw.strip_prefix("0x").unwrap_or(raw);

        let bytes = hex::decode(raw).map_err(|e| ChainError::InvalidKeyFormat {
            reason: format!("not valid hex: {e}"),
        })?;
        if bytes.len() != PRIVATE_KEY_BYTES {
            return Err(ChainError::InvalidKeyFormat {
                reason: format!("expected {PRIVATE_KEY_BYTES} bytes, got {}", bytes.len()),
            });
        }

        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|_| ChainError::InvalidKeyFormat {
                reason: "not a valid secp256k1 scalar".to_string(),
            })?;

        Self::from_signing_key(signing_key)
    }

    fn from_signing_key(signing_key: SigningKey) -> ChainResult<Self> {
        let verifying_key = signing_key.verifying_key();
        let compressed_public_key: [u8; 33] = verifying_key
            .to_encoded_point(true)
            .as_bytes()
            .try_into()
            .map_err(|_| ChainError::InvalidKeyFormat {
                reason: "public key compression failed".to_string(),
            })?;

        let account_bytes = ethereum_account_bytes(verifying_key);
        let address = AccountId::new(ADDRESS_PREFIX, &account_bytes).map_err(|e| {
            ChainError::InvalidKeyFormat {
                reason: format!("bech32 encoding failed: {e}"),
            }
        })?;
        let bech32 = address.to_string();

        Ok(Self {
            signing_key,
            compressed_public_key,
            account_bytes,
            address,
            bech32,
        })
    }

    /// Bech32 account address, e.g. `inj1...`.
    pub fn address(&self) -> &str {
        &self.bech32
    }

    pub fn account_id(&self) -> &AccountId {
        &self.address
    }

    pub(crate) fn account_bytes(&self) -> [u8; 20] {
        self.account_bytes
    }

    /// Compressed (33-byte) secp256k1 public key, as carried in signer info.
    pub fn public_key_bytes(&self) -> &[u8; 33] {
        &self.compressed_public_key
    }

    /// Hex Ethereum-style address for the same key, `0x` + 40 lowercase hex.
    pub fn ethereum_address(&self) -> String {
        format!("0x{}", hex::encode(self.account_bytes))
    }

    /// Subaccount identifier for the given index: the 20 account bytes and a
    /// 12-byte big-endian index, hex encoded with a `0x` prefix (66 chars).
    pub fn subaccount_id(&self, index: u32) -> String {
        format!("0x{}{:024x}", hex::encode(self.account_bytes), index)
    }

    /// Sign arbitrary bytes with the ethsecp256k1 scheme: keccak256 digest,
    /// deterministic ECDSA, 64-byte `r || s` output with low-s normalization.
    pub fn sign(&self, payload: &[u8]) -> ChainResult<Vec<u8>> {
        let digest = Keccak256::digest(payload);
        let signature: Signature =
            self.signing_key
                .sign_prehash(&digest)
                .map_err(|e| ChainError::Unknown {
                    cause: format!("signing failed: {e}"),
                })?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_bytes().to_vec())
    }
}

impl std::fmt::Debug for KeyedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedIdentity")
            .field("address", &self.bech32)
            .finish_non_exhaustive()
    }
}

fn ethereum_account_bytes(verifying_key: &VerifyingKey) -> [u8; 20] {
    let uncompressed = verifying_key.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag; hash the 64 coordinate bytes.
    let digest = Keccak256::digest(&uncompressed.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    out
}
