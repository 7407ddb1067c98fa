//! Hybrid public-key encryption: ephemeral X25519 + AES-128-GCM.
//!
//! Envelope layout for a plaintext of length `L`:
//! `eph_pub(32) || nonce(12) || ciphertext(L) || tag(16)`, total `L + 60`
//! bytes. The AEAD's associated data binds the fixed tag `"PrioPacket"`, the
//! ephemeral public key, and the nonce, so a ciphertext cannot be replayed
//! under a different ephemeral key or nonce without failing to decrypt.

#![forbid(unsafe_code)]

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::{Error, Result};

const CURVE25519_KEY_LEN: usize = 32;
const GCM_IV_LEN_BYTES: usize = 12;
const GCM_TAG_LEN_BYTES: usize = 16;
const PRIO_TAG: &[u8] = b"PrioPacket";
const AAD_LEN: usize = PRIO_TAG.len() + CURVE25519_KEY_LEN + GCM_IV_LEN_BYTES;
const HEADER_LEN: usize = CURVE25519_KEY_LEN + GCM_IV_LEN_BYTES + GCM_TAG_LEN_BYTES;

/// An X25519 private key, zeroized on drop.
pub struct PrivateKey(StaticSecret);

/// An X25519 public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Key(pub [u8; CURVE25519_KEY_LEN]);

impl PrivateKey {
    /// Generate a fresh keypair.
    pub fn generate() -> (PrivateKey, Key) {
        let sk = StaticSecret::random_from_rng(rand::thread_rng());
        let pk = PublicKey::from(&sk);
        (PrivateKey(sk), Key(*pk.as_bytes()))
    }

    /// Import a private key from its 32-byte clamped scalar representation.
    pub fn import(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; CURVE25519_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| Error::CryptoFailure("private key must be 32 bytes".into()))?;
        Ok(PrivateKey(StaticSecret::from(arr)))
    }

    /// Export the raw 32-byte scalar.
    pub fn export(&self) -> [u8; CURVE25519_KEY_LEN] {
        self.0.to_bytes()
    }

    /// Derive the corresponding public key.
    pub fn public_key(&self) -> Key {
        Key(*PublicKey::from(&self.0).as_bytes())
    }

    /// Import a private key from its 64-character hex representation.
    pub fn import_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::CryptoFailure(format!("bad hex: {e}")))?;
        Self::import(&bytes)
    }

    /// Export the private key as a 64-character hex string.
    pub fn export_hex(&self) -> String {
        hex::encode(self.export())
    }
}

impl Key {
    /// Import a public key from its 32-byte Montgomery-u representation.
    pub fn import(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; CURVE25519_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| Error::CryptoFailure("public key must be 32 bytes".into()))?;
        Ok(Key(arr))
    }

    /// Export the raw 32 bytes.
    pub fn export(&self) -> [u8; CURVE25519_KEY_LEN] {
        self.0
    }

    /// Import a public key from its 64-character hex representation.
    pub fn import_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::CryptoFailure(format!("bad hex: {e}")))?;
        Self::import(&bytes)
    }

    /// Export the public key as a 64-character hex string.
    pub fn export_hex(&self) -> String {
        hex::encode(self.0)
    }
}

fn derive_aes_key(dh_secret: &[u8; 32]) -> [u8; 16] {
    // SHA-256-based KDF (PKCS#11 CKD_SHA256_KDF): hash the raw ECDH output,
    // keep the low 16 bytes as the AES-128 key.
    let digest = Sha256::digest(dh_secret);
    let mut key = [0u8; 16];
    key.copy_from_slice(&digest[..16]);
    key
}

fn build_aad(eph_pub: &[u8; 32], nonce: &[u8; 12]) -> [u8; AAD_LEN] {
    let mut aad = [0u8; AAD_LEN];
    let mut off = 0;
    aad[off..off + PRIO_TAG.len()].copy_from_slice(PRIO_TAG);
    off += PRIO_TAG.len();
    aad[off..off + 32].copy_from_slice(eph_pub);
    off += 32;
    aad[off..off + 12].copy_from_slice(nonce);
    aad
}

/// Maximum plaintext length accepted by `encrypt`, matching the original
/// implementation's conservative bound.
pub const MAX_ENCRYPT_LEN: usize = 1 << 20;

/// Encrypt `plaintext` for the holder of `recipient`.
pub fn encrypt(recipient: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
    if plaintext.len() >= MAX_ENCRYPT_LEN {
        return Err(Error::BadInput("plaintext too large".into()));
    }

    let eph_sk = StaticSecret::random_from_rng(rand::thread_rng());
    let eph_pk = PublicKey::from(&eph_sk);
    let recipient_pk = PublicKey::from(recipient.0);

    let mut shared = eph_sk.diffie_hellman(&recipient_pk).to_bytes();
    let aes_key = derive_aes_key(&shared);
    shared.zeroize();

    let mut nonce_bytes = [0u8; GCM_IV_LEN_BYTES];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce_bytes);

    let eph_pub_bytes = *eph_pk.as_bytes();
    let aad = build_aad(&eph_pub_bytes, &nonce_bytes);

    let cipher = Aes128Gcm::new_from_slice(&aes_key)
        .map_err(|e| Error::CryptoFailure(format!("key init: {e}")))?;
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: &aad })
        .map_err(|_| Error::CryptoFailure("AEAD encryption failed".into()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + plaintext.len());
    out.extend_from_slice(&eph_pub_bytes);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a ciphertext produced by `encrypt` using `priv_key`.
pub fn decrypt(priv_key: &PrivateKey, input: &[u8]) -> Result<Vec<u8>> {
    if input.len() < HEADER_LEN {
        return Err(Error::CryptoFailure("ciphertext shorter than header".into()));
    }

    let eph_pub_bytes: [u8; 32] = input[..32].try_into().unwrap();
    let nonce_bytes: [u8; GCM_IV_LEN_BYTES] = input[32..32 + GCM_IV_LEN_BYTES].try_into().unwrap();
    let body = &input[32 + GCM_IV_LEN_BYTES..];

    let eph_pk = PublicKey::from(eph_pub_bytes);
    let mut shared = priv_key.0.diffie_hellman(&eph_pk).to_bytes();
    let aes_key = derive_aes_key(&shared);
    shared.zeroize();

    let aad = build_aad(&eph_pub_bytes, &nonce_bytes);

    let cipher = Aes128Gcm::new_from_slice(&aes_key)
        .map_err(|e| Error::CryptoFailure(format!("key init: {e}")))?;
    let nonce = Nonce::from_slice(&nonce_bytes);
    cipher
        .decrypt(nonce, Payload { msg: body, aad: &aad })
        .map_err(|_| Error::CryptoFailure("AEAD tag verification failed".into()))
}
