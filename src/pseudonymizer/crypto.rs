//! Hashing and the hybrid-encryption envelope for pseudonym records.
//!
//! `H`'s byte order is `utf8(x) || salt_bytes` (plaintext-then-salt); this
//! is the order that reproduces the reference fixed hash values below. See
//! DESIGN.md for how that was determined.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::{Oaep, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::ProcessingError;

const AES_KEY_LEN: usize = 32;
const AES_NONCE_LEN: usize = 12;

/// `H(x) = lowerhex(SHA256(utf8(x) || salt_bytes))`.
pub fn hash(salt: &[u8], x: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(x.as_bytes());
    hasher.update(salt);
    hex::encode(hasher.finalize())
}

/// Two RSA public keys used to build the `origin` envelope: an inner key
/// that only the analyst tool can unwrap, and an outer key used by the
/// depseudonymization tool to recover the symmetric key.
pub struct OriginKeys {
    pub analyst: RsaPublicKey,
    pub depseudo: RsaPublicKey,
}

/// Build the `origin` envelope for cleartext `x`:
/// `base64(rsa_oaep(depseudo_pub, aes_key||nonce) || aes_gcm(aes_key, nonce, rsa_oaep(analyst_pub, x)))`.
pub fn origin(keys: &OriginKeys, x: &str) -> Result<String, ProcessingError> {
    let mut rng = OsRng;
    let padding_analyst = Oaep::new::<Sha256>();
    let analyst_wrapped = keys
        .analyst
        .encrypt(&mut rng, padding_analyst, x.as_bytes())
        .map_err(|e| ProcessingError::Encryption(e.to_string()))?;

    let mut aes_key_bytes = [0u8; AES_KEY_LEN];
    let mut nonce_bytes = [0u8; AES_NONCE_LEN];
    rng.fill_bytes(&mut aes_key_bytes);
    rng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&aes_key_bytes));
    let nonce = Nonce::from_slice(&nonce_bytes);
    let aes_ciphertext = cipher
        .encrypt(nonce, analyst_wrapped.as_slice())
        .map_err(|e| ProcessingError::Encryption(e.to_string()))?;

    let mut key_and_nonce = Vec::with_capacity(AES_KEY_LEN + AES_NONCE_LEN);
    key_and_nonce.extend_from_slice(&aes_key_bytes);
    key_and_nonce.extend_from_slice(&nonce_bytes);

    let padding_depseudo = Oaep::new::<Sha256>();
    let wrapped_key = keys
        .depseudo
        .encrypt(&mut rng, padding_depseudo, key_and_nonce.as_slice())
        .map_err(|e| ProcessingError::Encryption(e.to_string()))?;

    let mut envelope = Vec::with_capacity(wrapped_key.len() + aes_ciphertext.len());
    envelope.extend_from_slice(&wrapped_key);
    envelope.extend_from_slice(&aes_ciphertext);

    use base64::Engine;
    Ok(base64::engine::general_purpose::STANDARD.encode(envelope))
}
