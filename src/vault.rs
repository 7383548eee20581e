// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reversible encryption of stored site secrets.
//!
//! Secrets are encrypted with AES-256-CBC under a key derived once from a
//! process-wide secret. Each encryption draws a fresh IV; the stored blob is
//! `base64(iv || ciphertext)`. The empty string is stored as an empty blob and
//! never reaches the cipher.
//!
//! Rotating the process secret invalidates every stored blob. There is no
//! migration path.

use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{
    block_padding::Pkcs7, generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut, KeyIvInit,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const IV_LEN: usize = 16;

/// Environment variable holding the process-wide vault secret.
pub const SECRET_KEY_ENV: &str = "BDEPLOY_SECRET_KEY";

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Vault secret is not configured; set {SECRET_KEY_ENV} or pass --secret-key-file")]
    MissingSecret,

    #[error("Vault secret file {path} could not be read: {source}")]
    SecretFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored secret is not valid base64")]
    Encoding,

    #[error("Stored secret is too short to contain an IV")]
    Truncated,

    #[error("Stored secret could not be decrypted (wrong key or corrupt data)")]
    Decrypt,

    #[error("Decrypted secret is not valid UTF-8")]
    Utf8,
}

/// Symmetric vault for site secrets.
pub struct CredentialVault {
    key: Zeroizing<[u8; 32]>,
}

impl CredentialVault {
    /// Derive the vault key from a process-wide secret.
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Build the vault from the `BDEPLOY_SECRET_KEY` environment variable.
    pub fn from_env() -> Result<Self, VaultError> {
        match std::env::var(SECRET_KEY_ENV) {
            Ok(secret) if !secret.is_empty() => Ok(Self::from_secret(&secret)),
            _ => Err(VaultError::MissingSecret),
        }
    }

    /// Build the vault from a file holding the secret. Surrounding whitespace is ignored.
    pub fn from_file(path: &Path) -> Result<Self, VaultError> {
        let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
            VaultError::SecretFile {
                path: path.display().to_string(),
                source,
            }
        })?);
        let secret = contents.trim();
        if secret.is_empty() {
            return Err(VaultError::MissingSecret);
        }
        Ok(Self::from_secret(secret))
    }

    /// Encrypt `plaintext` into a storable blob. Empty input yields an empty blob.
    pub fn encrypt(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(
            GenericArray::from_slice(&self.key[..]),
            GenericArray::from_slice(&iv),
        )
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);
        STANDARD.encode(blob)
    }

    /// Decrypt a stored blob. An empty blob decrypts to an empty string.
    pub fn decrypt(&self, blob: &str) -> Result<Zeroizing<String>, VaultError> {
        if blob.is_empty() {
            return Ok(Zeroizing::new(String::new()));
        }

        let data = STANDARD.decode(blob).map_err(|_| VaultError::Encoding)?;
        if data.len() <= IV_LEN {
            return Err(VaultError::Truncated);
        }
        let (iv, ciphertext) = data.split_at(IV_LEN);

        let plaintext = Aes256CbcDec::new_from_slices(&self.key[..], iv)
            .map_err(|_| VaultError::Decrypt)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| VaultError::Decrypt)?;

        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|_| VaultError::Utf8)
    }
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let vault = CredentialVault::from_secret("process-secret");
        let long = "x".repeat(64);
        let secrets = ["", "p", "correct horse battery staple", "pässwörd-✓", long.as_str()];
        for secret in secrets {
            let blob = vault.encrypt(secret);
            assert_eq!(vault.decrypt(&blob).unwrap().as_str(), secret);
        }
    }

    #[test]
    fn test_empty_is_sentinel() {
        let vault = CredentialVault::from_secret("k");
        assert_eq!(vault.encrypt(""), "");
        assert_eq!(vault.decrypt("").unwrap().as_str(), "");
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let vault = CredentialVault::from_secret("k");
        let a = vault.encrypt("same");
        let b = vault.encrypt("same");
        assert_ne!(a, b);
        assert_eq!(vault.decrypt(&a).unwrap().as_str(), "same");
        assert_eq!(vault.decrypt(&b).unwrap().as_str(), "same");
    }

    #[test]
    fn test_rotated_key_cannot_decrypt() {
        let old = CredentialVault::from_secret("old");
        let new = CredentialVault::from_secret("new");
        let blob = old.encrypt("hunter2");
        // Padding check almost always fails under a different key; if it happens
        // to pass, the bytes are still not the original secret.
        match new.decrypt(&blob) {
            Err(_) => {}
            Ok(plain) => assert_ne!(plain.as_str(), "hunter2"),
        }
    }

    #[test]
    fn test_rejects_garbage() {
        let vault = CredentialVault::from_secret("k");
        assert!(matches!(vault.decrypt("%%%"), Err(VaultError::Encoding)));
        assert!(matches!(
            vault.decrypt(&STANDARD.encode([0u8; 8])),
            Err(VaultError::Truncated)
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let vault = CredentialVault::from_secret("k");
        assert!(format!("{vault:?}").contains("<redacted>"));
    }
}
