//! # Secret values and lookup keys.
//!
//! Backend values may be stored encrypted: the text is gzip-compressed,
//! encrypted as an OpenPGP message to one or more recipients and base64 encoded.
//! [`decrypt`] reverses that with the secret keys of a [`Keyring`].
//!
//! [`prefix_keys`] builds the namespaced key list a backend is queried with.
//!
//! ```text
//! decrypt:  base64 ──► OpenPGP open (keyring) ──► literal body ──► gunzip ──► text
//! ```

use std::io::Read;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::read::GzDecoder;
use pgp::{Deserializable, Message, SignedSecretKey};

use crate::error::SecretError;

/// Secret keys a message may be addressed to.
#[derive(Clone, Debug, Default)]
pub struct Keyring {
    keys: Vec<SignedSecretKey>,
}

impl Keyring {
    /// Wraps already parsed keys.
    pub fn new(keys: Vec<SignedSecretKey>) -> Self {
        Self { keys }
    }

    /// Parses one ASCII-armored secret key block.
    pub fn from_armored(armored: &str) -> Result<Self, pgp::errors::Error> {
        let mut ring = Self::default();
        ring.push_armored(armored)?;
        Ok(ring)
    }

    /// Parses one ASCII-armored secret key block and adds it to the ring.
    pub fn push_armored(&mut self, armored: &str) -> Result<(), pgp::errors::Error> {
        let (key, _headers) = SignedSecretKey::from_string(armored)?;
        self.keys.push(key);
        Ok(())
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if the ring holds no key.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Decrypts a base64-encoded, OpenPGP-encrypted, gzip-compressed value.
///
/// Keys in the ring must not be passphrase protected.
///
/// ### Errors
/// - [`SecretError::Decode`] when `data` is not standard base64;
/// - [`SecretError::Crypto`] when the message cannot be parsed or none of the keys opens it;
/// - [`SecretError::Decompress`] when the body is not gzip or not UTF-8.
///
/// Every error carries `data` unchanged.
pub fn decrypt(data: &str, keyring: &Keyring) -> Result<String, SecretError> {
    let raw = STANDARD.decode(data).map_err(|source| SecretError::Decode {
        input: data.to_owned(),
        source,
    })?;

    let crypto = |source| SecretError::Crypto {
        input: data.to_owned(),
        source,
    };
    let message = Message::from_bytes(raw.as_slice()).map_err(crypto)?;
    let keys: Vec<&SignedSecretKey> = keyring.keys.iter().collect();
    let (decrypted, _key_ids) = message.decrypt(String::new, &keys).map_err(crypto)?;
    let body = decrypted
        .decompress()
        .and_then(|m| m.get_content())
        .map_err(crypto)?
        .unwrap_or_default();

    let mut text = String::new();
    GzDecoder::new(body.as_slice())
        .read_to_string(&mut text)
        .map_err(|source| SecretError::Decompress {
            input: data.to_owned(),
            source,
        })?;
    Ok(text)
}

/// Joins `prefix` with every key, preserving order and duplicates.
///
/// Joining follows slash-path rules: empty elements are ignored and the result
/// is lexically cleaned (`//`, `.` and `..` are resolved).
///
/// ```rust
/// use resvisor::secrets::prefix_keys;
///
/// let keys = vec!["a".to_string(), "b".to_string(), "a".to_string()];
/// assert_eq!(prefix_keys("/app", &keys), ["/app/a", "/app/b", "/app/a"]);
/// ```
pub fn prefix_keys(prefix: &str, keys: &[String]) -> Vec<String> {
    keys.iter().map(|k| join_path(prefix, k)).collect()
}

fn join_path(prefix: &str, key: &str) -> String {
    let joined = match (prefix.is_empty(), key.is_empty()) {
        (true, true) => return String::new(),
        (true, false) => key.to_owned(),
        (false, true) => prefix.to_owned(),
        (false, false) => format!("{prefix}/{key}"),
    };
    clean_path(&joined)
}

/// Lexical slash-path cleaning.
fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            p => parts.push(p),
        }
    }

    let body = parts.join("/");
    match (rooted, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_owned(),
        (false, false) => body,
    }
}
