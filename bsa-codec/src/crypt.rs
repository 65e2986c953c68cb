//! XOR stream cipher for encrypted `.INF` text entries.
//!
//! A fixed key sequence is cycled while an 8-bit counter increments per
//! byte; each input byte is XORed with `counter + key[i mod key_len]`.
//! The transform is its own inverse and never fails.

use tracing::trace;

/// Key the game ships for `.INF` entries. [`crypt_with_key`] accepts any
/// other key sequence.
pub const DEFAULT_CRYPT_KEY: [u8; 16] = [
    0xEA, 0x7B, 0x4E, 0xBD, 0x19, 0xC9, 0x38, 0x99,
    0x35, 0x84, 0x0A, 0xD3, 0x61, 0x5E, 0xAF, 0xB6,
];

/// Encrypt or decrypt `data` with the given key. An empty key leaves the
/// data unchanged.
pub fn crypt_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    trace!(len = data.len(), key_len = key.len(), "XOR crypt");
    if key.is_empty() {
        return data.to_vec();
    }
    let mut counter: u8 = 0;
    let mut key_index = 0;
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        out.push(byte ^ counter.wrapping_add(key[key_index]));
        counter = counter.wrapping_add(1);
        key_index = (key_index + 1) % key.len();
    }
    out
}

/// Encrypt or decrypt `data` with [`DEFAULT_CRYPT_KEY`].
pub fn crypt(data: &[u8]) -> Vec<u8> {
    crypt_with_key(data, &DEFAULT_CRYPT_KEY)
}
