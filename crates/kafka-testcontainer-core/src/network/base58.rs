//! Random Base58 identifiers.
//!
//! Uses the Bitcoin alphabet, which drops `0`, `O`, `I` and `l`, so the result
//! is safe to embed in DNS names and container names.

use rand::Rng;

/// The Base58 alphabet.
pub const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Generate a random Base58 string of `len` characters.
#[must_use]
pub fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
