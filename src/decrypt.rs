//! Keyword-index decryption: a RIPEMD-128-keyed stream transform.
//!
//! Only the keyword index of blocks is ever encrypted under this format (the
//! keyword *header* encryption bit requires a license key and is out of scope — see
//! `HeaderDecoder`). The permuted key is the RIPEMD-128 digest of an 8-byte seed
//! built from the block's stored checksum; the same construction appears in
//! `zangloo/mdict`'s `fast_decrypt`/`Ripemd128` pairing, ported here onto the
//! `ripemd` crate instead of a hand-rolled digest.

use ripemd::{Digest, Ripemd128};

pub struct Decryptor;

impl Decryptor {
    /// Decrypt `payload` in place. `key` is the raw 8-byte seed (checksum bytes
    /// followed by the fixed `0x95 0x36 0x00 0x00` suffix); this function hashes it
    /// with RIPEMD-128 to get the actual 16-byte keystream key.
    pub fn decrypt(payload: &mut [u8], key: &[u8; 8]) {
        let mut hasher = Ripemd128::new();
        hasher.update(key);
        let permuted_key = hasher.finalize();

        let mut prev: u8 = 0x36;
        for (i, byte) in payload.iter_mut().enumerate() {
            let swapped = (*byte >> 4) | ((*byte << 4) & 0xF0);
            let transformed = swapped ^ prev ^ (i as u8) ^ permuted_key[i % permuted_key.len()];
            prev = *byte;
            *byte = transformed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypt_is_deterministic_and_key_dependent() {
        let mut a = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut b = a.clone();
        Decryptor::decrypt(&mut a, &[0, 0, 0, 0, 0x95, 0x36, 0, 0]);
        Decryptor::decrypt(&mut b, &[1, 0, 0, 0, 0x95, 0x36, 0, 0]);
        assert_ne!(a, b);
    }
}
