//! aes-128-cbc reference used to build oracles for tests. cbc_decrypt
//! validates the pad and leaks the result through its error value, which
//! makes it a padding oracle by construction. keep it away from anything
//! untrusted

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use rand::Rng;

use crate::config::BLOCK_LEN;
use crate::errors::AttackError;

pub fn pkcs_pad(m: &[u8], block_len: usize) -> Vec<u8> {
    // a message already on the boundary gains a full block of padding
    let fill = block_len - m.len() % block_len;
    let mut padded = m.to_vec();
    padded.extend(std::iter::repeat(fill as u8).take(fill));
    padded
}

pub fn pkcs_unpad(m: &[u8], block_len: usize) -> Result<Vec<u8>, AttackError> {
    let Some(&last) = m.last() else {
        return Err(AttackError::InvalidPad);
    };
    let fill = last as usize;
    if fill < 1 || fill > block_len || fill > m.len() {
        return Err(AttackError::InvalidPad);
    }
    if m[m.len() - fill..].iter().any(|&b| b != last) {
        return Err(AttackError::InvalidPad);
    }
    Ok(m[..m.len() - fill].to_vec())
}

pub fn xor_blocks(block: &[u8], key: &[u8]) -> Vec<u8> {
    block
        .iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

pub fn generate_key() -> [u8; BLOCK_LEN] {
    rand::rng().random()
}

pub fn cbc_encrypt(key: &[u8], iv: &[u8], msg: &[u8]) -> Result<Vec<u8>, AttackError> {
    if iv.len() != BLOCK_LEN {
        return Err(AttackError::InvalidInput("iv must be one block long".into()));
    }
    let cipher = Aes128::new_from_slice(key)
        .map_err(|_| AttackError::InvalidInput("aes key must be 16 bytes".into()))?;
    let padded = pkcs_pad(msg, BLOCK_LEN);
    let mut out = Vec::with_capacity(BLOCK_LEN + padded.len());
    out.extend_from_slice(iv);
    let mut prev = iv.to_vec();
    for chunk in padded.chunks(BLOCK_LEN) {
        let mut block = GenericArray::clone_from_slice(&xor_blocks(chunk, &prev));
        cipher.encrypt_block(&mut block);
        prev = block.to_vec();
        out.extend_from_slice(&prev);
    }
    Ok(out)
}

pub fn cbc_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AttackError> {
    if data.len() < 2 * BLOCK_LEN || data.len() % BLOCK_LEN != 0 {
        return Err(AttackError::InvalidCiphertext(
            "need an IV and whole blocks".into(),
        ));
    }
    let cipher = Aes128::new_from_slice(key)
        .map_err(|_| AttackError::InvalidInput("aes key must be 16 bytes".into()))?;
    let mut plain = Vec::with_capacity(data.len() - BLOCK_LEN);
    let mut prev = &data[..BLOCK_LEN];
    for chunk in data[BLOCK_LEN..].chunks(BLOCK_LEN) {
        let mut block = GenericArray::clone_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        plain.extend_from_slice(&xor_blocks(&block, prev));
        prev = chunk;
    }
    pkcs_unpad(&plain, BLOCK_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_the_block_boundary() {
        assert_eq!(pkcs_pad(b"abc", 8), b"abc\x05\x05\x05\x05\x05");
        assert_eq!(pkcs_pad(b"eightchr", 8).len(), 16);
        assert_eq!(&pkcs_pad(b"eightchr", 8)[8..], &[8u8; 8]);
    }

    #[test]
    fn strips_only_a_coherent_pad() {
        assert_eq!(pkcs_unpad(b"abc\x02\x02", 16).unwrap(), b"abc");
        assert!(pkcs_unpad(b"abc\x01\x02", 16).is_err());
        assert!(pkcs_unpad(b"abc\x00", 16).is_err());
        assert!(pkcs_unpad(b"", 16).is_err());
        assert!(pkcs_unpad(b"\x05", 16).is_err());
    }

    #[test]
    fn xor_cycles_the_key() {
        assert_eq!(xor_blocks(&[1, 2, 3, 4], &[1, 2]), vec![0, 0, 2, 6]);
    }

    #[test]
    fn encrypts_and_decrypts_a_round_trip() {
        let key = hex::decode("ee581a043ac19191c7d551710bab13a9").unwrap();
        let iv = hex::decode("91db4482c4ffa9858338ab0e98ddf96c").unwrap();
        let ct = cbc_encrypt(&key, &iv, b"Hello world").unwrap();
        assert_eq!(ct.len(), 32);
        assert_eq!(&ct[..16], &iv[..]);
        assert_eq!(cbc_decrypt(&key, &ct).unwrap(), b"Hello world");
    }

    #[test]
    fn decrypt_flags_a_broken_pad() {
        let key = hex::decode("ee581a043ac19191c7d551710bab13a9").unwrap();
        let iv = hex::decode("91db4482c4ffa9858338ab0e98ddf96c").unwrap();
        let mut ct = cbc_encrypt(&key, &iv, b"Hello world").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0xFF;
        assert!(matches!(
            cbc_decrypt(&key, &ct),
            Err(AttackError::InvalidPad)
        ));
    }

    #[test]
    fn generated_keys_fit_the_cipher() {
        let key = generate_key();
        let iv = [0u8; BLOCK_LEN];
        let ct = cbc_encrypt(&key, &iv, b"roundtrip").unwrap();
        assert_eq!(cbc_decrypt(&key, &ct).unwrap(), b"roundtrip");
    }
}
