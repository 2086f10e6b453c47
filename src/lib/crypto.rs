#[cfg(test)]
#[path = "../../tests/crypto.rs"]
mod crypto_test;

use chacha20poly1305::aead::AeadInPlace;
use chacha20poly1305::{AeadCore, Key, KeyInit, Tag, XChaCha20Poly1305, XNonce};
use simple_error::bail;

use crate::bytes::{ByteBuffer, PacketBuffer};
use crate::rng::get_rng;
use crate::DynResult;


pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;
pub const MAC_LEN: usize = 16;

/// Headroom a sealed frame needs in front of its payload.
pub const ENCRYPT_HEADROOM: usize = NONCE_LEN;


/// Payload protection applied to a frame after its room was planned.
///
/// Sealing writes into the guaranteed headroom and tailroom only, it never allocates.
pub trait Sealer {
    fn headroom(&self) -> usize;
    fn tailroom(&self) -> usize;
    fn seal(&self, buffer: &mut ByteBuffer<'_>) -> DynResult<()>;
}


pub struct Symmetric {
    cipher: XChaCha20Poly1305,
}

impl Symmetric {
    pub fn new(key: &[u8]) -> DynResult<Symmetric> {
        let private_bytes = <[u8; KEY_LEN]>::try_from(key)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&private_bytes));
        Ok(Symmetric {
            cipher
        })
    }

    /// Reverse [`Sealer::seal`]: strip the nonce and the tag and decrypt the payload in place.
    pub fn open(&self, buffer: &mut ByteBuffer<'_>) -> DynResult<()> {
        if buffer.len() < NONCE_LEN + MAC_LEN {
            bail!("Sealed frame too short ({} < {})!", buffer.len(), NONCE_LEN + MAC_LEN);
        }
        if buffer.is_shared() {
            bail!("Shared frame can not be opened in place!");
        }
        let nonce = XNonce::clone_from_slice(&buffer.slice()[..NONCE_LEN]);
        let body_length = buffer.len() - NONCE_LEN - MAC_LEN;
        let tag = Tag::clone_from_slice(&buffer.slice()[NONCE_LEN + body_length..]);
        let mut body = buffer.slice()[NONCE_LEN..NONCE_LEN + body_length].to_vec();
        if let Err(err) = self.cipher.decrypt_in_place_detached(&nonce, &[], &mut body, &tag) {
            bail!("Error decrypting ciphertext: {err}");
        }
        buffer.pull_front(NONCE_LEN)?;
        buffer.truncate(body_length);
        buffer.slice_mut()?.copy_from_slice(&body);
        Ok(())
    }
}

impl Sealer for Symmetric {
    #[inline]
    fn headroom(&self) -> usize {
        NONCE_LEN
    }

    #[inline]
    fn tailroom(&self) -> usize {
        MAC_LEN
    }

    fn seal(&self, buffer: &mut ByteBuffer<'_>) -> DynResult<()> {
        if buffer.headroom() < NONCE_LEN || buffer.tailroom() < MAC_LEN {
            bail!("Frame has no room for sealing (headroom {}, tailroom {})!", buffer.headroom(), buffer.tailroom());
        }
        if buffer.is_shared() {
            bail!("Shared frame can not be sealed in place!");
        }
        let nonce = XChaCha20Poly1305::generate_nonce(get_rng());
        let mut payload = buffer.slice_mut()?;
        let result = self.cipher.encrypt_in_place_detached(&nonce, &[], &mut payload);
        drop(payload);
        let tag = match result {
            Ok(res) => res,
            Err(err) => bail!("Error encrypting plaintext: {err}")
        };
        buffer.push_back(&tag)?;
        buffer.push_front(&nonce)?;
        Ok(())
    }
}

impl Clone for Symmetric {
    fn clone(&self) -> Self {
        Self { cipher: self.cipher.clone() }
    }
}
