use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};


#[inline]
pub(crate) fn get_rng() -> impl RngCore + CryptoRng {
    OsRng
}
