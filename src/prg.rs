//! Seedable pseudorandom stream used for Beaver triples, challenge points,
//! and server-B's compressed share representation.
//!
//! Backed by AES-128 in CTR mode with a zero IV: two PRGs seeded with the
//! same 16-byte key produce byte-identical streams, which is exactly the
//! property the protocol needs to let server B carry its half of a
//! submission as a seed rather than as explicit field elements.

#![forbid(unsafe_code)]

use aes::Aes128;
use ark_ff::{BigInteger, PrimeField};
use ctr::cipher::{KeyIvInit, StreamCipher};
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::F;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Seed length in bytes (one AES-128 key).
pub const SEED_LEN: usize = 16;

/// A PRG seed. Zeroized on drop since it is secret keying material.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Seed(pub [u8; SEED_LEN]);

impl Seed {
    /// Draw a fresh random seed from the OS RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; SEED_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }
}

impl AsRef<[u8]> for Seed {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Deterministic AES-CTR pseudorandom byte/field-element stream.
pub struct Prg {
    cipher: Aes128Ctr,
}

impl Prg {
    /// Create a PRG from a 16-byte seed, using a zero IV.
    pub fn new(seed: &Seed) -> Self {
        let iv = [0u8; 16];
        let cipher = Aes128Ctr::new(seed.0.as_slice().into(), iv.as_slice().into());
        Self { cipher }
    }

    /// Fill `out` with the next pseudorandom bytes from the stream.
    pub fn get_bytes(&mut self, out: &mut [u8]) {
        out.fill(0);
        self.cipher.apply_keystream(out);
    }

    /// Draw a pseudorandom integer in `[0, max)` by rejection sampling on
    /// the minimal number of whole bytes covering `max`'s bit length.
    pub fn get_int(&mut self, max: u64) -> Result<u64> {
        if max == 0 {
            return Err(Error::Internal("get_int: max must be positive".into()));
        }
        let bits = 64 - max.leading_zeros();
        let bytes_needed = ((bits + 7) / 8).max(1) as usize;
        let top_mask: u8 = if bits % 8 == 0 { 0xff } else { (1u8 << (bits % 8)) - 1 };

        // Bounded rejection loop: expected iterations < 2 for any max.
        for _ in 0..10_000 {
            let mut buf = [0u8; 8];
            self.get_bytes(&mut buf[..bytes_needed]);
            buf[bytes_needed - 1] &= top_mask;
            let mut v = 0u64;
            for b in buf[..bytes_needed].iter().rev() {
                v = (v << 8) | (*b as u64);
            }
            if v < max {
                return Ok(v);
            }
        }
        Err(Error::Internal("get_int: rejection sampling did not converge".into()))
    }

    /// Draw a pseudorandom integer in `[lo, max)`.
    pub fn get_int_range(&mut self, lo: u64, max: u64) -> Result<u64> {
        if lo >= max {
            return Err(Error::Internal("get_int_range: lo must be < max".into()));
        }
        Ok(lo + self.get_int(max - lo)?)
    }

    /// Draw a pseudorandom field element, uniform over `[0, p)`.
    ///
    /// Uses wide reduction (64 bytes reduced mod p) rather than rejection
    /// sampling against the modulus, matching the common arkworks idiom for
    /// drawing a field element from a byte stream.
    pub fn get_field(&mut self) -> F {
        let mut buf = [0u8; 64];
        self.get_bytes(&mut buf);
        F::from_le_bytes_mod_order(&buf)
    }

    /// Fill `out` with `n` independent pseudorandom field elements.
    pub fn get_field_array(&mut self, out: &mut [F]) {
        for slot in out.iter_mut() {
            *slot = self.get_field();
        }
    }

    /// Produce this server's share of `src`: draw `tmp` from the stream and
    /// return `src - tmp mod p`. The peer, holding an identically-seeded
    /// PRG, regenerates `tmp` as its own share.
    pub fn share_field(&mut self, src: F) -> F {
        let tmp = self.get_field();
        src - tmp
    }

    /// Component-wise `share_field` over a slice.
    pub fn share_field_array(&mut self, src: &[F]) -> Vec<F> {
        src.iter().map(|&x| self.share_field(x)).collect()
    }
}

/// Convert a field element's canonical little-endian bytes into a fixed
/// byte-length representation, used internally when the PRG needs to
/// re-derive a share of something that was drawn as a field element.
pub fn field_to_le_bytes(f: &F) -> Vec<u8> {
    f.into_bigint().to_bytes_le()
}
