//! Batch-wide configuration shared by the client encoder and both servers.

#![forbid(unsafe_code)]

use crate::crypto::Key;
use crate::error::{Error, Result};
use crate::field;

/// Maximum bits per scalar (matches the original implementation's bound).
pub const MAX_PRECISION: u32 = 32;

/// Immutable parameters agreed on for one aggregation batch.
#[derive(Clone)]
pub struct Config {
    /// Number of logical scalars per submission.
    pub num_data_fields: usize,
    /// Bits per scalar (1 for boolean; up to `MAX_PRECISION` for integers).
    pub precision: u32,
    /// Size of the FFT domain used by the SNIP (`H` in the proof construction).
    pub n_roots: usize,
    /// Opaque batch identifier, bound into challenge-point derivation.
    pub batch_id: Vec<u8>,
    /// Server A's encryption public key. `None` only in test-mode configs.
    pub pub_key_a: Option<Key>,
    /// Server B's encryption public key. `None` only in test-mode configs.
    pub pub_key_b: Option<Key>,
}

impl Config {
    /// The largest `num_data_fields` this config could support at the given
    /// `precision`, mirroring the original bound
    /// `((n_roots >> 1) - 1) / precision`.
    pub fn max_data_fields(n_roots: usize, precision: u32) -> usize {
        if precision == 0 {
            return 0;
        }
        (((n_roots >> 1).saturating_sub(1)) as u64 / precision as u64) as usize
    }

    /// `H`, the SNIP's f/g evaluation domain size: the next power of two
    /// strictly greater than `num_data_fields * precision`.
    pub fn h_points(&self) -> usize {
        field::next_pow2(self.num_data_fields * self.precision as usize + 1)
    }

    /// Number of bits in the flattened, big-endian bit vector the client
    /// encodes (`N` in the design notes).
    pub fn bit_len(&self) -> usize {
        self.num_data_fields * self.precision as usize
    }

    fn validate(n_roots: usize, num_data_fields: usize, precision: u32) -> Result<()> {
        if n_roots <= 1 || !field::domain_size_ok(n_roots) {
            tracing::debug!(n_roots, "config rejected: bad FFT domain size");
            return Err(Error::BadConfig(
                "n_roots must be a power of two greater than one, within the field's 2-adic subgroup".into(),
            ));
        }
        if precision == 0 || precision > MAX_PRECISION {
            tracing::debug!(precision, "config rejected: bad precision");
            return Err(Error::BadConfig(format!(
                "precision must be in [1, {MAX_PRECISION}]"
            )));
        }
        if num_data_fields == 0 {
            tracing::debug!("config rejected: num_data_fields is zero");
            return Err(Error::BadConfig("num_data_fields must be positive".into()));
        }
        let max_fields = Self::max_data_fields(n_roots, precision);
        if num_data_fields > max_fields {
            tracing::debug!(num_data_fields, max_fields, "config rejected: too many fields for domain");
            return Err(Error::BadConfig(format!(
                "num_data_fields {num_data_fields} exceeds the maximum {max_fields} for precision {precision} and n_roots {n_roots}"
            )));
        }
        Ok(())
    }

    /// Construct a production config, requiring both recipient public keys.
    pub fn new(
        num_data_fields: usize,
        precision: u32,
        n_roots: usize,
        batch_id: impl Into<Vec<u8>>,
        pub_key_a: Key,
        pub_key_b: Key,
    ) -> Result<Self> {
        Self::validate(n_roots, num_data_fields, precision)?;
        Ok(Self {
            num_data_fields,
            precision,
            n_roots,
            batch_id: batch_id.into(),
            pub_key_a: Some(pub_key_a),
            pub_key_b: Some(pub_key_b),
        })
    }

    /// Construct a config for tests that never encrypts/decrypts packets.
    pub fn new_test(
        num_data_fields: usize,
        precision: u32,
        n_roots: usize,
        batch_id: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        Self::validate(n_roots, num_data_fields, precision)?;
        Ok(Self {
            num_data_fields,
            precision,
            n_roots,
            batch_id: batch_id.into(),
            pub_key_a: None,
            pub_key_b: None,
        })
    }
}
