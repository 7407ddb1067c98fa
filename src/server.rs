//! Per-server aggregation state and the three-round SNIP verification
//! protocol run between the two non-colluding servers.

#![forbid(unsafe_code)]

use ark_ff::Zero;
use blake3::Hasher;

use crate::client::{deserialize_packet, expand_packet, ClientPacket, PacketDataA, ServerId};
use crate::config::Config;
use crate::crypto::PrivateKey;
use crate::error::{Error, Result};
use crate::field;
use crate::prg::{Prg, Seed, SEED_LEN};
use crate::F;

/// Which of the two aggregation parties this `Server` instance is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartyIdx {
    /// The party that subtracts the public constant when reconstructing its
    /// share of the `g` polynomial.
    A,
    /// The party that does not.
    B,
}

impl From<PartyIdx> for ServerId {
    fn from(p: PartyIdx) -> ServerId {
        match p {
            PartyIdx::A => ServerId::A,
            PartyIdx::B => ServerId::B,
        }
    }
}

/// One server's running aggregation state for a batch.
pub struct Server {
    cfg: Config,
    idx: PartyIdx,
    priv_key: PrivateKey,
    /// Seed shared out of band by both servers, used to derive the
    /// challenge point `R` identically and without communication.
    shared_seed: Seed,
    data_shares_accum: Vec<F>,
}

impl Server {
    /// Create a new server aggregation state.
    pub fn new(cfg: Config, idx: PartyIdx, priv_key: PrivateKey, shared_seed: Seed) -> Self {
        let n = cfg.bit_len();
        Self { cfg, idx, priv_key, shared_seed, data_shares_accum: vec![F::zero(); n] }
    }

    /// This server's party index.
    pub fn idx(&self) -> PartyIdx {
        self.idx
    }

    /// The batch configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Derive the shared challenge point `R` for one submission. Both
    /// servers, holding the same `shared_seed` and `cfg.batch_id`, derive
    /// the identical value without exchanging anything.
    fn challenge_point(&self) -> F {
        let mut hasher = Hasher::new();
        hasher.update(b"prio.challenge.v1");
        hasher.update(&self.shared_seed.0);
        hasher.update(&self.cfg.batch_id);
        let salt = *hasher.finalize().as_bytes();
        let mut seed_bytes = [0u8; SEED_LEN];
        seed_bytes.copy_from_slice(&salt[..SEED_LEN]);
        let mut prg = Prg::new(&Seed(seed_bytes));
        prg.get_field()
    }

    /// Fold a verified submission's data shares into the running total.
    /// Callers must not call this unless the three-round check in `Verifier`
    /// accepted the submission.
    pub fn aggregate(&mut self, verifier: &Verifier) {
        for (acc, share) in self.data_shares_accum.iter_mut().zip(verifier.data_shares.iter()) {
            *acc += share;
        }
    }

    /// Merge another server's partial accumulator into this one (sharded
    /// aggregation under the same batch). Fails if the two states disagree
    /// on batch identity or both claim the same party index.
    pub fn merge(&mut self, other: &Server) -> Result<()> {
        if self.idx == other.idx {
            tracing::warn!(idx = ?self.idx, "merge rejected: both servers claim the same party index");
            return Err(Error::BadConfig("cannot merge two servers with the same party index".into()));
        }
        if self.cfg.num_data_fields != other.cfg.num_data_fields
            || self.cfg.precision != other.cfg.precision
            || self.cfg.batch_id != other.cfg.batch_id
            || self.cfg.pub_key_a != other.cfg.pub_key_a
            || self.cfg.pub_key_b != other.cfg.pub_key_b
        {
            tracing::warn!("merge rejected: batch configuration mismatch");
            return Err(Error::BadConfig("merge requires identical batch configuration".into()));
        }
        for (acc, other_acc) in self.data_shares_accum.iter_mut().zip(other.data_shares_accum.iter()) {
            *acc += other_acc;
        }
        Ok(())
    }

    /// Export this server's final share of the batch's data-share sums.
    pub fn total_share(&self) -> TotalShare {
        TotalShare { idx: self.idx, data_shares: self.data_shares_accum.clone() }
    }
}

/// A server's final contribution to a batch, to be combined with its peer's
/// to recover the plaintext aggregate.
#[derive(Clone, Debug)]
pub struct TotalShare {
    pub idx: PartyIdx,
    pub data_shares: Vec<F>,
}

impl TotalShare {
    /// Recombine the two servers' totals into the plaintext per-bit sums.
    pub fn combine(a: &TotalShare, b: &TotalShare) -> Result<Vec<F>> {
        if a.idx == b.idx {
            return Err(Error::BadConfig("both totals claim the same party index".into()));
        }
        if a.data_shares.len() != b.data_shares.len() {
            return Err(Error::BadConfig("mismatched total-share lengths".into()));
        }
        Ok(a.data_shares.iter().zip(b.data_shares.iter()).map(|(&x, &y)| x + y).collect())
    }

    /// Re-combine bit sums into per-field integer aggregates, grouping every
    /// `precision` consecutive entries back into one value via
    /// `Σ bit_sum[j] * 2^(precision-1-j)`.
    pub fn finalize(cfg: &Config, total_a: &TotalShare, total_b: &TotalShare) -> Result<Vec<F>> {
        let bit_sums = Self::combine(total_a, total_b)?;
        let precision = cfg.precision as usize;
        if bit_sums.len() != cfg.num_data_fields * precision {
            return Err(Error::Internal("bit-sum length mismatch".into()));
        }
        let out = bit_sums.chunks(precision).map(crate::encode::bits_to_field).collect();
        Ok(out)
    }
}

/// Server-side state for verifying exactly one client submission.
pub struct Verifier {
    idx: PartyIdx,
    triple_share: (F, F, F),
    share_fr: F,
    share_gr: F,
    share_hr: F,
    data_shares: Vec<F>,
    verdict_out: Option<F>,
}

/// This server's first-round message: shares of `d = f(R) - a` and
/// `e = g(R) - b`.
#[derive(Clone, Copy, Debug)]
pub struct Verify1 {
    pub share_d: F,
    pub share_e: F,
}

/// This server's second-round message: its share of `f(R)*g(R) - h(R)`.
#[derive(Clone, Copy, Debug)]
pub struct Verify2 {
    pub share_out: F,
}

impl Verifier {
    /// Decrypt and parse one client packet, then evaluate this server's
    /// shares of `f`, `g`, and `h` at the shared challenge point `R`.
    pub fn new(server: &Server, ciphertext: &[u8]) -> Result<Self> {
        let plaintext = crate::crypto::decrypt(&server.priv_key, ciphertext).map_err(|e| {
            tracing::warn!(idx = ?server.idx, "packet decryption failed");
            e
        })?;
        let packet = deserialize_packet(&plaintext, server.idx.into())?;
        Self::from_packet(server, &packet)
    }

    /// Build a `Verifier` from an already-decrypted packet (used directly by
    /// tests and by `new_test`-configured batches that skip encryption).
    pub fn from_packet(server: &Server, packet: &ClientPacket) -> Result<Self> {
        let n = server.cfg.bit_len();
        let h = server.cfg.h_points();
        let data = expand_packet(packet, n, h);
        Self::from_packet_data(server, data)
    }

    fn from_packet_data(server: &Server, data: PacketDataA) -> Result<Self> {
        let h = server.cfg.h_points();
        if data.data_shares.len() != server.cfg.bit_len() {
            return Err(Error::BadInput("data-share vector has the wrong length".into()));
        }
        if data.h_points.len() != h {
            return Err(Error::BadInput("h-point vector has the wrong length".into()));
        }

        let r = server.challenge_point();

        // Reconstruct this server's share of points_f / points_g, applying
        // the asymmetric g-share construction: only party A subtracts the
        // public constant 1 when reconstructing a bit share of g.
        let mut points_f = vec![F::zero(); h];
        let mut points_g = vec![F::zero(); h];
        points_f[0] = data.f0_share;
        points_g[0] = match server.idx {
            PartyIdx::A => data.g0_share - F::from(1u64),
            PartyIdx::B => data.g0_share,
        };
        for (i, &share) in data.data_shares.iter().enumerate() {
            points_f[i + 1] = share;
            points_g[i + 1] = match server.idx {
                PartyIdx::A => share - F::from(1u64),
                PartyIdx::B => share,
            };
        }

        let share_fr = field::poly_interp_evaluate(&points_f, r).map_err(|e| Error::Internal(e.to_string()))?;
        let share_gr = field::poly_interp_evaluate(&points_g, r).map_err(|e| Error::Internal(e.to_string()))?;

        // points_h holds this server's share of h evaluated on the 2h-th
        // roots of unity. Position 0 is the explicit h0 share. The even
        // positions 2, 4, ..., 2h-2 are never transmitted: for a valid
        // encoding they equal f(w_h^i) * g(w_h^i) = bit*(bit-1) = 0 for
        // every bit position, so each server simply treats its share of
        // them as 0 rather than computing a local (and cryptographically
        // meaningless) product of its own f/g shares. A dishonest
        // submission with an out-of-range bit makes the *true* h nonzero
        // at one of these forced-zero positions, which is exactly what the
        // random evaluation at R below is designed to catch. The odd
        // positions are the explicitly shared `h_points`.
        let mut points_h_full = vec![F::zero(); 2 * h];
        points_h_full[0] = data.h0_share;
        for (j, i) in (1..2 * h).step_by(2).enumerate() {
            points_h_full[i] = data.h_points[j];
        }
        let share_hr =
            field::poly_interp_evaluate(&points_h_full, r).map_err(|e| Error::Internal(e.to_string()))?;

        Ok(Self {
            idx: server.idx,
            triple_share: (data.triple.a, data.triple.b, data.triple.c),
            share_fr,
            share_gr,
            share_hr,
            data_shares: data.data_shares,
            verdict_out: None,
        })
    }

    /// Round 1: emit this server's share of `d = f(R) - a`, `e = g(R) - b`.
    pub fn make_verify1(&self) -> Verify1 {
        Verify1 { share_d: self.share_fr - self.triple_share.0, share_e: self.share_gr - self.triple_share.1 }
    }

    /// Round 2: given the peer's `Verify1`, reconstruct the public values
    /// `d`, `e`, and emit this server's share of `f(R)*g(R) - h(R)` via
    /// Beaver multiplication.
    pub fn ingest_verify1(&mut self, own: Verify1, peer: Verify1) -> Verify2 {
        let d = own.share_d + peer.share_d;
        let e = own.share_e + peer.share_e;
        let (share_a, share_b, share_c) = self.triple_share;
        let share_out = match self.idx {
            PartyIdx::A => d * e + d * share_b + e * share_a + share_c - self.share_hr,
            PartyIdx::B => d * share_b + e * share_a + share_c - self.share_hr,
        };
        self.verdict_out = Some(share_out);
        Verify2 { share_out }
    }

    /// Round 3: given the peer's `Verify2`, reconstruct the zero-check and
    /// accept iff it equals zero.
    pub fn is_valid(&self, own: Verify2, peer: Verify2) -> bool {
        let ok = (own.share_out + peer.share_out).is_zero();
        if ok {
            tracing::debug!(idx = ?self.idx, "submission verified");
        } else {
            tracing::warn!(idx = ?self.idx, "submission failed verification");
        }
        ok
    }

    /// This server's share of the submission's data bits, released only
    /// after the caller has confirmed `is_valid`.
    pub fn data_shares(&self) -> &[F] {
        &self.data_shares
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::config::Config;

    fn run_verification(cfg: &Config, values: &[u64]) -> bool {
        let shared_seed = Seed([42u8; SEED_LEN]);
        let (sk_a, _) = PrivateKey::generate();
        let (sk_b, _) = PrivateKey::generate();

        let mut server_a = Server::new(cfg.clone(), PartyIdx::A, sk_a, shared_seed.clone());
        let mut server_b = Server::new(cfg.clone(), PartyIdx::B, sk_b, shared_seed);

        let (packet_a, seed) = Client::encode_shares(cfg, values).unwrap();
        let client_packet_a = ClientPacket::ForA(packet_a);
        let client_packet_b = ClientPacket::ForB(seed);

        let mut verifier_a = Verifier::from_packet(&server_a, &client_packet_a).unwrap();
        let mut verifier_b = Verifier::from_packet(&server_b, &client_packet_b).unwrap();

        let v1_a = verifier_a.make_verify1();
        let v1_b = verifier_b.make_verify1();

        let v2_a = verifier_a.ingest_verify1(v1_a, v1_b);
        let v2_b = verifier_b.ingest_verify1(v1_b, v1_a);

        let ok_a = verifier_a.is_valid(v2_a, v2_b);
        let ok_b = verifier_b.is_valid(v2_b, v2_a);
        assert_eq!(ok_a, ok_b);

        if ok_a {
            server_a.aggregate(&verifier_a);
            server_b.aggregate(&verifier_b);
        }
        ok_a
    }

    #[test]
    fn boolean_submission_verifies_and_aggregates() {
        let cfg = Config::new_test(3, 1, 256, "test4").unwrap();
        assert!(run_verification(&cfg, &[1, 0, 1]));
    }

    #[test]
    fn integer_submission_verifies() {
        let cfg = Config::new_test(2, 8, 64, "batch").unwrap();
        assert!(run_verification(&cfg, &[5, 9]));
    }

    #[test]
    fn full_batch_finalizes_to_expected_sum() {
        let cfg = Config::new_test(3, 1, 256, "test4").unwrap();
        let shared_seed = Seed([9u8; SEED_LEN]);
        let (sk_a, _) = PrivateKey::generate();
        let (sk_b, _) = PrivateKey::generate();
        let mut server_a = Server::new(cfg.clone(), PartyIdx::A, sk_a, shared_seed.clone());
        let mut server_b = Server::new(cfg.clone(), PartyIdx::B, sk_b, shared_seed);

        for _ in 0..10 {
            let (packet_a, seed) = Client::encode_shares(&cfg, &[1, 0, 1]).unwrap();
            let mut va = Verifier::from_packet(&server_a, &ClientPacket::ForA(packet_a)).unwrap();
            let mut vb = Verifier::from_packet(&server_b, &ClientPacket::ForB(seed)).unwrap();
            let v1a = va.make_verify1();
            let v1b = vb.make_verify1();
            let v2a = va.ingest_verify1(v1a, v1b);
            let v2b = vb.ingest_verify1(v1b, v1a);
            assert!(va.is_valid(v2a, v2b));
            server_a.aggregate(&va);
            server_b.aggregate(&vb);
        }

        let total_a = server_a.total_share();
        let total_b = server_b.total_share();
        let result = TotalShare::finalize(&cfg, &total_a, &total_b).unwrap();
        assert_eq!(result, vec![F::from(10u64), F::from(0u64), F::from(10u64)]);
    }

    #[test]
    fn boolean_aggregation_of_ten_clients_over_133_fields() {
        let values: Vec<u64> =
            (0..133u64).map(|i| if i % 3 == 1 || i % 5 == 3 { 1 } else { 0 }).collect();
        let cfg = Config::new_test(133, 1, 512, "indicator").unwrap();
        let shared_seed = Seed([21u8; SEED_LEN]);
        let (sk_a, _) = PrivateKey::generate();
        let (sk_b, _) = PrivateKey::generate();
        let mut server_a = Server::new(cfg.clone(), PartyIdx::A, sk_a, shared_seed.clone());
        let mut server_b = Server::new(cfg.clone(), PartyIdx::B, sk_b, shared_seed);

        for _ in 0..10 {
            let (packet_a, seed) = Client::encode_shares(&cfg, &values).unwrap();
            let mut va = Verifier::from_packet(&server_a, &ClientPacket::ForA(packet_a)).unwrap();
            let mut vb = Verifier::from_packet(&server_b, &ClientPacket::ForB(seed)).unwrap();
            let v1a = va.make_verify1();
            let v1b = vb.make_verify1();
            let v2a = va.ingest_verify1(v1a, v1b);
            let v2b = vb.ingest_verify1(v1b, v1a);
            assert!(va.is_valid(v2a, v2b));
            server_a.aggregate(&va);
            server_b.aggregate(&vb);
        }

        let total_a = server_a.total_share();
        let total_b = server_b.total_share();
        let result = TotalShare::finalize(&cfg, &total_a, &total_b).unwrap();
        let expected: Vec<F> = values.iter().map(|&v| F::from(10 * v)).collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn integer_aggregation_of_five_clients_over_ten_fields() {
        let values: Vec<u64> = (0..10u64).map(|i| u32::MAX as u64 - i).collect();
        let cfg = Config::new_test(10, 32, 1024, "integers").unwrap();
        let shared_seed = Seed([22u8; SEED_LEN]);
        let (sk_a, _) = PrivateKey::generate();
        let (sk_b, _) = PrivateKey::generate();
        let mut server_a = Server::new(cfg.clone(), PartyIdx::A, sk_a, shared_seed.clone());
        let mut server_b = Server::new(cfg.clone(), PartyIdx::B, sk_b, shared_seed);

        for _ in 0..5 {
            let (packet_a, seed) = Client::encode_shares(&cfg, &values).unwrap();
            let mut va = Verifier::from_packet(&server_a, &ClientPacket::ForA(packet_a)).unwrap();
            let mut vb = Verifier::from_packet(&server_b, &ClientPacket::ForB(seed)).unwrap();
            let v1a = va.make_verify1();
            let v1b = vb.make_verify1();
            let v2a = va.ingest_verify1(v1a, v1b);
            let v2b = vb.ingest_verify1(v1b, v1a);
            assert!(va.is_valid(v2a, v2b));
            server_a.aggregate(&va);
            server_b.aggregate(&vb);
        }

        let total_a = server_a.total_share();
        let total_b = server_b.total_share();
        let result = TotalShare::finalize(&cfg, &total_a, &total_b).unwrap();
        let expected: Vec<F> = values.iter().map(|&v| F::from(5 * v)).collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn malformed_bit_fails_verification() {
        let cfg = Config::new_test(1, 1, 64, "batch").unwrap();
        let shared_seed = Seed([5u8; SEED_LEN]);
        let (sk_a, _) = PrivateKey::generate();
        let (sk_b, _) = PrivateKey::generate();
        let server_a = Server::new(cfg.clone(), PartyIdx::A, sk_a, shared_seed.clone());
        let server_b = Server::new(cfg.clone(), PartyIdx::B, sk_b, shared_seed);

        let (mut packet_a, seed) = Client::encode_shares(&cfg, &[1]).unwrap();
        // Corrupt the single bit share so the combined value is 2, not {0,1}.
        packet_a.data_shares[0] += F::from(1u64);

        let mut va = Verifier::from_packet(&server_a, &ClientPacket::ForA(packet_a)).unwrap();
        let mut vb = Verifier::from_packet(&server_b, &ClientPacket::ForB(seed)).unwrap();
        let v1a = va.make_verify1();
        let v1b = vb.make_verify1();
        let v2a = va.ingest_verify1(v1a, v1b);
        let v2b = vb.ingest_verify1(v1b, v1a);
        assert!(!va.is_valid(v2a, v2b));
    }

    #[test]
    fn mismatched_batch_id_fails_verification() {
        let cfg_a = Config::new_test(1, 1, 64, "batch-x").unwrap();
        let cfg_b = Config::new_test(1, 1, 64, "batch-y").unwrap();
        let shared_seed = Seed([11u8; SEED_LEN]);
        let (sk_a, _) = PrivateKey::generate();
        let (sk_b, _) = PrivateKey::generate();
        let server_a = Server::new(cfg_a.clone(), PartyIdx::A, sk_a, shared_seed.clone());
        let server_b = Server::new(cfg_b, PartyIdx::B, sk_b, shared_seed);

        let (packet_a, seed) = Client::encode_shares(&cfg_a, &[1]).unwrap();
        let mut va = Verifier::from_packet(&server_a, &ClientPacket::ForA(packet_a)).unwrap();
        let mut vb = Verifier::from_packet(&server_b, &ClientPacket::ForB(seed)).unwrap();
        let v1a = va.make_verify1();
        let v1b = vb.make_verify1();
        let v2a = va.ingest_verify1(v1a, v1b);
        let v2b = vb.ingest_verify1(v1b, v1a);
        assert!(!va.is_valid(v2a, v2b));
    }

    #[test]
    fn tampered_ciphertext_is_rejected_at_verifier_construction() {
        let (sk_a, pk_a) = PrivateKey::generate();
        let (_sk_b, pk_b) = PrivateKey::generate();
        let cfg = Config::new(1, 1, 64, "batch", pk_a, pk_b).unwrap();
        let shared_seed = Seed([2u8; SEED_LEN]);
        let server_a = Server::new(cfg.clone(), PartyIdx::A, sk_a, shared_seed);

        let (ct_a, _ct_b) = Client::encode(&cfg, &[1]).unwrap();
        let mut tampered = ct_a;
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;

        let err = Verifier::new(&server_a, &tampered).unwrap_err();
        assert!(matches!(err, Error::CryptoFailure(_)));
    }

    #[test]
    fn merge_rejects_idx_collision() {
        let cfg = Config::new_test(1, 1, 64, "m").unwrap();
        let (sk1, _) = PrivateKey::generate();
        let (sk2, _) = PrivateKey::generate();
        let seed = Seed([4u8; SEED_LEN]);
        let mut s1 = Server::new(cfg.clone(), PartyIdx::A, sk1, seed.clone());
        let s2 = Server::new(cfg, PartyIdx::A, sk2, seed);
        assert!(matches!(s1.merge(&s2), Err(Error::BadConfig(_))));
    }

    #[test]
    fn merge_rejects_num_data_fields_mismatch() {
        let cfg1 = Config::new_test(1, 1, 64, "m").unwrap();
        let cfg2 = Config::new_test(2, 1, 64, "m").unwrap();
        let (sk1, _) = PrivateKey::generate();
        let (sk2, _) = PrivateKey::generate();
        let seed = Seed([4u8; SEED_LEN]);
        let mut s1 = Server::new(cfg1, PartyIdx::A, sk1, seed.clone());
        let s2 = Server::new(cfg2, PartyIdx::B, sk2, seed);
        assert!(matches!(s1.merge(&s2), Err(Error::BadConfig(_))));
    }

    #[test]
    fn merge_rejects_precision_mismatch() {
        let cfg1 = Config::new_test(1, 1, 64, "m").unwrap();
        let cfg2 = Config::new_test(1, 2, 64, "m").unwrap();
        let (sk1, _) = PrivateKey::generate();
        let (sk2, _) = PrivateKey::generate();
        let seed = Seed([4u8; SEED_LEN]);
        let mut s1 = Server::new(cfg1, PartyIdx::A, sk1, seed.clone());
        let s2 = Server::new(cfg2, PartyIdx::B, sk2, seed);
        assert!(matches!(s1.merge(&s2), Err(Error::BadConfig(_))));
    }

    #[test]
    fn merge_rejects_batch_id_mismatch() {
        let cfg1 = Config::new_test(1, 1, 64, "batch-x").unwrap();
        let cfg2 = Config::new_test(1, 1, 64, "batch-y").unwrap();
        let (sk1, _) = PrivateKey::generate();
        let (sk2, _) = PrivateKey::generate();
        let seed = Seed([4u8; SEED_LEN]);
        let mut s1 = Server::new(cfg1, PartyIdx::A, sk1, seed.clone());
        let s2 = Server::new(cfg2, PartyIdx::B, sk2, seed);
        assert!(matches!(s1.merge(&s2), Err(Error::BadConfig(_))));
    }

    #[test]
    fn merge_rejects_pub_key_mismatch() {
        let (sk_a1, pk_a1) = PrivateKey::generate();
        let (_sk_a2, pk_a2) = PrivateKey::generate();
        let (_sk_b, pk_b) = PrivateKey::generate();
        let cfg1 = Config::new(1, 1, 64, "batch", pk_a1, pk_b).unwrap();
        let cfg2 = Config::new(1, 1, 64, "batch", pk_a2, pk_b).unwrap();
        let (sk2, _) = PrivateKey::generate();
        let seed = Seed([4u8; SEED_LEN]);
        let mut s1 = Server::new(cfg1, PartyIdx::A, sk_a1, seed.clone());
        let s2 = Server::new(cfg2, PartyIdx::B, sk2, seed);
        assert!(matches!(s1.merge(&s2), Err(Error::BadConfig(_))));
    }

    #[test]
    fn merge_is_associative_regardless_of_grouping() {
        let cfg = Config::new_test(2, 1, 64, "assoc").unwrap();
        let seed = Seed([1u8; SEED_LEN]);
        let v1 = [3u64, 5];
        let v2 = [7u64, 11];
        let v3 = [13u64, 17];

        let mk = |idx: PartyIdx, vals: [u64; 2]| {
            let (sk, _) = PrivateKey::generate();
            let mut s = Server::new(cfg.clone(), idx, sk, seed.clone());
            s.data_shares_accum = vals.iter().map(|&v| F::from(v)).collect();
            s
        };

        // (S1.merge(S2)).merge(S3)
        let mut s1 = mk(PartyIdx::A, v1);
        let s2 = mk(PartyIdx::B, v2);
        let s3 = mk(PartyIdx::B, v3);
        s1.merge(&s2).unwrap();
        s1.merge(&s3).unwrap();

        // S1.merge(S2.merge(S3)), using a different but individually-valid
        // idx assignment: idx is a bookkeeping tag on the merge call, not
        // part of the accumulated value, so grouping can be checked this way
        // without the two sides fighting over the same idx constraints.
        let mut t1 = mk(PartyIdx::A, v1);
        let mut t2 = mk(PartyIdx::B, v2);
        let t3 = mk(PartyIdx::A, v3);
        t2.merge(&t3).unwrap();
        t1.merge(&t2).unwrap();

        assert_eq!(s1.total_share().data_shares, t1.total_share().data_shares);
    }
}
