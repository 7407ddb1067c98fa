//! Client-side SNIP construction: bit decomposition, f/g/h polynomial
//! construction, Beaver-triple generation, and the additive share split
//! that lets server B's half of a submission travel as a PRG seed.

#![forbid(unsafe_code)]

use ark_ff::{UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::config::Config;
use crate::crypto;
use crate::encode::encode_batch;
use crate::error::{Error, Result};
use crate::field;
use crate::prg::{Prg, Seed, SEED_LEN};
use crate::F;

/// A Beaver triple `(a, b, c = a*b)` used to mask the multiplication
/// `f(R) * g(R)` during the three-round verification.
#[derive(Clone, Copy, Debug)]
pub struct BeaverTriple {
    pub a: F,
    pub b: F,
    pub c: F,
}

/// Which of the two non-colluding aggregation parties a packet is destined
/// for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerId {
    A,
    B,
}

/// The explicit share data sent to server A.
#[derive(Clone, Debug)]
pub struct PacketDataA {
    pub triple: BeaverTriple,
    pub f0_share: F,
    pub g0_share: F,
    pub h0_share: F,
    pub data_shares: Vec<F>,
    pub h_points: Vec<F>,
}

/// A decrypted, parsed client submission bound for one server.
#[derive(Clone, Debug)]
pub enum ClientPacket {
    /// Server A receives the full explicit share vector.
    ForA(PacketDataA),
    /// Server B receives only a seed and regenerates its shares from it.
    ForB(Seed),
}

impl ClientPacket {
    /// The server this packet is destined for.
    pub fn server_id(&self) -> ServerId {
        match self {
            ClientPacket::ForA(_) => ServerId::A,
            ClientPacket::ForB(_) => ServerId::B,
        }
    }
}

/// Draws B's pseudorandom half of a submission from `seed`, in the fixed
/// canonical order both the client and server B must agree on.
struct BShares {
    triple: BeaverTriple,
    f0_share: F,
    g0_share: F,
    h0_share: F,
    data_shares: Vec<F>,
    h_points: Vec<F>,
}

fn draw_b_shares(seed: &Seed, n: usize, h: usize) -> BShares {
    let mut prg = Prg::new(seed);
    let a = prg.get_field();
    let b = prg.get_field();
    let c = prg.get_field();
    let f0_share = prg.get_field();
    let g0_share = prg.get_field();
    let h0_share = prg.get_field();
    let mut data_shares = vec![F::zero(); n];
    prg.get_field_array(&mut data_shares);
    let mut h_points = vec![F::zero(); h];
    prg.get_field_array(&mut h_points);
    BShares { triple: BeaverTriple { a, b, c }, f0_share, g0_share, h0_share, data_shares, h_points }
}

/// Construct the SNIP's `points_f`/`points_g` vectors of length `h`
/// (`points_f[0]=f0`, `points_f[1..=n]=bits`, rest zero; same for `g` except
/// non-zero slots are `bit - 1`).
fn build_fg_points(bits: &[F], f0: F, g0: F, h: usize) -> (Vec<F>, Vec<F>) {
    let mut points_f = vec![F::zero(); h];
    let mut points_g = vec![F::zero(); h];
    points_f[0] = f0;
    points_g[0] = g0;
    for (i, &bit) in bits.iter().enumerate() {
        points_f[i + 1] = bit;
        points_g[i + 1] = bit - F::from(1u64);
    }
    (points_f, points_g)
}

/// Evaluate `h(x) = f(x) * g(x)` on the `2h`-th roots of unity by
/// interpolating f and g from their `h`-point evaluations, zero-padding to
/// `2h` coefficients, and transforming back. Degree(h) <= 2(h-1) < 2h so
/// this is exact.
fn compute_h_points_full(points_f: &[F], points_g: &[F]) -> Result<Vec<F>> {
    let h = points_f.len();
    let two_h = 2 * h;

    let mut coeffs_f = points_f.to_vec();
    field::fft(&mut coeffs_f, true).map_err(|e| Error::Internal(e.to_string()))?;
    coeffs_f.resize(two_h, F::zero());

    let mut coeffs_g = points_g.to_vec();
    field::fft(&mut coeffs_g, true).map_err(|e| Error::Internal(e.to_string()))?;
    coeffs_g.resize(two_h, F::zero());

    field::fft(&mut coeffs_f, false).map_err(|e| Error::Internal(e.to_string()))?;
    field::fft(&mut coeffs_g, false).map_err(|e| Error::Internal(e.to_string()))?;

    let points_h: Vec<F> = coeffs_f.iter().zip(coeffs_g.iter()).map(|(&a, &b)| a * b).collect();
    Ok(points_h)
}

/// Produces the two ciphertexts for one client submission: one for server
/// A, one for server B.
pub struct Client;

impl Client {
    /// Encode, prove, and encrypt a submission of `num_data_fields` values,
    /// each `< 2^precision`, for the given batch `cfg`.
    pub fn encode(cfg: &Config, values: &[u64]) -> Result<(Vec<u8>, Vec<u8>)> {
        if values.len() != cfg.num_data_fields {
            return Err(Error::BadInput(format!(
                "expected {} values, got {}",
                cfg.num_data_fields,
                values.len()
            )));
        }
        let pub_key_a = cfg
            .pub_key_a
            .ok_or_else(|| Error::BadConfig("config has no server-A public key".into()))?;
        let pub_key_b = cfg
            .pub_key_b
            .ok_or_else(|| Error::BadConfig("config has no server-B public key".into()))?;

        let (pkt_a, pkt_b) = Self::encode_shares(cfg, values)?;

        let bytes_a = serialize_packet_a(&pkt_a);
        let bytes_b = serialize_packet_b(&pkt_b);

        let ct_a = crypto::encrypt(&pub_key_a, &bytes_a)?;
        let ct_b = crypto::encrypt(&pub_key_b, &bytes_b)?;
        Ok((ct_a, ct_b))
    }

    /// Like `encode`, but returns the unencrypted packets. Used by tests and
    /// by `new_test` configs that carry no public keys.
    pub fn encode_shares(cfg: &Config, values: &[u64]) -> Result<(PacketDataA, Seed)> {
        if values.len() != cfg.num_data_fields {
            return Err(Error::BadInput(format!(
                "expected {} values, got {}",
                cfg.num_data_fields,
                values.len()
            )));
        }

        let bits = encode_batch(values, cfg.precision)?;
        let n = bits.len();
        let h = cfg.h_points();

        let mut rng = rand::thread_rng();
        let f0 = F::rand(&mut rng);
        let g0 = F::rand(&mut rng);
        let a = F::rand(&mut rng);
        let b = F::rand(&mut rng);
        let c = a * b;

        let (points_f, points_g) = build_fg_points(&bits, f0, g0, h);
        let points_h_full = compute_h_points_full(&points_f, &points_g)?;
        // Only h0 and the odd positions are shared. The even positions
        // 2, 4, ..., 2h-2 equal bit*(bit-1) for a valid encoding and are
        // therefore always zero; the server reconstructs them as a public
        // constant rather than receiving a share of them.
        let h0 = points_h_full[0];
        let h_points_odd: Vec<F> = points_h_full.iter().skip(1).step_by(2).copied().collect();
        debug_assert_eq!(h_points_odd.len(), h);

        let seed = Seed::random();

        let b_shares = draw_b_shares(&seed, n, h);

        let packet_a = PacketDataA {
            triple: BeaverTriple { a: a - b_shares.triple.a, b: b - b_shares.triple.b, c: c - b_shares.triple.c },
            f0_share: f0 - b_shares.f0_share,
            g0_share: g0 - b_shares.g0_share,
            h0_share: h0 - b_shares.h0_share,
            data_shares: bits.iter().zip(b_shares.data_shares.iter()).map(|(&x, &y)| x - y).collect(),
            h_points: h_points_odd.iter().zip(b_shares.h_points.iter()).map(|(&x, &y)| x - y).collect(),
        };

        Ok((packet_a, seed))
    }
}

fn write_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn read_len_prefixed<'a>(buf: &'a [u8], cursor: &mut usize) -> Result<&'a [u8]> {
    if buf.len() < *cursor + 8 {
        return Err(Error::BadInput("truncated packet (length prefix)".into()));
    }
    let len = u64::from_be_bytes(buf[*cursor..*cursor + 8].try_into().unwrap()) as usize;
    *cursor += 8;
    if buf.len() < *cursor + len {
        return Err(Error::BadInput("truncated packet (body)".into()));
    }
    let out = &buf[*cursor..*cursor + len];
    *cursor += len;
    Ok(out)
}

fn write_field(buf: &mut Vec<u8>, f: &F) {
    let mut bytes = Vec::new();
    f.serialize_compressed(&mut bytes).expect("field serialization cannot fail");
    write_len_prefixed(buf, &bytes);
}

fn read_field(buf: &[u8], cursor: &mut usize) -> Result<F> {
    let bytes = read_len_prefixed(buf, cursor)?;
    F::deserialize_compressed(bytes).map_err(|e| Error::BadInput(format!("bad field element: {e}")))
}

fn write_field_vec(buf: &mut Vec<u8>, v: &[F]) {
    buf.extend_from_slice(&(v.len() as u64).to_be_bytes());
    for f in v {
        write_field(buf, f);
    }
}

fn read_field_vec(buf: &[u8], cursor: &mut usize) -> Result<Vec<F>> {
    if buf.len() < *cursor + 8 {
        return Err(Error::BadInput("truncated packet (vec length)".into()));
    }
    let len = u64::from_be_bytes(buf[*cursor..*cursor + 8].try_into().unwrap()) as usize;
    *cursor += 8;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(read_field(buf, cursor)?);
    }
    Ok(out)
}

/// `server_id` tag byte prefixing every serialized packet.
const TAG_A: u8 = 0;
const TAG_B: u8 = 1;

fn serialize_packet_a(pkt: &PacketDataA) -> Vec<u8> {
    let mut buf = vec![TAG_A];
    write_field(&mut buf, &pkt.triple.a);
    write_field(&mut buf, &pkt.triple.b);
    write_field(&mut buf, &pkt.triple.c);
    write_field(&mut buf, &pkt.f0_share);
    write_field(&mut buf, &pkt.g0_share);
    write_field(&mut buf, &pkt.h0_share);
    write_field_vec(&mut buf, &pkt.data_shares);
    write_field_vec(&mut buf, &pkt.h_points);
    buf
}

fn serialize_packet_b(seed: &Seed) -> Vec<u8> {
    let mut buf = vec![TAG_B];
    write_len_prefixed(&mut buf, &seed.0);
    buf
}

/// Parse a decrypted packet, validating that its tag matches the server
/// that is decrypting it (a flipped tag is rejected rather than silently
/// reinterpreted).
pub fn deserialize_packet(bytes: &[u8], expect: ServerId) -> Result<ClientPacket> {
    if bytes.is_empty() {
        return Err(Error::BadInput("empty packet".into()));
    }
    let tag = bytes[0];
    let mut cursor = 1usize;
    match (tag, expect) {
        (TAG_A, ServerId::A) => {
            let a = read_field(bytes, &mut cursor)?;
            let b = read_field(bytes, &mut cursor)?;
            let c = read_field(bytes, &mut cursor)?;
            let f0_share = read_field(bytes, &mut cursor)?;
            let g0_share = read_field(bytes, &mut cursor)?;
            let h0_share = read_field(bytes, &mut cursor)?;
            let data_shares = read_field_vec(bytes, &mut cursor)?;
            let h_points = read_field_vec(bytes, &mut cursor)?;
            Ok(ClientPacket::ForA(PacketDataA {
                triple: BeaverTriple { a, b, c },
                f0_share,
                g0_share,
                h0_share,
                data_shares,
                h_points,
            }))
        }
        (TAG_B, ServerId::B) => {
            let seed_bytes = read_len_prefixed(bytes, &mut cursor)?;
            let arr: [u8; SEED_LEN] = seed_bytes
                .try_into()
                .map_err(|_| Error::BadInput("bad seed length".into()))?;
            Ok(ClientPacket::ForB(Seed(arr)))
        }
        _ => Err(Error::BadInput("packet tag does not match the decrypting server".into())),
    }
}

/// Expand a `ClientPacket` (either variant) into the explicit share data a
/// `Verifier` needs: server A's packet is used as-is; server B's packet is
/// regenerated from its seed.
pub(crate) fn expand_packet(packet: &ClientPacket, n: usize, h: usize) -> PacketDataA {
    match packet {
        ClientPacket::ForA(data) => data.clone(),
        ClientPacket::ForB(seed) => {
            let shares = draw_b_shares(seed, n, h);
            PacketDataA {
                triple: shares.triple,
                f0_share: shares.f0_share,
                g0_share: shares.g0_share,
                h0_share: shares.h0_share,
                data_shares: shares.data_shares,
                h_points: shares.h_points,
            }
        }
    }
}
