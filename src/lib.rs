//! Core of a two-server privacy-preserving aggregation system.
//!
//! Clients split a private, bounded-integer (or boolean) data vector into
//! two additive secret shares, one per non-colluding aggregation server,
//! along with a short zero-knowledge proof that the encoded vector is
//! well-formed. The two servers jointly verify that proof in three rounds
//! without learning the client's input, then fold valid submissions into a
//! running sum. At the end of a batch the servers exchange their sums to
//! recover the plaintext aggregate.
//!
//! ## Module map
//!
//! - [`field`] — modular arithmetic and the radix-2 FFT/polynomial routines
//!   the proof construction is built from.
//! - [`prg`] — the AES-CTR pseudorandom stream used for Beaver triples,
//!   challenge points, and server-B's seed-compressed shares.
//! - [`crypto`] — the ephemeral X25519 + AES-128-GCM envelope that protects
//!   shares in transit.
//! - [`encode`] — big-endian bit decomposition of integers, and an opt-in
//!   fixed-point layer built on top of it.
//! - [`config`] — batch-wide parameters shared by the client and both
//!   servers.
//! - [`client`] — the encoder: builds the SNIP polynomials, splits them
//!   into shares, and emits one ciphertext per server.
//! - [`server`] — per-server aggregation state and the three-round
//!   verification protocol.
//!
//! ## Invariants
//!
//! - The scalar field `F` (`ark_bn254::Fr`) has a documented two-adicity of
//!   28, giving a radix-2 FFT domain of up to `2^28` points.
//! - All arithmetic is as provided by Arkworks; this crate forbids `unsafe`
//!   throughout.
//! - A `Server` is single-threaded per submission: one `Verifier` is driven
//!   to completion (three rounds) before the next begins. Multiple `Server`
//!   instances sharing a `Config` may run on separate threads.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Closed error taxonomy shared by every fallible public operation.
pub mod error;
/// Field arithmetic and the FFT/polynomial routines the proof needs.
pub mod field;
/// AES-CTR pseudorandom stream and additive-share helpers.
pub mod prg;
/// Ephemeral X25519 + AES-128-GCM hybrid encryption envelope.
pub mod crypto;
/// Bit decomposition and the opt-in fixed-point layer.
pub mod encode;
/// Batch-wide configuration shared by clients and servers.
pub mod config;
/// Client-side SNIP construction and share splitting.
pub mod client;
/// Server-side aggregation state and the three-round verification protocol.
pub mod server;

/// Scalar field used across the crate.
///
/// `ark_bn254::Fr` is a ~254-bit prime with two-adicity 28, i.e. its
/// multiplicative group contains a subgroup of order `2^28`, which is what
/// the radix-2 FFT in [`field`] runs over. See `DESIGN.md` for why this
/// field was chosen over reconstructing the original deployment's modulus.
pub type F = ark_bn254::Fr;

pub use error::{Error, Result};

pub use client::Client;
pub use config::Config;
pub use crypto::{Key, PrivateKey};
pub use server::{PartyIdx, Server, TotalShare, Verifier, Verify1, Verify2};
