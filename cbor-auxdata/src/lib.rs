//! CBOR auxdata location and decoding.
//!
//! The EVM bytecode compilers in scope (solc, Yul-via-solc, Vyper) append a
//! CBOR-encoded metadata block ("auxdata") to the bytecode they emit. This
//! crate finds that block's byte range within a given bytecode and decodes
//! enough of it to tell a `perfect` match (hash reproduced exactly) from a
//! `partial` one (hash differs, metadata substituted).

mod diff;
mod map;
mod style;
mod vyper;

pub use diff::{locate_by_mutation_diff, DiffError, Position as DiffPosition};
pub use map::{decode_exact, decode_prefix, AuxdataMap, DecodeError};
pub use style::AuxdataStyle;
pub use vyper::{immutable_slots_after_auxdata, locate_trailing, Position as VyperPosition};
