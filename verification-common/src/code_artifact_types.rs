use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One CBOR auxdata region found in a piece of bytecode: the byte offset it
/// starts at, and the exact bytes the compiler produced there.
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CborAuxdataValue {
    #[serde_as(as = "blockscout_display_bytes::serde_as::Hex")]
    pub value: Vec<u8>,
    pub offset: u32,
}

/// Keyed by auxdata id (`"1"`, `"2"`, ...); ids are not meaningful outside
/// of one compilation, only their relative ordering (ascending by offset).
pub type CborAuxdata = BTreeMap<String, CborAuxdataValue>;

/// A single placeholder occurrence: `length` bytes starting at `start`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub start: u32,
    pub length: u32,
}

pub type Offsets = Vec<Offset>;

/// `file -> library name -> occurrences of that library's placeholder`.
pub type LinkReferences = BTreeMap<String, BTreeMap<String, Offsets>>;

/// `AST id -> occurrences of that immutable's value`.
pub type ImmutableReferences = BTreeMap<String, Offsets>;
