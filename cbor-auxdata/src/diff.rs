use crate::map::decode_prefix;
use std::collections::BTreeMap;

/// One located auxdata region: byte offset into the bytecode, and the
/// number of bytes it occupies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("normal and mutated bytecode have different lengths ({normal} vs {mutated}); the appended mutation must not change code size")]
    LengthMismatch { normal: usize, mutated: usize },
}

/// Solidity compilers older than 0.8.x (or any build that omits
/// `cborAuxdata` positions from standard-json output) give no direct way to
/// learn where CBOR auxdata sits in the bytecode. Instead: compile once
/// normally, and once more with a deterministic byte pattern appended to
/// every source file (so every emitted hash changes but no other byte of
/// the program does), then diff the two outputs byte-by-byte. Every
/// contiguous differing region whose bytes decode as a complete CBOR map
/// is one auxdata region; a differing region that doesn't (e.g. one caused
/// by the extra-file-input bug rearranging code bytes elsewhere) is skipped
/// rather than treated as a fatal error, so it doesn't swallow the auxdata
/// regions found alongside it.
pub fn locate_by_mutation_diff(
    normal: &[u8],
    mutated: &[u8],
) -> Result<BTreeMap<String, Position>, DiffError> {
    if normal.len() != mutated.len() {
        return Err(DiffError::LengthMismatch {
            normal: normal.len(),
            mutated: mutated.len(),
        });
    }

    let mut positions = BTreeMap::new();
    let mut id = 1usize;
    let mut i = 0usize;
    while i < normal.len() {
        if normal[i] == mutated[i] {
            i += 1;
            continue;
        }

        let start = i;
        while i < normal.len() && normal[i] != mutated[i] {
            i += 1;
        }
        let end = i;

        let region = &normal[start..end];
        let decodes_as_cbor_map = decode_prefix(region)
            .map(|(_, consumed)| consumed == region.len())
            .unwrap_or(false);
        if decodes_as_cbor_map {
            positions.insert(
                id.to_string(),
                Position {
                    offset: start,
                    length: end - start,
                },
            );
            id += 1;
        }
    }

    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_lengths_fail_fast() {
        let err = locate_by_mutation_diff(&[1, 2, 3], &[1, 2]).unwrap_err();
        assert!(matches!(err, DiffError::LengthMismatch { .. }));
    }

    #[test]
    fn non_cbor_region_is_skipped_not_fatal() {
        // A single-byte code mutation (not a metadata hash) produces a
        // differing region that never decodes as CBOR; it should be
        // dropped from the result rather than aborting the whole scan.
        let normal = [0x60, 0x80, 0x60, 0x40];
        let mutated = [0x60, 0x80, 0x60, 0x41];
        let positions = locate_by_mutation_diff(&normal, &mutated).unwrap();
        assert!(positions.is_empty());
    }
}
