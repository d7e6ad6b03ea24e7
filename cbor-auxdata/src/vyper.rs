use crate::{
    map::decode_prefix,
    style::AuxdataStyle,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub length: usize,
}

/// Maximum number of trailing bytes scanned when hunting for an
/// unprefixed Vyper auxdata blob (0.3.5 - 0.3.9). Real CBOR auxdata blobs
/// are well under this size; bounding the scan keeps a malformed bytecode
/// from causing a full-bytecode decode attempt at every offset.
const MAX_UNPREFIXED_SCAN: usize = 256;

/// Locates the trailing CBOR auxdata region of a Vyper-compiled bytecode,
/// according to the encoding convention fixed by `style`. Returns `None`
/// when `style` carries no auxdata at all (`VyperPre0_3_5`) or when no
/// valid region is found.
pub fn locate_trailing(bytecode: &[u8], style: AuxdataStyle) -> Option<Position> {
    match style {
        AuxdataStyle::VyperPre0_3_5 => None,
        AuxdataStyle::Vyper0_3_5To0_3_9 => locate_unprefixed(bytecode),
        AuxdataStyle::Vyper0_3_10OrNewer | AuxdataStyle::Vyper0_4_1OrNewer => {
            locate_length_prefixed(bytecode)
        }
        AuxdataStyle::SolidityStandard | AuxdataStyle::None => None,
    }
}

/// No length prefix: scan candidate start offsets near the end of the
/// bytecode and keep the one whose CBOR map decode consumes exactly to the
/// end of the bytecode.
fn locate_unprefixed(bytecode: &[u8]) -> Option<Position> {
    let floor = bytecode.len().saturating_sub(MAX_UNPREFIXED_SCAN);
    for start in (floor..bytecode.len()).rev() {
        let candidate = &bytecode[start..];
        if let Ok((map, consumed)) = decode_prefix(candidate) {
            if consumed == candidate.len() && (map.has_hash() || map.experimental.is_some()) {
                return Some(Position {
                    offset: start,
                    length: candidate.len(),
                });
            }
        }
    }
    None
}

/// Length-prefixed: the last two bytes are a big-endian `u16` byte count of
/// the CBOR blob immediately preceding them.
fn locate_length_prefixed(bytecode: &[u8]) -> Option<Position> {
    if bytecode.len() < 2 {
        return None;
    }
    let prefix_at = bytecode.len() - 2;
    let length = u16::from_be_bytes([bytecode[prefix_at], bytecode[prefix_at + 1]]) as usize;
    if length == 0 || length > prefix_at {
        return None;
    }
    let start = prefix_at - length;
    let candidate = &bytecode[start..prefix_at];
    let (_, consumed) = decode_prefix(candidate).ok()?;
    if consumed != candidate.len() {
        return None;
    }
    Some(Position {
        offset: start,
        length,
    })
}

/// Vyper >=0.4.1 appends immutables to the runtime bytecode *after* the
/// auxdata region; each occupies one 32-byte slot running to the end of
/// the bytecode. `auxdata_end` is the byte offset immediately past the
/// located auxdata region (and its 2-byte length suffix).
pub fn immutable_slots_after_auxdata(runtime_len: usize, auxdata_end: usize) -> Vec<(usize, usize)> {
    let mut slots = Vec::new();
    let mut offset = auxdata_end;
    while offset + 32 <= runtime_len {
        slots.push((offset, 32));
        offset += 32;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockscout_display_bytes::Bytes as DisplayBytes;
    use std::str::FromStr;

    #[test]
    fn locates_length_prefixed_region() {
        let auxdata_hex =
            "a2646970667358221220bcc988b1311237f2c00ccd0bfbd8b01d24dc18f720603b0de93fe6327df5362564736f6c634300080e";
        let auxdata = DisplayBytes::from_str(auxdata_hex).unwrap().0;
        let mut bytecode = vec![0x60, 0x80, 0x60, 0x40];
        bytecode.extend_from_slice(&auxdata);
        bytecode.extend_from_slice(&(auxdata.len() as u16).to_be_bytes());

        let position = locate_trailing(&bytecode, AuxdataStyle::Vyper0_3_10OrNewer)
            .expect("auxdata should be found");
        assert_eq!(position.offset, 4);
        assert_eq!(position.length, auxdata.len());
    }

    #[test]
    fn pre_0_3_5_has_no_auxdata() {
        let bytecode = [0x60, 0x80, 0x60, 0x40];
        assert_eq!(locate_trailing(&bytecode, AuxdataStyle::VyperPre0_3_5), None);
    }

    #[test]
    fn immutable_slots_cover_trailing_region() {
        let slots = immutable_slots_after_auxdata(100, 36);
        assert_eq!(slots, vec![(36, 32), (68, 32)]);
    }
}
