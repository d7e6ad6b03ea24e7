use minicbor::{data::Type, Decode, Decoder};

/// The decoded contents of one CBOR auxdata map, keeping only the keys the
/// matcher needs to classify a match as `perfect` vs `partial`: the
/// content-hash fields and the embedded compiler version.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuxdataMap {
    pub ipfs: Option<Vec<u8>>,
    pub bzzr0: Option<Vec<u8>>,
    pub bzzr1: Option<Vec<u8>>,
    pub experimental: Option<bool>,
}

impl AuxdataMap {
    /// `perfect` match requires a non-empty content hash to have survived
    /// recompilation unchanged; `experimental`-only auxdata carries no hash.
    pub fn has_hash(&self) -> bool {
        self.ipfs.as_ref().is_some_and(|v| !v.is_empty())
            || self.bzzr0.as_ref().is_some_and(|v| !v.is_empty())
            || self.bzzr1.as_ref().is_some_and(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum DecodeError {
    #[error("decoding auxdata CBOR map: {0}")]
    Cbor(#[source] MiniCborError),
    #[error("auxdata decoded but did not consume the full input ({consumed} of {total} bytes)")]
    TrailingBytes { consumed: usize, total: usize },
}

/// A thin `Copy`+`Error` wrapper, since `minicbor::decode::Error` itself is
/// not `Copy` (it may carry a custom error), which this crate's tests rely
/// on for convenient round-tripping.
#[derive(Debug, Clone)]
pub struct MiniCborError(pub String);

impl std::fmt::Display for MiniCborError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
impl std::error::Error for MiniCborError {}

#[derive(Default)]
struct DecodeContext {
    used_size: usize,
}

impl<'b> Decode<'b, DecodeContext> for AuxdataMap {
    fn decode(d: &mut Decoder<'b>, ctx: &mut DecodeContext) -> Result<Self, minicbor::decode::Error> {
        let number_of_elements = d.map()?.unwrap_or(u64::MAX);

        let mut map = AuxdataMap::default();
        for _ in 0..number_of_elements {
            let key = match d.str() {
                Ok(key) => key.to_string(),
                Err(_) => break,
            };
            match key.as_str() {
                "ipfs" => map.ipfs = Some(read_bytes(d)?),
                "bzzr0" => map.bzzr0 = Some(read_bytes(d)?),
                "bzzr1" => map.bzzr1 = Some(read_bytes(d)?),
                "experimental" => map.experimental = Some(d.bool()?),
                _ => {
                    d.skip()?;
                }
            }
        }
        ctx.used_size = d.position();
        Ok(map)
    }
}

fn read_bytes(d: &mut Decoder<'_>) -> Result<Vec<u8>, minicbor::decode::Error> {
    match d.datatype()? {
        Type::Bytes => Ok(d.bytes()?.to_vec()),
        Type::String => Ok(d.str()?.as_bytes().to_vec()),
        _ => Err(minicbor::decode::Error::message(
            "expected bytes or string value in auxdata map",
        )),
    }
}

/// Decodes one CBOR auxdata blob, requiring that decoding consumes exactly
/// `bytes.len()` bytes — a partial decode means `bytes` was not a single,
/// tightly-packed CBOR map and the caller picked the wrong region.
pub fn decode_exact(bytes: &[u8]) -> Result<AuxdataMap, DecodeError> {
    let mut ctx = DecodeContext::default();
    let map: AuxdataMap = minicbor::decode_with(bytes, &mut ctx)
        .map_err(|err| DecodeError::Cbor(MiniCborError(err.to_string())))?;
    if ctx.used_size != bytes.len() {
        return Err(DecodeError::TrailingBytes {
            consumed: ctx.used_size,
            total: bytes.len(),
        });
    }
    Ok(map)
}

/// Like [`decode_exact`], but tolerates trailing bytes and reports how many
/// were consumed; used when the auxdata length is not yet known (e.g. when
/// probing offsets for the mutation-diff technique).
pub fn decode_prefix(bytes: &[u8]) -> Result<(AuxdataMap, usize), DecodeError> {
    let mut ctx = DecodeContext::default();
    let map: AuxdataMap = minicbor::decode_with(bytes, &mut ctx)
        .map_err(|err| DecodeError::Cbor(MiniCborError(err.to_string())))?;
    Ok((map, ctx.used_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockscout_display_bytes::Bytes as DisplayBytes;
    use std::str::FromStr;

    #[test]
    fn decodes_ipfs_hash() {
        let hex = "a2646970667358221220bcc988b1311237f2c00ccd0bfbd8b01d24dc18f720603b0de93fe6327df5362564736f6c634300080e";
        let encoded = DisplayBytes::from_str(hex).unwrap().0;
        let (map, used) = decode_prefix(&encoded).expect("valid auxdata");
        assert_eq!(used, encoded.len());
        assert!(map.has_hash());
        assert!(map.ipfs.is_some());
    }

    #[test]
    fn experimental_only_has_no_hash() {
        // {"experimental": true}
        let hex = "a16c6578706572696d656e74616cf5";
        let encoded = DisplayBytes::from_str(hex).unwrap().0;
        let map = decode_exact(&encoded).expect("valid auxdata");
        assert!(!map.has_hash());
    }

    #[test]
    fn rejects_trailing_bytes_in_decode_exact() {
        let hex = "a16c6578706572696d656e74616cf5ff";
        let encoded = DisplayBytes::from_str(hex).unwrap().0;
        assert!(matches!(
            decode_exact(&encoded),
            Err(DecodeError::TrailingBytes { .. })
        ));
    }
}
