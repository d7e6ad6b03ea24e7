use super::{
    code_artifact_types::{CborAuxdata, ImmutableReferences, LinkReferences},
    compilation_artifacts::CompilationArtifacts,
    creation_code_artifacts::CreationCodeArtifacts,
    runtime_code_artifacts::RuntimeCodeArtifacts,
};
pub use super::{
    verification_match_transformations::Transformation as MatchTransformation,
    verification_match_values::Values as MatchValues,
};
use alloy_dyn_abi::JsonAbiExt;
use anyhow::{anyhow, Context};
use bytes::Bytes;
use serde::Deserialize;

const CALL_PROTECTION_PUSH20: u8 = 0x73;
const CALL_PROTECTION_ADDRESS: u8 = 0x30;
const CALL_PROTECTION_EQ: u8 = 0x14;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub metadata_match: bool,
    pub transformations: Vec<MatchTransformation>,
    pub values: MatchValues,
}

pub fn verify_creation_code(
    on_chain_code: &[u8],
    compiled_code: Vec<u8>,
    creation_code_artifacts: &CreationCodeArtifacts,
    compilation_artifacts: &CompilationArtifacts,
) -> Result<Option<Match>, anyhow::Error> {
    let builder = MatchBuilder::new(on_chain_code, compiled_code);
    if let Some(builder) = builder {
        return Ok(builder
            .apply_creation_code_transformations(creation_code_artifacts, compilation_artifacts)?
            .verify_and_build(EqualityMode::Prefix));
    }
    Ok(None)
}

pub fn verify_runtime_code(
    on_chain_code: &[u8],
    compiled_code: Vec<u8>,
    runtime_code_artifacts: &RuntimeCodeArtifacts,
) -> Result<Option<Match>, anyhow::Error> {
    let builder = MatchBuilder::new(on_chain_code, compiled_code);
    if let Some(builder) = builder {
        return Ok(builder
            .apply_runtime_code_transformations(runtime_code_artifacts)?
            .verify_and_build(EqualityMode::Exact));
    }
    Ok(None)
}

/// Runtime code must match the on-chain code exactly (after normalization).
/// Creation code only needs to match a prefix: the remaining on-chain bytes
/// are ABI-encoded constructor arguments.
pub enum EqualityMode {
    Exact,
    Prefix,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchBuilder<'a> {
    deployed_code: &'a [u8],
    compiled_code: Vec<u8>,
    transformations: Vec<MatchTransformation>,
    values: MatchValues,
    invalid_constructor_arguments: bool,
    /// `None` until the first auxdata region is seen; thereafter the
    /// conjunction, across every region seen so far, of "the compiler's own
    /// bytes there decode to a CBOR map carrying a non-empty content hash".
    auxdata_all_valid_hash: Option<bool>,
    auxdata_replaced: bool,
}

impl<'a> MatchBuilder<'a> {
    pub fn new(deployed_code: &'a [u8], compiled_code: Vec<u8>) -> Option<Self> {
        if deployed_code.len() < compiled_code.len() {
            return None;
        }

        Some(Self {
            deployed_code,
            compiled_code,
            transformations: vec![],
            values: MatchValues::default(),
            invalid_constructor_arguments: false,
            auxdata_all_valid_hash: None,
            auxdata_replaced: false,
        })
    }

    /// Emission order fixed by the matcher: callProtection, immutables,
    /// libraries, auxdata. Creation code has no immutables of its own; those
    /// are only ever written into the runtime code at deployment time.
    pub fn apply_runtime_code_transformations(
        self,
        runtime_code_artifacts: &RuntimeCodeArtifacts,
    ) -> Result<Self, anyhow::Error> {
        self.apply_call_protection_transformation()?
            .apply_immutable_transformations(runtime_code_artifacts.immutable_references.as_ref())?
            .apply_library_transformations(runtime_code_artifacts.link_references.as_ref())?
            .apply_cbor_auxdata_transformations(runtime_code_artifacts.cbor_auxdata.as_ref())
    }

    /// libraries, then auxdata, then constructorArguments.
    pub fn apply_creation_code_transformations(
        self,
        creation_code_artifacts: &CreationCodeArtifacts,
        compilation_artifacts: &CompilationArtifacts,
    ) -> Result<Self, anyhow::Error> {
        self.apply_library_transformations(creation_code_artifacts.link_references.as_ref())?
            .apply_cbor_auxdata_transformations(creation_code_artifacts.cbor_auxdata.as_ref())?
            .apply_constructor_transformation(compilation_artifacts.abi.as_ref())
    }

    pub fn verify_and_build(self, equality_mode: EqualityMode) -> Option<Match> {
        if self.invalid_constructor_arguments {
            return None;
        }

        let equal = match equality_mode {
            EqualityMode::Exact => self.deployed_code == self.compiled_code.as_slice(),
            EqualityMode::Prefix => self.deployed_code.starts_with(&self.compiled_code),
        };
        if !equal {
            return None;
        }

        let metadata_match = !self.auxdata_replaced && self.auxdata_all_valid_hash == Some(true);
        let mut transformations = self.transformations;
        transformations.sort();
        Some(Match {
            metadata_match,
            transformations,
            values: self.values,
        })
    }

    /// Solidity libraries compiled with call-protection embed a placeholder
    /// `PUSH20 <address> ADDRESS EQ` prologue at the very start of the
    /// runtime code; solc has no way to know the deployment address ahead of
    /// time, so the placeholder is zero and must be patched from on-chain.
    fn apply_call_protection_transformation(mut self) -> Result<Self, anyhow::Error> {
        let has_prologue = |code: &[u8]| {
            code.len() >= 23
                && code[0] == CALL_PROTECTION_PUSH20
                && code[21] == CALL_PROTECTION_ADDRESS
                && code[22] == CALL_PROTECTION_EQ
        };

        if !has_prologue(&self.compiled_code) || !has_prologue(self.deployed_code) {
            return Ok(self);
        }

        let range = 1..21;
        let on_chain_value = &self.deployed_code[range.clone()];
        if &self.compiled_code[range.clone()] != on_chain_value {
            self.compiled_code.as_mut_slice()[range.clone()].copy_from_slice(on_chain_value);
            self.transformations
                .push(MatchTransformation::call_protection(range.start));
            self.values
                .set_call_protection(Bytes::copy_from_slice(on_chain_value));
        }

        Ok(self)
    }

    fn apply_cbor_auxdata_transformations(
        mut self,
        cbor_auxdata: Option<&CborAuxdata>,
    ) -> Result<Self, anyhow::Error> {
        let cbor_auxdata = match cbor_auxdata {
            Some(cbor_auxdata) => cbor_auxdata,
            None => return Ok(self),
        };

        for (id, cbor_auxdata_value) in cbor_auxdata {
            let offset = cbor_auxdata_value.offset as usize;
            let re_compiled_value = cbor_auxdata_value.value.as_slice();

            let range = offset..offset + re_compiled_value.len();
            if self.compiled_code.len() < range.end {
                return Err(anyhow!("(reason=cbor_auxdata; id={id}) out of range"));
            }

            let region_valid = cbor_auxdata::decode_exact(re_compiled_value)
                .map(|map| map.has_hash())
                .unwrap_or(false);
            self.auxdata_all_valid_hash =
                Some(self.auxdata_all_valid_hash.unwrap_or(true) && region_valid);

            let on_chain_value = &self.deployed_code[range.clone()];
            if on_chain_value != re_compiled_value {
                self.auxdata_replaced = true;
                self.compiled_code.as_mut_slice()[range].copy_from_slice(on_chain_value);

                self.transformations
                    .push(MatchTransformation::auxdata(offset, id));
                self.values.add_cbor_auxdata(id, on_chain_value.to_vec());
            }
        }

        Ok(self)
    }

    fn apply_library_transformations(
        mut self,
        link_references: Option<&LinkReferences>,
    ) -> Result<Self, anyhow::Error> {
        let link_references = match link_references {
            Some(link_references) => link_references,
            None => return Ok(self),
        };

        for (file, file_references) in link_references {
            for (contract, offsets) in file_references {
                let id = format!("{file}:{contract}");
                let mut on_chain_value = None;
                for offset in offsets {
                    let start = offset.start as usize;
                    let end = start + offset.length as usize;
                    let range = start..end;

                    let offset_value = &self.deployed_code[range.clone()];
                    match on_chain_value {
                        None => {
                            on_chain_value = Some(offset_value);
                        }
                        Some(on_chain_value) if on_chain_value != offset_value => {
                            return Err(anyhow!(
                                "(reason=link_reference; id={id}) offset values are not consistent"
                            ))
                        }
                        _ => {}
                    }

                    self.compiled_code.as_mut_slice()[range].copy_from_slice(offset_value);
                    self.transformations
                        .push(MatchTransformation::library(start, &id));
                    self.values.add_library(&id, offset_value.to_vec());
                }
            }
        }

        Ok(self)
    }

    fn apply_immutable_transformations(
        mut self,
        immutable_references: Option<&ImmutableReferences>,
    ) -> Result<Self, anyhow::Error> {
        let immutable_references = match immutable_references {
            Some(immutable_references) => immutable_references,
            None => return Ok(self),
        };

        for (id, offsets) in immutable_references {
            let mut on_chain_value = None;
            for offset in offsets {
                let start = offset.start as usize;
                let end = start + offset.length as usize;
                let range = start..end;

                let offset_value = &self.deployed_code[range.clone()];
                match on_chain_value {
                    None => {
                        on_chain_value = Some(offset_value);
                    }
                    Some(on_chain_value) if on_chain_value != offset_value => {
                        return Err(anyhow!(
                            "(reason=immutable_reference; id={id}) offset values are not consistent"
                        ))
                    }
                    _ => {}
                }

                self.compiled_code.as_mut_slice()[range].copy_from_slice(offset_value);
                self.transformations
                    .push(MatchTransformation::immutable(start, id));
                self.values.add_immutable(id, offset_value.to_vec());
            }
        }

        Ok(self)
    }

    fn apply_constructor_transformation(
        mut self,
        abi: Option<&serde_json::Value>,
    ) -> Result<Self, anyhow::Error> {
        let offset = self.compiled_code.len();
        let (_prefix, constructor_arguments) = self.deployed_code.split_at(offset);

        let constructor = match abi {
            Some(abi) => {
                alloy_json_abi::JsonAbi::deserialize(abi)
                    .context("parsing compiled contract abi")?
                    .constructor
            }
            None => None,
        };

        match constructor {
            None if !constructor_arguments.is_empty() => {
                self.invalid_constructor_arguments = true;
            }
            Some(_constructor) if constructor_arguments.is_empty() => {
                self.invalid_constructor_arguments = true;
            }
            Some(constructor)
                if constructor
                    .abi_decode_input(constructor_arguments, true)
                    .is_err() =>
            {
                self.invalid_constructor_arguments = true;
            }
            None => {}
            Some(_constructor) => {
                self.compiled_code.extend(constructor_arguments);
                self.transformations
                    .push(MatchTransformation::constructor(offset));
                self.values
                    .add_constructor_arguments(Bytes::copy_from_slice(constructor_arguments));
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_artifact_types::{CborAuxdataValue, Offset};
    use std::collections::BTreeMap;

    /// `{"ipfs": h'1220<hash>', "solc": h'000806'}`, the shape solc appends
    /// to both runtime and creation bytecode.
    fn cbor_solidity_standard_auxdata() -> Vec<u8> {
        hex::decode(concat!(
            "a2",
            "6469706673", "5822", "1220",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "64736f6c6343000806",
        ))
        .unwrap()
    }

    #[test]
    fn call_protection_prologue_is_normalized() {
        let mut deployed = vec![CALL_PROTECTION_PUSH20];
        deployed.extend_from_slice(&[0xAB; 20]);
        deployed.extend_from_slice(&[CALL_PROTECTION_ADDRESS, CALL_PROTECTION_EQ, 0x00]);

        let mut compiled = vec![CALL_PROTECTION_PUSH20];
        compiled.extend_from_slice(&[0x00; 20]);
        compiled.extend_from_slice(&[CALL_PROTECTION_ADDRESS, CALL_PROTECTION_EQ, 0x00]);

        let builder = MatchBuilder::new(&deployed, compiled)
            .unwrap()
            .apply_call_protection_transformation()
            .unwrap();

        assert_eq!(builder.compiled_code, deployed);
        assert_eq!(builder.transformations.len(), 1);
        assert_eq!(builder.values.call_protection.as_deref(), Some(&[0xAB; 20][..]));
    }

    #[test]
    fn auxdata_hash_presence_drives_metadata_match() {
        let auxdata_bytes = cbor_solidity_standard_auxdata();
        let deployed = auxdata_bytes.clone();
        let compiled = auxdata_bytes.clone();

        let mut cbor_auxdata = BTreeMap::new();
        cbor_auxdata.insert(
            "1".to_string(),
            CborAuxdataValue {
                value: auxdata_bytes,
                offset: 0,
            },
        );
        let runtime_code_artifacts = RuntimeCodeArtifacts {
            cbor_auxdata: Some(cbor_auxdata),
            ..Default::default()
        };

        let result = verify_runtime_code(&deployed, compiled, &runtime_code_artifacts)
            .unwrap()
            .expect("codes are byte-identical");
        assert!(result.metadata_match);
        assert!(result.transformations.is_empty());
    }

    #[test]
    fn auxdata_substitution_yields_partial_match() {
        let auxdata_bytes = cbor_solidity_standard_auxdata();
        let deployed = {
            let mut deployed = auxdata_bytes.clone();
            // mutate the hash bytes on-chain, as if compiled from slightly different sources
            deployed[12] ^= 0xFF;
            deployed
        };
        let compiled = auxdata_bytes.clone();

        let mut cbor_auxdata = BTreeMap::new();
        cbor_auxdata.insert(
            "1".to_string(),
            CborAuxdataValue {
                value: auxdata_bytes,
                offset: 0,
            },
        );
        let runtime_code_artifacts = RuntimeCodeArtifacts {
            cbor_auxdata: Some(cbor_auxdata),
            ..Default::default()
        };

        let result = verify_runtime_code(&deployed, compiled, &runtime_code_artifacts)
            .unwrap()
            .expect("codes match once auxdata is substituted");
        assert!(!result.metadata_match);
        assert_eq!(result.transformations.len(), 1);
    }

    #[test]
    fn creation_code_allows_trailing_constructor_arguments() {
        let compiled = vec![0x60, 0x01];
        let mut deployed = compiled.clone();
        deployed.extend_from_slice(&[0u8; 31]);
        deployed.push(0x2a); // encoded uint256(42)

        let creation_code_artifacts = CreationCodeArtifacts::default();
        let abi = serde_json::json!([{
            "type": "constructor",
            "inputs": [{"name": "x", "type": "uint256"}],
            "stateMutability": "nonpayable"
        }]);
        let compilation_artifacts = CompilationArtifacts {
            abi: Some(abi),
            ..Default::default()
        };

        let result = verify_creation_code(
            &deployed,
            compiled,
            &creation_code_artifacts,
            &compilation_artifacts,
        )
        .unwrap()
        .expect("prefix matches, trailing bytes are constructor args");
        assert_eq!(result.values.constructor_arguments.as_deref(), Some(&deployed[2..][..]));
    }
}
