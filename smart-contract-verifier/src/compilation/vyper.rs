//! Vyper's standard-JSON dialect mirrors solc's closely enough to share the
//! same pool/process machinery, but its compiler never reports auxdata
//! positions or immutable references the way solc does — both have to be
//! located after the fact from the raw bytecode.

use super::{CompilationOutput, ContractArtifacts, FullyQualifiedName, IntoCompilationOutput};
use crate::{
    compiler::{version::DetailedVersion, EvmCompiler, EvmCompilersPool},
    errors::CompilationError,
};
use async_trait::async_trait;
use cbor_auxdata::AuxdataStyle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use verification_common::{
    CborAuxdataValue, CompilationArtifacts, CreationCodeArtifacts, ImmutableReferences, Offset,
    RuntimeCodeArtifacts,
};

#[derive(Clone, Debug, Serialize)]
pub struct VyperInput {
    pub language: String,
    pub sources: BTreeMap<String, VyperSource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub interfaces: BTreeMap<String, VyperSource>,
    pub settings: serde_json::Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct VyperSource {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct VyperOutput {
    #[serde(default)]
    pub errors: Vec<VyperDiagnostic>,
    #[serde(default)]
    pub contracts: BTreeMap<String, BTreeMap<String, VyperContract>>,
}

#[derive(Debug, Deserialize)]
pub struct VyperDiagnostic {
    pub severity: String,
    pub message: String,
    #[serde(default)]
    pub formatted_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VyperContract {
    pub abi: Option<serde_json::Value>,
    pub evm: VyperEvm,
}

#[derive(Debug, Deserialize)]
pub struct VyperEvm {
    pub bytecode: VyperBytecode,
    pub deployed_bytecode: VyperBytecode,
}

#[derive(Debug, Deserialize)]
pub struct VyperBytecode {
    pub object: String,
}

pub struct VyperCompiler;

#[async_trait]
impl EvmCompiler for VyperCompiler {
    type Input = VyperInput;
    type Output = VyperOutput;

    fn args(&self) -> &[&str] {
        &["-f", "combined_json", "--standard-json"]
    }
}

fn decode_object(object: &str) -> Vec<u8> {
    hex::decode(object.strip_prefix("0x").unwrap_or(object)).unwrap_or_default()
}

impl IntoCompilationOutput for VyperOutput {
    fn into_compilation_output(self) -> Result<CompilationOutput, CompilationError> {
        let errors: Vec<String> = self
            .errors
            .iter()
            .filter(|e| e.severity == "error")
            .map(|e| e.formatted_message.clone().unwrap_or_else(|| e.message.clone()))
            .collect();
        if !errors.is_empty() {
            return Err(CompilationError::Compiler(errors));
        }

        let mut artifacts = BTreeMap::new();
        for (path, contracts) in self.contracts {
            for (name, contract) in contracts {
                let target = FullyQualifiedName::from_file_and_contract_names(path.clone(), name);
                artifacts.insert(
                    target,
                    ContractArtifacts {
                        creation_bytecode: decode_object(&contract.evm.bytecode.object),
                        runtime_bytecode: decode_object(&contract.evm.deployed_bytecode.object),
                        compilation_artifacts: CompilationArtifacts {
                            abi: contract.abi,
                            ..Default::default()
                        },
                        creation_code_artifacts: CreationCodeArtifacts::default(),
                        runtime_code_artifacts: RuntimeCodeArtifacts::default(),
                        metadata: None,
                    },
                );
            }
        }

        Ok(CompilationOutput { artifacts })
    }
}

pub struct VyperCompilation {
    pub target: FullyQualifiedName,
    pub compiler_version: String,
    pub artifacts: ContractArtifacts,
    style: AuxdataStyle,
}

impl VyperCompilation {
    pub async fn compile(
        pool: &EvmCompilersPool<VyperCompiler>,
        version: &DetailedVersion,
        target: FullyQualifiedName,
        input: VyperInput,
    ) -> Result<Self, CompilationError> {
        let output = super::compile(pool, version, input).await?;
        let mut artifacts = output.get(&target)?.clone();
        let style = AuxdataStyle::for_vyper(version.version());

        // Auxdata is always a literal suffix of the *creation* bytecode:
        // >=0.4.1 appends immutable slots to the runtime bytecode only,
        // after deployment, so scanning the runtime bytecode's own tail
        // would find nothing whenever a contract declares an immutable.
        // Creation and runtime bytecode share the same prefix up to and
        // including the auxdata region, so the offset located here is
        // valid in both.
        if let Some(position) =
            cbor_auxdata::locate_trailing(&artifacts.creation_bytecode, style)
        {
            let value = artifacts.creation_bytecode
                [position.offset..position.offset + position.length]
                .to_vec();

            let mut creation_cbor_auxdata = BTreeMap::new();
            creation_cbor_auxdata.insert(
                "1".to_string(),
                CborAuxdataValue {
                    value: value.clone(),
                    offset: position.offset as u32,
                },
            );
            artifacts.creation_code_artifacts.cbor_auxdata = Some(creation_cbor_auxdata);

            let mut runtime_cbor_auxdata = BTreeMap::new();
            if artifacts.runtime_bytecode.len() >= position.offset + position.length {
                runtime_cbor_auxdata.insert(
                    "1".to_string(),
                    CborAuxdataValue {
                        value,
                        offset: position.offset as u32,
                    },
                );
            }
            artifacts.runtime_code_artifacts.cbor_auxdata = Some(runtime_cbor_auxdata);

            if style == AuxdataStyle::Vyper0_4_1OrNewer {
                let suffix_len = if style.has_trailing_length_prefix() { 2 } else { 0 };
                let auxdata_end = position.offset + position.length + suffix_len;
                let slots = cbor_auxdata::immutable_slots_after_auxdata(
                    artifacts.runtime_bytecode.len(),
                    auxdata_end,
                );
                let mut immutable_references: ImmutableReferences = BTreeMap::new();
                for (id, (start, length)) in slots.into_iter().enumerate() {
                    immutable_references.insert(
                        id.to_string(),
                        vec![Offset {
                            start: start as u32,
                            length: length as u32,
                        }],
                    );
                }
                artifacts.runtime_code_artifacts.immutable_references = Some(immutable_references);
            }
        }

        Ok(Self {
            target,
            compiler_version: version.to_string(),
            artifacts,
            style,
        })
    }

    pub fn auxdata_style(&self) -> AuxdataStyle {
        self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_object_strips_0x_prefix() {
        assert_eq!(decode_object("0x6001"), vec![0x60, 0x01]);
        assert_eq!(decode_object("6001"), vec![0x60, 0x01]);
    }

    #[test]
    fn decode_object_rejects_invalid_hex_as_empty() {
        assert_eq!(decode_object("not-hex"), Vec::<u8>::new());
    }

    #[test]
    fn compiler_error_surfaces_all_error_severity_diagnostics() {
        let output = VyperOutput {
            errors: vec![
                VyperDiagnostic {
                    severity: "error".to_string(),
                    message: "undeclared name".to_string(),
                    formatted_message: None,
                },
                VyperDiagnostic {
                    severity: "warning".to_string(),
                    message: "unused variable".to_string(),
                    formatted_message: None,
                },
            ],
            contracts: BTreeMap::new(),
        };
        let result = output.into_compilation_output();
        match result {
            Err(CompilationError::Compiler(errors)) => {
                assert_eq!(errors, vec!["undeclared name".to_string()]);
            }
            other => panic!("expected Compiler error, got {other:?}"),
        }
    }
}
