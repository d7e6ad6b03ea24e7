use super::{CompilationOutput, ContractArtifacts, FullyQualifiedName, IntoCompilationOutput};
use crate::{
    compiler::{version::DetailedVersion, EvmCompiler, EvmCompilersPool},
    errors::CompilationError,
};
use async_trait::async_trait;
use foundry_compilers::artifacts::{CompilerOutput, Severity};
use std::collections::BTreeMap;
use verification_common::{
    CborAuxdata, CborAuxdataValue, CompilationArtifacts, CreationCodeArtifacts, ImmutableReferences,
    LinkReferences, Offset, RuntimeCodeArtifacts,
};

/// Newtype wrappers so the standard-JSON shape can implement the traits our
/// own compiler-pool abstraction needs without touching `foundry_compilers`.
#[derive(Clone, Debug, serde::Serialize)]
pub struct SolcInput(pub foundry_compilers::artifacts::SolcInput);

#[derive(Debug, serde::Deserialize)]
pub struct SolcOutput(pub CompilerOutput);

pub struct SolcCompiler;

#[async_trait]
impl EvmCompiler for SolcCompiler {
    type Input = SolcInput;
    type Output = SolcOutput;

    fn args(&self) -> &[&str] {
        &["--standard-json"]
    }
}

impl IntoCompilationOutput for SolcOutput {
    fn into_compilation_output(self) -> Result<CompilationOutput, CompilationError> {
        let errors: Vec<String> = self
            .0
            .errors
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .map(|e| e.formatted_message.clone().unwrap_or_else(|| e.message.clone()))
            .collect();
        if !errors.is_empty() {
            return Err(CompilationError::Compiler(errors));
        }

        let mut artifacts = BTreeMap::new();
        for (path, contracts) in self.0.contracts {
            for (name, contract) in contracts {
                let target = FullyQualifiedName::from_file_and_contract_names(
                    path.to_string_lossy(),
                    name,
                );

                let creation_bytecode = contract
                    .evm
                    .as_ref()
                    .and_then(|evm| evm.bytecode.as_ref())
                    .and_then(|b| b.object.as_bytes())
                    .map(|b| b.to_vec())
                    .unwrap_or_default();
                let runtime_bytecode = contract
                    .evm
                    .as_ref()
                    .and_then(|evm| evm.deployed_bytecode.as_ref())
                    .and_then(|b| b.bytecode.as_ref())
                    .and_then(|b| b.object.as_bytes())
                    .map(|b| b.to_vec())
                    .unwrap_or_default();

                let creation_link_references = contract
                    .evm
                    .as_ref()
                    .and_then(|evm| evm.bytecode.as_ref())
                    .map(|b| convert_link_references(&b.link_references))
                    .unwrap_or_default();
                let runtime_link_references = contract
                    .evm
                    .as_ref()
                    .and_then(|evm| evm.deployed_bytecode.as_ref())
                    .and_then(|b| b.bytecode.as_ref())
                    .map(|b| convert_link_references(&b.link_references))
                    .unwrap_or_default();
                let immutable_references = contract
                    .evm
                    .as_ref()
                    .and_then(|evm| evm.deployed_bytecode.as_ref())
                    .map(|b| convert_immutable_references(&b.immutable_references))
                    .unwrap_or_default();
                let runtime_cbor_auxdata = contract
                    .evm
                    .as_ref()
                    .and_then(|evm| evm.deployed_bytecode.as_ref())
                    .and_then(|b| b.bytecode.as_ref())
                    .map(|b| convert_cbor_auxdata(&b.cbor_auxdata))
                    .unwrap_or_default();
                let creation_cbor_auxdata = contract
                    .evm
                    .as_ref()
                    .and_then(|evm| evm.bytecode.as_ref())
                    .map(|b| convert_cbor_auxdata(&b.cbor_auxdata))
                    .unwrap_or_default();

                let compilation_artifacts = CompilationArtifacts {
                    abi: contract.abi.as_ref().map(|abi| {
                        serde_json::to_value(abi).expect("abi is always serializable")
                    }),
                    devdoc: contract.devdoc.as_ref().map(|v| serde_json::to_value(v).unwrap()),
                    userdoc: contract.userdoc.as_ref().map(|v| serde_json::to_value(v).unwrap()),
                    storage_layout: contract
                        .storage_layout
                        .as_ref()
                        .map(|v| serde_json::to_value(v).unwrap()),
                };

                artifacts.insert(
                    target,
                    ContractArtifacts {
                        creation_bytecode,
                        runtime_bytecode,
                        compilation_artifacts,
                        creation_code_artifacts: CreationCodeArtifacts {
                            source_map: None,
                            link_references: Some(creation_link_references),
                            cbor_auxdata: Some(creation_cbor_auxdata),
                        },
                        runtime_code_artifacts: RuntimeCodeArtifacts {
                            cbor_auxdata: Some(runtime_cbor_auxdata),
                            immutable_references: Some(immutable_references),
                            link_references: Some(runtime_link_references),
                            source_map: None,
                        },
                        metadata: contract
                            .metadata
                            .as_ref()
                            .map(|m| serde_json::to_value(m).expect("metadata is serializable")),
                    },
                );
            }
        }

        Ok(CompilationOutput { artifacts })
    }
}

fn convert_link_references(
    raw: &BTreeMap<String, BTreeMap<String, Vec<foundry_compilers::artifacts::Offset>>>,
) -> LinkReferences {
    raw.iter()
        .map(|(file, libs)| {
            let libs = libs
                .iter()
                .map(|(name, offsets)| {
                    let offsets = offsets
                        .iter()
                        .map(|o| Offset {
                            start: o.start,
                            length: o.length,
                        })
                        .collect();
                    (name.clone(), offsets)
                })
                .collect();
            (file.clone(), libs)
        })
        .collect()
}

fn convert_immutable_references(
    raw: &BTreeMap<String, Vec<foundry_compilers::artifacts::Offset>>,
) -> ImmutableReferences {
    raw.iter()
        .map(|(ast_id, offsets)| {
            let offsets = offsets
                .iter()
                .map(|o| Offset {
                    start: o.start,
                    length: o.length,
                })
                .collect();
            (ast_id.clone(), offsets)
        })
        .collect()
}

fn convert_cbor_auxdata(
    raw: &BTreeMap<String, foundry_compilers::artifacts::CborAuxdata>,
) -> CborAuxdata {
    raw.iter()
        .map(|(id, entry)| {
            (
                id.clone(),
                CborAuxdataValue {
                    value: entry.value.to_vec(),
                    offset: entry.offset as u32,
                },
            )
        })
        .collect()
}

pub struct SolidityCompilation {
    pub target: FullyQualifiedName,
    pub compiler_version: String,
    pub artifacts: ContractArtifacts,
}

impl SolidityCompilation {
    pub async fn compile(
        pool: &EvmCompilersPool<SolcCompiler>,
        version: &DetailedVersion,
        target: FullyQualifiedName,
        input: SolcInput,
    ) -> Result<Self, CompilationError> {
        let output = super::compile(pool, version, input.clone()).await?;
        let mut artifacts = output.get(&target)?.clone();

        let needs_mutation_diff = artifacts
            .runtime_code_artifacts
            .cbor_auxdata
            .as_ref()
            .map(|m| m.is_empty())
            .unwrap_or(true);
        if needs_mutation_diff {
            if let Ok((creation_auxdata, runtime_auxdata)) = crate::auxdata_locator::locate_by_mutation_diff(
                pool,
                version,
                &input,
                &target,
                &artifacts.creation_bytecode,
                &artifacts.runtime_bytecode,
            )
            .await
            {
                if !runtime_auxdata.is_empty() {
                    artifacts.runtime_code_artifacts.cbor_auxdata = Some(runtime_auxdata);
                }
                if !creation_auxdata.is_empty() {
                    artifacts.creation_code_artifacts.cbor_auxdata = Some(creation_auxdata);
                }
            }
        }

        Ok(Self {
            target,
            compiler_version: version.to_string(),
            artifacts,
        })
    }
}
