//! Yul is compiled through the same solc binary as Solidity, but solc never
//! emits a `metadata` field for Yul inputs. The driver synthesizes one so
//! downstream auxdata handling (which is keyed off Solidity-standard
//! metadata) has something to work with.

use super::{solidity::SolcInput, ContractArtifacts, FullyQualifiedName};
use crate::{
    compiler::{version::DetailedVersion, EvmCompilersPool},
    compilation::solidity::SolcCompiler,
    errors::CompilationError,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Synthesizes the metadata object solc would have produced had the input
/// been Solidity: per-file keccak256 digests, compiler version, a settings
/// copy with `outputSelection` stripped, libraries rewritten to
/// `path:name → addr`, and `compilationTarget = { path: name }`.
pub fn synthesize_metadata(
    sources: &BTreeMap<String, String>,
    compiler_version: &str,
    settings: &Value,
    libraries: &BTreeMap<String, BTreeMap<String, String>>,
    target: &FullyQualifiedName,
) -> Value {
    let mut source_hashes = serde_json::Map::new();
    for (path, content) in sources {
        source_hashes.insert(
            path.clone(),
            json!({ "keccak256": format!("0x{}", hex::encode(keccak256(content.as_bytes()))) }),
        );
    }

    let mut settings = settings.clone();
    if let Value::Object(map) = &mut settings {
        map.remove("outputSelection");
    }

    let mut fully_qualified_libraries = serde_json::Map::new();
    for (file, libs) in libraries {
        let mut entry = serde_json::Map::new();
        for (name, addr) in libs {
            entry.insert(format!("{file}:{name}"), Value::String(addr.clone()));
        }
        if !entry.is_empty() {
            fully_qualified_libraries.insert(file.clone(), Value::Object(entry));
        }
    }
    if let Value::Object(map) = &mut settings {
        map.insert("libraries".to_string(), Value::Object(fully_qualified_libraries));
    }

    json!({
        "compiler": { "version": compiler_version },
        "language": "Yul",
        "settings": settings,
        "sources": Value::Object(source_hashes),
        "compilationTarget": { target.path(): target.name() },
    })
}

/// solc's keccak256 is not SHA-2; grounded locally since the EVM's own hash
/// is out of scope for the `sha2` dependency this crate otherwise relies on.
fn keccak256(data: &[u8]) -> [u8; 32] {
    use sha3::{Digest as _, Keccak256};
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

pub struct YulCompilation {
    pub target: FullyQualifiedName,
    pub compiler_version: String,
    pub artifacts: ContractArtifacts,
}

impl YulCompilation {
    pub async fn compile(
        pool: &EvmCompilersPool<SolcCompiler>,
        version: &DetailedVersion,
        target: FullyQualifiedName,
        input: SolcInput,
        sources: &BTreeMap<String, String>,
        libraries: &BTreeMap<String, BTreeMap<String, String>>,
    ) -> Result<Self, CompilationError> {
        let output = super::compile(pool, version, input.clone()).await?;
        let mut artifacts = output.get(&target)?.clone();

        let settings = serde_json::to_value(&input.0.settings).unwrap_or(Value::Null);
        artifacts.metadata = Some(synthesize_metadata(
            sources,
            &version.to_string(),
            &settings,
            libraries,
            &target,
        ));

        Ok(Self {
            target,
            compiler_version: version.to_string(),
            artifacts,
        })
    }
}
