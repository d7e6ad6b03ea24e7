//! A `Compilation` is a tagged variant over the three source languages plus
//! a `PreRun` case that wraps an already-compiled output (e.g. imported
//! from Sourcify) instead of invoking a compiler. All four expose the same
//! capability set so the matcher and orchestrator never need to branch on
//! language themselves.

pub mod prerun;
pub mod solidity;
pub mod vyper;
pub mod yul;

use crate::errors::CompilationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use verification_common::{CompilationArtifacts, CreationCodeArtifacts, RuntimeCodeArtifacts};

/// `path:name`, identifying one contract within a multi-contract input.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FullyQualifiedName {
    path: String,
    name: String,
}

impl FullyQualifiedName {
    pub fn from_file_and_contract_names(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FullyQualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.name)
    }
}

/// Everything the matcher and Store need about one compiled contract.
#[derive(Clone, Debug, Default)]
pub struct ContractArtifacts {
    pub creation_bytecode: Vec<u8>,
    pub runtime_bytecode: Vec<u8>,
    pub compilation_artifacts: CompilationArtifacts,
    pub creation_code_artifacts: CreationCodeArtifacts,
    pub runtime_code_artifacts: RuntimeCodeArtifacts,
    /// The compiler's own metadata object (parsed canonical metadata), or a
    /// synthesized one for Yul, whose `sources` digests and `settings`
    /// feed the CBOR auxdata locator.
    pub metadata: Option<serde_json::Value>,
}

/// The full output of one compiler invocation: one [`ContractArtifacts`] per
/// contract named in the input's `outputSelection`.
#[derive(Clone, Debug, Default)]
pub struct CompilationOutput {
    pub artifacts: std::collections::BTreeMap<FullyQualifiedName, ContractArtifacts>,
}

impl CompilationOutput {
    pub fn get(&self, target: &FullyQualifiedName) -> Result<&ContractArtifacts, CompilationError> {
        self.artifacts
            .get(target)
            .ok_or_else(|| CompilationError::NoOutput(target.to_string()))
    }
}

/// An output type a specific compiler family's `EvmCompiler::Output`
/// produces; bridges the raw standard-JSON shape into [`CompilationOutput`].
pub trait IntoCompilationOutput {
    fn into_compilation_output(self) -> Result<CompilationOutput, CompilationError>;
}

pub use crate::compiler::pool::EvmCompilersPool;

/// Invokes `pool` for `version` with `input`, then lifts the compiler's
/// native output shape into the language-independent [`CompilationOutput`].
pub async fn compile<C>(
    pool: &EvmCompilersPool<C>,
    version: &crate::compiler::DetailedVersion,
    input: C::Input,
) -> Result<CompilationOutput, CompilationError>
where
    C: crate::compiler::EvmCompiler,
    C::Output: IntoCompilationOutput,
{
    let output = pool.compile(version, &input).await?;
    output.into_compilation_output()
}

/// One input source plus the compiler version it was compiled with,
/// together with the derived views the matcher and Store need. `PreRun`
/// skips invocation entirely: its artifacts arrived pre-computed.
pub enum Compilation {
    Solidity(solidity::SolidityCompilation),
    Yul(yul::YulCompilation),
    Vyper(vyper::VyperCompilation),
    PreRun(prerun::PreRunCompilation),
}

impl Compilation {
    pub fn target(&self) -> &FullyQualifiedName {
        match self {
            Compilation::Solidity(c) => &c.target,
            Compilation::Yul(c) => &c.target,
            Compilation::Vyper(c) => &c.target,
            Compilation::PreRun(c) => &c.target,
        }
    }

    pub fn artifacts(&self) -> &ContractArtifacts {
        match self {
            Compilation::Solidity(c) => &c.artifacts,
            Compilation::Yul(c) => &c.artifacts,
            Compilation::Vyper(c) => &c.artifacts,
            Compilation::PreRun(c) => &c.artifacts,
        }
    }

    pub fn compiler_version(&self) -> &str {
        match self {
            Compilation::Solidity(c) => &c.compiler_version,
            Compilation::Yul(c) => &c.compiler_version,
            Compilation::Vyper(c) => &c.compiler_version,
            Compilation::PreRun(c) => &c.compiler_version,
        }
    }

    /// The auxdata style governing how many CBOR regions to expect and how
    /// to locate them when the compiler didn't report positions directly.
    pub fn auxdata_style(&self) -> cbor_auxdata::AuxdataStyle {
        match self {
            Compilation::Solidity(_) | Compilation::Yul(_) => {
                cbor_auxdata::AuxdataStyle::SolidityStandard
            }
            Compilation::Vyper(c) => c.auxdata_style(),
            Compilation::PreRun(c) => c.auxdata_style,
        }
    }
}
