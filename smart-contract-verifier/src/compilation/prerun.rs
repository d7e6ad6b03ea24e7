//! Wraps a compilation result that arrived already computed — e.g. copied
//! in from an external import — where positions the other variants derive
//! from compiler output or the bytecode itself are instead supplied
//! verbatim by the caller.

use super::{ContractArtifacts, FullyQualifiedName};
use cbor_auxdata::AuxdataStyle;

pub struct PreRunCompilation {
    pub target: FullyQualifiedName,
    pub compiler_version: String,
    pub artifacts: ContractArtifacts,
    pub auxdata_style: AuxdataStyle,
}

impl PreRunCompilation {
    pub fn new(
        target: FullyQualifiedName,
        compiler_version: String,
        artifacts: ContractArtifacts,
        auxdata_style: AuxdataStyle,
    ) -> Self {
        Self {
            target,
            compiler_version,
            artifacts,
            auxdata_style,
        }
    }
}
