//! Bytecode-matching primitives shared by the compilation driver and the
//! verification orchestrator: the transformation/values sidecar types, the
//! artifact shapes persisted alongside a compilation, and the matcher that
//! turns on-chain bytecode plus a recompiled candidate into a `Match`.

mod code_artifact_types;
mod compilation_artifacts;
mod creation_code_artifacts;
mod runtime_code_artifacts;
mod verification_match;

mod verification_match_transformations;
mod verification_match_values;

pub use code_artifact_types::{
    CborAuxdata, CborAuxdataValue, ImmutableReferences, LinkReferences, Offset, Offsets,
};
pub use compilation_artifacts::{CompilationArtifacts, SourceId, ToCompilationArtifacts};
pub use creation_code_artifacts::{CreationCodeArtifacts, ToCreationCodeArtifacts};
pub use runtime_code_artifacts::{RuntimeCodeArtifacts, ToRuntimeCodeArtifacts};
pub use verification_match::{
    verify_creation_code, verify_runtime_code, EqualityMode, Match, MatchBuilder,
    MatchTransformation, MatchValues,
};
