//! Typed error taxonomy. Every surfaced error carries a `customCode` (the
//! `ErrorKind`'s serde tag), an `errorId` (uuid, for correlating with the
//! ephemeral diagnostics the scheduler records) and a `message`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("missing source")]
    MissingSource,
    #[error("missing or invalid source")]
    MissingOrInvalidSource,
    #[error("invalid compilation target")]
    InvalidCompilationTarget,
    #[error("unsupported language")]
    UnsupportedLanguage,
    #[error("unsupported chain")]
    UnsupportedChain,

    #[error("compiler reported errors")]
    CompilerError,
    #[error("no compiler output")]
    NoCompilerOutput,
    #[error("contract not found in compiler output")]
    ContractNotFoundInCompilerOutput,
    #[error("metadata not set")]
    MetadataNotSet,
    #[error("invalid compiler version")]
    InvalidCompilerVersion,
    #[error("cannot generate cbor auxdata positions")]
    CannotGenerateCborAuxdataPositions,
    #[error("creation bytecode cbor auxdata not set")]
    CreationBytecodeCborAuxdataNotSet,
    #[error("runtime bytecode cbor auxdata not set")]
    RuntimeBytecodeCborAuxdataNotSet,

    #[error("can't fetch bytecode")]
    CantFetchBytecode,
    #[error("contract not deployed")]
    ContractNotDeployed,
    #[error("compiled bytecode is zero")]
    CompiledBytecodeIsZero,
    #[error("bytecode length mismatch")]
    BytecodeLengthMismatch,
    #[error("extra file input bug")]
    ExtraFileInputBug,
    #[error("no match")]
    NoMatch,
    #[error("onchain runtime bytecode not available")]
    OnchainRuntimeBytecodeNotAvailable,
    #[error("onchain creation bytecode not available")]
    OnchainCreationBytecodeNotAvailable,

    #[error("job not found")]
    JobNotFound,
    #[error("already verified")]
    AlreadyVerified,
    #[error("duplicate verification request")]
    DuplicateVerificationRequest,
}

/// The error payload stored on a failed `VerificationJob`, and the diagnostic
/// bytecodes stashed alongside it in the ephemeral table (see §6.4's
/// `verification_jobs_ephemeral`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobError {
    pub custom_code: ErrorKind,
    pub error_id: Uuid,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recompiled_creation_code: Option<bytes::Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recompiled_runtime_code: Option<bytes::Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_creation_code: Option<bytes::Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_runtime_code: Option<bytes::Bytes>,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            custom_code: kind,
            error_id: Uuid::new_v4(),
            message: message.into(),
            recompiled_creation_code: None,
            recompiled_runtime_code: None,
            onchain_creation_code: None,
            onchain_runtime_code: None,
        }
    }

    pub fn with_diagnostic_bytecodes(
        mut self,
        recompiled_creation_code: Option<bytes::Bytes>,
        recompiled_runtime_code: Option<bytes::Bytes>,
        onchain_creation_code: Option<bytes::Bytes>,
        onchain_runtime_code: Option<bytes::Bytes>,
    ) -> Self {
        self.recompiled_creation_code = recompiled_creation_code;
        self.recompiled_runtime_code = recompiled_runtime_code;
        self.onchain_creation_code = onchain_creation_code;
        self.onchain_runtime_code = onchain_runtime_code;
        self
    }
}

/// Compilation-level failures, distinct from [`ErrorKind`] in that they carry
/// the compiler's own diagnostics rather than being a closed taxonomy tag.
#[derive(Debug, thiserror::Error)]
pub enum CompilationError {
    #[error("compiler reported errors: {0:?}")]
    Compiler(Vec<String>),
    #[error("no output produced for target {0}")]
    NoOutput(String),
    #[error("compiler output exceeded size limit")]
    OutputTooLarge,
    #[error("fetching compiler version {0}: {1}")]
    VersionFetch(String, #[source] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<&CompilationError> for ErrorKind {
    fn from(value: &CompilationError) -> Self {
        match value {
            CompilationError::Compiler(_) => ErrorKind::CompilerError,
            CompilationError::NoOutput(_) => ErrorKind::ContractNotFoundInCompilerOutput,
            CompilationError::OutputTooLarge => ErrorKind::CompilerError,
            CompilationError::VersionFetch(_, _) => ErrorKind::InvalidCompilerVersion,
            CompilationError::Io(_) | CompilationError::Json(_) => ErrorKind::NoCompilerOutput,
        }
    }
}
