//! Per-request verification workflow (§4.3): `INIT -> FETCH_RUNTIME ->
//! COMPILE -> MATCH_RUNTIME -> (optional) FETCH_CREATION -> MATCH_CREATION
//! -> DONE | FAIL`. Runs entirely within one scheduler worker; every
//! suspension point (RPC call, compiler subprocess wait) is cooperative.

use crate::{
    chain::Chain,
    compilation::Compilation,
    errors::{ErrorKind, JobError},
    types::{PartMatch, Verification},
};
use std::sync::Arc;
use verification_common::{verify_creation_code, verify_runtime_code};

pub struct OrchestratorInput {
    pub chain_id: u64,
    pub address: String,
    pub compilation: Compilation,
    pub chain: Arc<dyn Chain>,
    pub creator_tx_hash: Option<String>,
    pub optimizer_enabled: bool,
}

/// Runs the full state machine to completion, returning either a verified
/// [`Verification`] (§4.3 `DONE`) or a typed [`JobError`] (`FAIL`).
pub async fn run(input: OrchestratorInput) -> Result<Verification, JobError> {
    // FETCH_RUNTIME
    let onchain_runtime_bytecode = input
        .chain
        .get_bytecode(&input.address, None)
        .await
        .map_err(|_| JobError::new(ErrorKind::CantFetchBytecode, "fetching on-chain runtime bytecode"))?;
    if onchain_runtime_bytecode.is_empty() {
        return Err(JobError::new(
            ErrorKind::ContractNotDeployed,
            "on-chain runtime bytecode is empty",
        ));
    }

    // Built early so every failure path below can attach diagnostic
    // bytecodes (§7, spec testable scenario 6) via `with_bytecode_diagnostics`.
    let mut verification = Verification::new(
        input.chain_id,
        input.address.clone(),
        input.compilation,
        onchain_runtime_bytecode.clone(),
    );

    // COMPILE already completed by the caller (it builds `input.compilation`
    // via the compilation driver); this stage only validates its output.
    let artifacts = verification.compilation.artifacts();
    if artifacts.creation_bytecode.is_empty() && artifacts.runtime_bytecode.is_empty() {
        return Err(with_bytecode_diagnostics(
            JobError::new(
                ErrorKind::CompiledBytecodeIsZero,
                "compiled creation and runtime bytecode are both empty",
            ),
            &verification,
        ));
    }

    if let Err(error) = check_early_length_rule(&verification.compilation, &onchain_runtime_bytecode) {
        return Err(with_bytecode_diagnostics(error, &verification));
    }

    // MATCH_RUNTIME
    let runtime_match =
        match_runtime(&verification).map_err(|error| with_bytecode_diagnostics(error, &verification))?;
    if runtime_match.is_none() && is_extra_file_input_bug(&verification, input.optimizer_enabled) {
        return Err(with_bytecode_diagnostics(
            JobError::new(
                ErrorKind::ExtraFileInputBug,
                "auxdata regions match but bytecode differs outside them, with optimizer enabled",
            ),
            &verification,
        ));
    }
    verification.runtime = PartMatch::from_match(runtime_match);

    // FETCH_CREATION (best-effort; failures degrade to runtime-only)
    if let Some(tx_hash) = input.creator_tx_hash.clone() {
        match input
            .chain
            .get_contract_creation_bytecode_and_receipt(&input.address, &tx_hash, None)
            .await
        {
            Ok(creation) => {
                verification.onchain_creation_bytecode = Some(creation.creation_bytecode);
                verification.deployment.creator_tx_hash = Some(tx_hash);
                verification.deployment.tx_index = Some(creation.receipt.transaction_index);
            }
            Err(error) => {
                tracing::warn!(%error, "failed to fetch creation bytecode; degrading to runtime-only verification");
            }
        }
    }

    // MATCH_CREATION
    if verification.onchain_creation_bytecode.is_some() {
        let creation_match =
            match_creation(&verification).map_err(|error| with_bytecode_diagnostics(error, &verification))?;
        verification.creation = PartMatch::from_match(creation_match);
    }

    if !verification.is_verified() {
        return Err(with_bytecode_diagnostics(
            JobError::new(ErrorKind::NoMatch, "neither runtime nor creation bytecode matched"),
            &verification,
        ));
    }

    Ok(verification)
}

/// Attaches the recompiled and on-chain bytecodes held by `verification` to
/// `error` (§7, spec testable scenario 6: ephemeral diagnostics are recorded
/// on every job failure).
fn with_bytecode_diagnostics(error: JobError, verification: &Verification) -> JobError {
    let artifacts = verification.compilation.artifacts();
    error.with_diagnostic_bytecodes(
        Some(bytes::Bytes::copy_from_slice(&artifacts.creation_bytecode)),
        Some(bytes::Bytes::copy_from_slice(&artifacts.runtime_bytecode)),
        verification
            .onchain_creation_bytecode
            .as_ref()
            .map(|b| bytes::Bytes::copy_from_slice(b)),
        Some(bytes::Bytes::copy_from_slice(&verification.onchain_runtime_bytecode)),
    )
}

fn check_early_length_rule(compilation: &Compilation, onchain_runtime: &[u8]) -> Result<(), JobError> {
    let recompiled_len = compilation.artifacts().runtime_bytecode.len();
    let is_vyper = matches!(compilation, Compilation::Vyper(_));
    let length_ok = if is_vyper {
        recompiled_len <= onchain_runtime.len()
    } else {
        recompiled_len == onchain_runtime.len()
    };
    if !length_ok {
        return Err(JobError::new(
            ErrorKind::BytecodeLengthMismatch,
            format!(
                "recompiled runtime bytecode length {recompiled_len} incompatible with on-chain length {}",
                onchain_runtime.len()
            ),
        ));
    }
    Ok(())
}

fn match_runtime(verification: &Verification) -> Result<Option<verification_common::Match>, JobError> {
    verify_runtime_code(
        &verification.onchain_runtime_bytecode,
        verification.compilation.artifacts().runtime_bytecode.clone(),
        &verification.compilation.artifacts().runtime_code_artifacts,
    )
    .map_err(|error| JobError::new(ErrorKind::CompilerError, error.to_string()))
}

fn match_creation(verification: &Verification) -> Result<Option<verification_common::Match>, JobError> {
    let onchain_creation = verification
        .onchain_creation_bytecode
        .as_ref()
        .expect("checked by caller");
    verify_creation_code(
        onchain_creation,
        verification.compilation.artifacts().creation_bytecode.clone(),
        &verification.compilation.artifacts().creation_code_artifacts,
        &verification.compilation.artifacts().compilation_artifacts,
    )
    .map_err(|error| JobError::new(ErrorKind::CompilerError, error.to_string()))
}

/// Solidity #14250: with the optimizer enabled, a compiler bug can leave
/// bytecode outside the CBOR auxdata regions non-reproducible even though
/// the auxdata itself matches byte-for-byte — surfaced as a distinct error
/// rather than a silent `no_match`.
fn is_extra_file_input_bug(verification: &Verification, optimizer_enabled: bool) -> bool {
    if !optimizer_enabled || !matches!(verification.compilation, Compilation::Solidity(_)) {
        return false;
    }
    let artifacts = verification.compilation.artifacts();
    let Some(auxdata) = artifacts.runtime_code_artifacts.cbor_auxdata.as_ref() else {
        return false;
    };
    if auxdata.is_empty() {
        return false;
    }
    auxdata.values().all(|region| {
        let range = region.offset as usize..region.offset as usize + region.value.len();
        verification.onchain_runtime_bytecode.get(range.clone()) == Some(&region.value[..])
    })
}

