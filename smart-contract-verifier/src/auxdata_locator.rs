//! CBOR auxdata position discovery (§4.1 "CBOR auxdata position
//! generation", §2's dedicated 8% share). Solidity >=0.8.x and Vyper both
//! resolve positions without a second compile (solc reports them directly;
//! Vyper's trailing-region scan lives in [`crate::compilation::vyper`]).
//! Older Solidity needs a second, mutated compile and a byte-diff.

use crate::{
    compilation::{
        solidity::{SolcCompiler, SolcInput},
        FullyQualifiedName,
    },
    compiler::{version::DetailedVersion, EvmCompilersPool},
    errors::CompilationError,
};
use foundry_compilers::artifacts::Source;
use std::collections::BTreeMap;
use verification_common::{CborAuxdata, CborAuxdataValue};

/// Appended to every source file's content before a second compile. Changes
/// every emitted metadata hash (and hence every CBOR auxdata byte) without
/// otherwise perturbing codegen.
const MUTATION_MARKER: &str = "\n// 0000000000000000000000000000000000000000000000000000000000000000\n";

fn mutate_input(input: &SolcInput) -> SolcInput {
    let mut mutated = input.0.clone();
    mutated.sources = mutated
        .sources
        .into_iter()
        .map(|(path, source)| {
            let mutated_content = format!("{}{}", source.content, MUTATION_MARKER);
            (path, Source::new(mutated_content))
        })
        .collect();
    SolcInput(mutated)
}

/// Recompiles `input` with every source mutated, then diffs the two
/// bytecodes to recover auxdata positions absent from direct compiler
/// output. Returns `(creation, runtime)` positions.
pub async fn locate_by_mutation_diff(
    pool: &EvmCompilersPool<SolcCompiler>,
    version: &DetailedVersion,
    input: &SolcInput,
    target: &FullyQualifiedName,
    normal_creation_bytecode: &[u8],
    normal_runtime_bytecode: &[u8],
) -> Result<(CborAuxdata, CborAuxdata), CompilationError> {
    let mutated_input = mutate_input(input);
    let output = super::compilation::compile(pool, version, mutated_input).await?;
    let mutated = output.get(target)?;

    let creation = diff_positions(normal_creation_bytecode, &mutated.creation_bytecode);
    let runtime = diff_positions(normal_runtime_bytecode, &mutated.runtime_bytecode);
    Ok((creation, runtime))
}

fn diff_positions(normal: &[u8], mutated: &[u8]) -> CborAuxdata {
    match cbor_auxdata::locate_by_mutation_diff(normal, mutated) {
        Ok(positions) => positions
            .into_iter()
            .map(|(id, position)| {
                let value = normal[position.offset..position.offset + position.length].to_vec();
                (
                    id,
                    CborAuxdataValue {
                        value,
                        offset: position.offset as u32,
                    },
                )
            })
            .collect(),
        // Failure to locate auxdata is non-fatal (§4.1): the matcher falls
        // back to exact comparison with no known auxdata regions.
        Err(_) => BTreeMap::new(),
    }
}
