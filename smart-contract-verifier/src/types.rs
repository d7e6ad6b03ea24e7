//! Request/response shapes and the mutable per-request working state the
//! orchestrator threads through its state machine.

use crate::{
    compilation::{Compilation, FullyQualifiedName},
    errors::JobError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use verification_common::{Match, MatchTransformation, MatchValues};

/// What the caller supplied: a standard-JSON input for a language/version,
/// or metadata + raw sources to be assembled into one (the `/verify/metadata`
/// entry point).
pub enum VerificationRequest {
    StdJsonInput {
        language: Language,
        compiler_version: String,
        target: FullyQualifiedName,
        std_json_input: serde_json::Value,
    },
    Metadata {
        metadata: serde_json::Value,
        sources: std::collections::BTreeMap<String, String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Solidity,
    Yul,
    Vyper,
}

/// One of the two bytecode kinds a `Verification` tracks independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BytecodePart {
    Runtime,
    Creation,
}

/// Internal match classification. Exposed to callers as `exact_match` /
/// `match` / `null` (see the HTTP surface, out of scope here).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLevel {
    Perfect,
    Partial,
}

impl From<&Match> for MatchLevel {
    fn from(m: &Match) -> Self {
        if m.metadata_match {
            MatchLevel::Perfect
        } else {
            MatchLevel::Partial
        }
    }
}

/// One side (runtime or creation) of a verification's match outcome.
#[derive(Clone, Debug, Default)]
pub struct PartMatch {
    pub level: Option<MatchLevel>,
    pub transformations: Vec<MatchTransformation>,
    pub values: MatchValues,
}

impl PartMatch {
    pub fn from_match(m: Option<Match>) -> Self {
        match m {
            None => Self::default(),
            Some(m) => Self {
                level: Some(MatchLevel::from(&m)),
                transformations: m.transformations,
                values: m.values,
            },
        }
    }

    pub fn is_match(&self) -> bool {
        self.level.is_some()
    }
}

/// Deployment facts discovered from the creation transaction/receipt, when
/// available.
#[derive(Clone, Debug, Default)]
pub struct DeploymentInfo {
    pub block_number: Option<u64>,
    pub tx_index: Option<u64>,
    pub deployer: Option<String>,
    pub creator_tx_hash: Option<String>,
}

/// Mutable working state of one verification request, per §3.
pub struct Verification {
    pub chain_id: u64,
    pub address: String,
    pub compilation: Compilation,
    pub onchain_runtime_bytecode: Vec<u8>,
    pub onchain_creation_bytecode: Option<Vec<u8>>,
    pub runtime: PartMatch,
    pub creation: PartMatch,
    pub deployment: DeploymentInfo,
}

impl Verification {
    pub fn new(
        chain_id: u64,
        address: String,
        compilation: Compilation,
        onchain_runtime_bytecode: Vec<u8>,
    ) -> Self {
        Self {
            chain_id,
            address,
            compilation,
            onchain_runtime_bytecode,
            onchain_creation_bytecode: None,
            runtime: PartMatch::default(),
            creation: PartMatch::default(),
            deployment: DeploymentInfo::default(),
        }
    }

    /// §4.3 `DONE` precondition: at least one side matched.
    pub fn is_verified(&self) -> bool {
        self.runtime.is_match() || self.creation.is_match()
    }
}

/// Immutable snapshot hand off to the Store on a successful verification
/// (§4.3 "Outputs", §6.2).
#[derive(Clone, Debug)]
pub struct VerificationExport {
    pub chain_id: u64,
    pub address: String,
    pub compiler_version: String,
    pub fully_qualified_name: FullyQualifiedName,
    pub creation_bytecode: Vec<u8>,
    pub runtime_bytecode: Vec<u8>,
    pub runtime_match: Option<MatchLevel>,
    pub runtime_transformations: Vec<MatchTransformation>,
    pub runtime_values: MatchValues,
    pub creation_match: Option<MatchLevel>,
    pub creation_transformations: Vec<MatchTransformation>,
    pub creation_values: MatchValues,
    pub deployment: DeploymentInfo,
}

impl VerificationExport {
    pub fn from_verification(verification: &Verification) -> Self {
        Self {
            chain_id: verification.chain_id,
            address: verification.address.clone(),
            compiler_version: verification.compilation.compiler_version().to_string(),
            fully_qualified_name: verification.compilation.target().clone(),
            creation_bytecode: verification.compilation.artifacts().creation_bytecode.clone(),
            runtime_bytecode: verification.compilation.artifacts().runtime_bytecode.clone(),
            runtime_match: verification.runtime.level,
            runtime_transformations: verification.runtime.transformations.clone(),
            runtime_values: verification.runtime.values.clone(),
            creation_match: verification.creation.level,
            creation_transformations: verification.creation.transformations.clone(),
            creation_values: verification.creation.values.clone(),
            deployment: verification.deployment.clone(),
        }
    }
}

/// Persisted envelope around one `Verification` (§3, §6.1 `VerificationJob`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationJob {
    pub verification_id: Uuid,
    pub chain_id: u64,
    pub address: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock compilation time in milliseconds.
    pub compilation_time_ms: Option<i64>,
    pub endpoint: String,
    pub hardware: Option<String>,
    pub outcome: Option<JobOutcome>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JobOutcome {
    VerifiedContractId(Uuid),
    Error(JobError),
}

impl VerificationJob {
    pub fn new(chain_id: u64, address: String, endpoint: impl Into<String>) -> Self {
        Self {
            verification_id: Uuid::new_v4(),
            chain_id,
            address,
            started_at: Utc::now(),
            completed_at: None,
            compilation_time_ms: None,
            endpoint: endpoint.into(),
            hardware: None,
            outcome: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn complete(&mut self, outcome: JobOutcome, compilation_time: chrono::Duration) {
        self.completed_at = Some(Utc::now());
        self.compilation_time_ms = Some(compilation_time.num_milliseconds());
        self.outcome = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verification_common::Match;

    #[test]
    fn verification_is_verified_requires_at_least_one_match() {
        let mut verification = Verification::new(1, "0xabc".to_string(), test_compilation(), vec![0xfe]);
        assert!(!verification.is_verified());

        verification.runtime = PartMatch::from_match(Some(Match {
            metadata_match: true,
            transformations: vec![],
            values: Default::default(),
        }));
        assert!(verification.is_verified());
    }

    #[test]
    fn match_level_reflects_metadata_match() {
        let perfect = Match {
            metadata_match: true,
            transformations: vec![],
            values: Default::default(),
        };
        let partial = Match {
            metadata_match: false,
            transformations: vec![],
            values: Default::default(),
        };
        assert_eq!(MatchLevel::from(&perfect), MatchLevel::Perfect);
        assert_eq!(MatchLevel::from(&partial), MatchLevel::Partial);
    }

    #[test]
    fn job_complete_stores_milliseconds() {
        let mut job = VerificationJob::new(1, "0xabc".to_string(), "test-endpoint");
        job.complete(
            JobOutcome::VerifiedContractId(Uuid::new_v4()),
            chrono::Duration::milliseconds(1500),
        );
        assert!(job.is_completed());
        assert_eq!(job.compilation_time_ms, Some(1500));
    }

    fn test_compilation() -> Compilation {
        Compilation::PreRun(crate::compilation::prerun::PreRunCompilation::new(
            FullyQualifiedName::from_file_and_contract_names("a.sol", "A"),
            "v0.8.20+commit.a1b79de6".to_string(),
            Default::default(),
            cbor_auxdata::AuxdataStyle::SolidityStandard,
        ))
    }
}
