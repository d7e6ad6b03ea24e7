//! The `Store` capability (§6.2, §6.4): persistence is treated as an
//! interface, not a schema this crate owns. Any backend satisfying this
//! contract (relational, file-based, in-memory for tests) is acceptable.
//! All writes belonging to one verification are required to be atomic —
//! enforced by the implementation, not by this trait.

use crate::{
    errors::JobError,
    types::{VerificationExport, VerificationJob},
};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedContractRecord {
    pub chain_id: u64,
    pub address: String,
    pub runtime_match_perfect: bool,
    pub creation_match_perfect: bool,
}

/// The core's only view of persistence. Implementations are free to shard
/// this across `code`/`contracts`/`compiled_contracts`/... tables as §6.4
/// describes; this crate only needs the operations, not the schema.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_verified_contract_by_chain_and_address(
        &self,
        chain_id: u64,
        address: &str,
    ) -> Result<Option<VerifiedContractRecord>, StoreError>;

    /// Persists a successful verification's full snapshot. Must be atomic:
    /// a failure midway leaves the store in the state observed before the
    /// call (§5 Transactions, §8 property 6).
    async fn insert_verification_export(
        &self,
        export: &VerificationExport,
    ) -> Result<Uuid, StoreError>;

    async fn insert_verification_job(&self, job: &VerificationJob) -> Result<(), StoreError>;

    async fn update_verification_job(&self, job: &VerificationJob) -> Result<(), StoreError>;

    /// Diagnostic bytecodes for a failed job, recorded in the ephemeral
    /// table (§6.4 `verification_jobs_ephemeral`), purged on a TTL by the
    /// backend.
    async fn insert_verification_job_ephemeral(
        &self,
        verification_id: Uuid,
        error: &JobError,
        creator_tx_hash: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn get_verification_job_by_id(
        &self,
        verification_id: Uuid,
    ) -> Result<Option<VerificationJob>, StoreError>;

    async fn get_verification_jobs_by_chain_and_address(
        &self,
        chain_id: u64,
        address: &str,
    ) -> Result<Vec<VerificationJob>, StoreError>;

    /// True when a previously recorded job for `(chain_id, address)` is
    /// still running (`isJobCompleted=false`) — the scheduler's dedup check
    /// (§4.4).
    async fn has_running_job(&self, chain_id: u64, address: &str) -> Result<bool, StoreError> {
        let jobs = self
            .get_verification_jobs_by_chain_and_address(chain_id, address)
            .await?;
        Ok(jobs.iter().any(|j| !j.is_completed()))
    }
}
