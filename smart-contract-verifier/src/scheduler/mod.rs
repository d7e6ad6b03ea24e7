//! Worker pool (§4.4): accepts verification requests asynchronously,
//! deduplicates by `(chainId, address)` against the Store, runs each
//! request's orchestration on a bounded pool of tasks, and records the
//! outcome (match or typed error) with diagnostic bytecodes on failure.

use crate::{
    errors::{ErrorKind, JobError},
    orchestrator::{self, OrchestratorInput},
    store::Store,
    types::{JobOutcome, VerificationExport, VerificationJob},
};
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Per-worker concurrency cap (§4.4 default 5): how many compilations may
/// share one worker's compiler process concurrently.
pub const DEFAULT_CONCURRENT_VERIFICATIONS_PER_WORKER: usize = 5;

/// Default idle timeout waiting to acquire a compiler (§4.4).
pub const DEFAULT_WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Scheduler {
    store: Arc<dyn Store>,
    concurrency: Arc<Semaphore>,
    idle_timeout: Duration,
    endpoint: String,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>, concurrency: usize, idle_timeout: Duration, endpoint: impl Into<String>) -> Self {
        Self {
            store,
            concurrency: Arc::new(Semaphore::new(concurrency)),
            idle_timeout,
            endpoint: endpoint.into(),
        }
    }

    /// Dedup check (§4.4): reject before accepting if the contract is
    /// already fully verified, or a job for the same address is running.
    pub async fn check_dedup(&self, chain_id: u64, address: &str) -> Result<(), JobError> {
        if let Some(record) = self
            .store
            .get_verified_contract_by_chain_and_address(chain_id, address)
            .await
            .map_err(|e| JobError::new(ErrorKind::CantFetchBytecode, e.to_string()))?
        {
            if record.runtime_match_perfect && record.creation_match_perfect {
                return Err(JobError::new(ErrorKind::AlreadyVerified, "contract already fully verified"));
            }
        }
        if self
            .store
            .has_running_job(chain_id, address)
            .await
            .map_err(|e| JobError::new(ErrorKind::CantFetchBytecode, e.to_string()))?
        {
            return Err(JobError::new(
                ErrorKind::DuplicateVerificationRequest,
                "a verification job for this contract is already running",
            ));
        }
        Ok(())
    }

    /// Accepts a request, runs it on the bounded pool, and persists the
    /// outcome. Returns the `verificationId` immediately after job-row
    /// insertion; the caller does not await completion (§6.1's async job
    /// model) — in this crate, the future is spawned by the caller.
    #[tracing::instrument(skip(self, build_input), fields(%chain_id, %address))]
    pub async fn submit<F>(
        &self,
        chain_id: u64,
        address: String,
        cancellation: CancellationToken,
        build_input: F,
    ) -> Result<Uuid, JobError>
    where
        F: FnOnce() -> OrchestratorInput + Send + 'static,
    {
        self.check_dedup(chain_id, &address).await?;

        let mut job = VerificationJob::new(chain_id, address.clone(), self.endpoint.clone());
        let verification_id = job.verification_id;
        self.store
            .insert_verification_job(&job)
            .await
            .map_err(|e| JobError::new(ErrorKind::CantFetchBytecode, e.to_string()))?;

        let store = self.store.clone();
        let concurrency = self.concurrency.clone();
        let idle_timeout = self.idle_timeout;

        tokio::spawn(async move {
            let permit = tokio::select! {
                permit = concurrency.acquire_owned() => permit.expect("semaphore is never closed"),
                _ = tokio::time::sleep(idle_timeout) => {
                    tracing::warn!("timed out waiting for a free compiler slot");
                    return;
                }
                _ = cancellation.cancelled() => return,
            };

            let started = Utc::now();
            let outcome = tokio::select! {
                result = run_once(build_input()) => result,
                _ = cancellation.cancelled() => {
                    // No partial state is persisted on cancel (§4.4).
                    return;
                }
            };
            drop(permit);

            let compilation_time = Utc::now() - started;
            match outcome {
                Ok(export) => {
                    if let Ok(verified_contract_id) = store.insert_verification_export(&export).await {
                        job.complete(JobOutcome::VerifiedContractId(verified_contract_id), compilation_time);
                    }
                }
                Err(error) => {
                    let _ = store
                        .insert_verification_job_ephemeral(verification_id, &error, None)
                        .await;
                    job.complete(JobOutcome::Error(error), compilation_time);
                }
            }
            let _ = store.update_verification_job(&job).await;
        });

        Ok(verification_id)
    }
}

async fn run_once(input: OrchestratorInput) -> Result<VerificationExport, JobError> {
    let verification = orchestrator::run(input).await?;
    Ok(VerificationExport::from_verification(&verification))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreError, VerifiedContractRecord};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeStore {
        verified: StdMutex<Option<VerifiedContractRecord>>,
        jobs: StdMutex<Vec<VerificationJob>>,
    }

    #[async_trait::async_trait]
    impl Store for FakeStore {
        async fn get_verified_contract_by_chain_and_address(
            &self,
            _chain_id: u64,
            _address: &str,
        ) -> Result<Option<VerifiedContractRecord>, StoreError> {
            Ok(self.verified.lock().unwrap().clone())
        }

        async fn insert_verification_export(
            &self,
            _export: &VerificationExport,
        ) -> Result<Uuid, StoreError> {
            Ok(Uuid::new_v4())
        }

        async fn insert_verification_job(&self, job: &VerificationJob) -> Result<(), StoreError> {
            self.jobs.lock().unwrap().push(job.clone());
            Ok(())
        }

        async fn update_verification_job(&self, _job: &VerificationJob) -> Result<(), StoreError> {
            Ok(())
        }

        async fn insert_verification_job_ephemeral(
            &self,
            _verification_id: Uuid,
            _error: &JobError,
            _creator_tx_hash: Option<&str>,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get_verification_job_by_id(
            &self,
            _verification_id: Uuid,
        ) -> Result<Option<VerificationJob>, StoreError> {
            Ok(None)
        }

        async fn get_verification_jobs_by_chain_and_address(
            &self,
            _chain_id: u64,
            _address: &str,
        ) -> Result<Vec<VerificationJob>, StoreError> {
            Ok(self.jobs.lock().unwrap().clone())
        }
    }

    fn scheduler(store: FakeStore) -> Scheduler {
        Scheduler::new(Arc::new(store), 2, Duration::from_secs(1), "test-endpoint")
    }

    #[tokio::test]
    async fn dedup_passes_when_contract_unverified_and_no_running_job() {
        let scheduler = scheduler(FakeStore::default());
        assert!(scheduler.check_dedup(1, "0xabc").await.is_ok());
    }

    #[tokio::test]
    async fn dedup_rejects_already_fully_verified_contract() {
        let store = FakeStore {
            verified: StdMutex::new(Some(VerifiedContractRecord {
                chain_id: 1,
                address: "0xabc".to_string(),
                runtime_match_perfect: true,
                creation_match_perfect: true,
            })),
            jobs: StdMutex::new(vec![]),
        };
        let scheduler = scheduler(store);
        let error = scheduler.check_dedup(1, "0xabc").await.unwrap_err();
        assert_eq!(error.custom_code, ErrorKind::AlreadyVerified);
    }

    #[tokio::test]
    async fn dedup_rejects_concurrent_job_for_same_contract() {
        let store = FakeStore::default();
        let running_job = VerificationJob::new(1, "0xabc".to_string(), "test-endpoint");
        store.jobs.lock().unwrap().push(running_job);
        let scheduler = scheduler(store);
        let error = scheduler.check_dedup(1, "0xabc").await.unwrap_err();
        assert_eq!(error.custom_code, ErrorKind::DuplicateVerificationRequest);
    }

    #[tokio::test]
    async fn dedup_allows_request_once_prior_job_completed() {
        let store = FakeStore::default();
        let mut job = VerificationJob::new(1, "0xabc".to_string(), "test-endpoint");
        job.complete(
            JobOutcome::Error(JobError::new(ErrorKind::NoMatch, "no match")),
            chrono::Duration::milliseconds(10),
        );
        store.jobs.lock().unwrap().push(job);
        let scheduler = scheduler(store);
        assert!(scheduler.check_dedup(1, "0xabc").await.is_ok());
    }
}
