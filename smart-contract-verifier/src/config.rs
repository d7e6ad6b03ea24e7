//! The ambient knobs this crate itself reads (§6.5 lists the recognized
//! options; actually loading them from files/env is out of scope — that is
//! the caller's concern, the same way `Store`/`Chain` are the caller's
//! concern). These structs are the shapes a caller assembles and hands in.

use crate::scheduler::{DEFAULT_CONCURRENT_VERIFICATIONS_PER_WORKER, DEFAULT_WORKER_IDLE_TIMEOUT};
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug)]
pub struct CompilerFetchConfig {
    pub solc_bin_repo: Url,
    pub solc_js_repo: Option<Url>,
    pub vyper_repo: Url,
    pub cache_dir: std::path::PathBuf,
}

#[derive(Clone, Debug)]
pub struct WorkerPoolConfig {
    pub concurrent_verifications_per_worker: usize,
    pub worker_idle_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            concurrent_verifications_per_worker: DEFAULT_CONCURRENT_VERIFICATIONS_PER_WORKER,
            worker_idle_timeout: DEFAULT_WORKER_IDLE_TIMEOUT,
        }
    }
}

/// One configured chain (§6.5 `chains[*]`). RPC API keys are expected to
/// already be resolved into `rpc` URLs by the caller (the spec's
/// `*_API_KEY_*` environment convention is a configuration-loading concern).
#[derive(Clone, Debug)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub network_id: Option<u64>,
    pub rpc_urls: Vec<Url>,
    pub supported: bool,
    pub trace_supported_rpcs: Vec<Url>,
}
