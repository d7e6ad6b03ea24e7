//! Runs compiler binaries as child processes, bounding how many run
//! concurrently on this host with a semaphore (the "per-worker concurrency
//! cap", default 5, from §4.4).

use crate::{
    compiler::{fetcher::VersionSource, version::DetailedVersion},
    errors::CompilationError,
};
use async_trait::async_trait;
use std::{process::Stdio, sync::Arc};
use tokio::{io::AsyncWriteExt, process::Command, sync::Semaphore};

/// Output larger than this fails with `compiler_output_too_large` (§4.1).
pub const MAX_COMPILER_OUTPUT_BYTES: usize = 250 * 1024 * 1024;

/// One compiler family's standard-JSON invocation contract. `SolcCompiler`
/// and `VyperCompiler` each implement this over their own input/output
/// shapes (`foundry_compilers::artifacts::SolcInput`/`Output`, and Vyper's
/// analogue).
#[async_trait]
pub trait EvmCompiler: Send + Sync + 'static {
    type Input: serde::Serialize + Send;
    type Output: serde::de::DeserializeOwned + Send;

    /// Argv passed to the compiler binary to make it read standard-JSON
    /// from stdin and write standard-JSON to stdout (e.g. `--standard-json`).
    fn args(&self) -> &[&str];
}

pub struct EvmCompilersPool<C: EvmCompiler> {
    fetcher: Arc<dyn VersionSource>,
    compiler: C,
    concurrency: Arc<Semaphore>,
}

impl<C: EvmCompiler> EvmCompilersPool<C> {
    pub fn new(fetcher: Arc<dyn VersionSource>, compiler: C, concurrency: Arc<Semaphore>) -> Self {
        Self {
            fetcher,
            compiler,
            concurrency,
        }
    }

    pub async fn all_versions(&self) -> Vec<DetailedVersion> {
        self.fetcher.all_versions().await
    }

    #[tracing::instrument(skip(self, input), fields(%version))]
    pub async fn compile(
        &self,
        version: &DetailedVersion,
        input: &C::Input,
    ) -> Result<C::Output, CompilationError> {
        let _permit = self
            .concurrency
            .acquire()
            .await
            .expect("semaphore is never closed");

        let binary_path = self
            .fetcher
            .fetch(version)
            .await
            .map_err(|e| CompilationError::VersionFetch(version.to_string(), e.into()))?;

        let input_json = serde_json::to_vec(input)?;

        let mut child = Command::new(binary_path)
            .args(self.compiler.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(&input_json)
            .await?;

        let output = child.wait_with_output().await?;
        if output.stdout.len() > MAX_COMPILER_OUTPUT_BYTES {
            return Err(CompilationError::OutputTooLarge);
        }

        let parsed: C::Output = serde_path_to_error::deserialize(
            &mut serde_json::Deserializer::from_slice(&output.stdout),
        )
        .map_err(|e| CompilationError::Json(e.into_inner()))?;

        Ok(parsed)
    }
}
