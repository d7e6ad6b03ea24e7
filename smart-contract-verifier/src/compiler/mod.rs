pub mod fetcher;
pub mod pool;
pub mod version;

pub use fetcher::{FetchError, ListFetcher, VersionSource};
pub use pool::{EvmCompiler, EvmCompilersPool};
pub use version::DetailedVersion;

lazy_static::lazy_static! {
    pub static ref DEFAULT_SOLIDITY_COMPILER_LIST: url::Url =
        "https://binaries.soliditylang.org/list.json".try_into().expect("valid url");
    pub static ref DEFAULT_VYPER_COMPILER_LIST: url::Url =
        "https://raw.githubusercontent.com/vyperlang/vyper/master/compiler_list.json"
            .try_into()
            .expect("valid url");
}
