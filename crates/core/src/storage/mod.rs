pub mod file;
pub mod lock;
pub mod memory;
pub mod store;

pub use file::FileKv;
pub use lock::{LockFile, LockGuard};
pub use memory::MemoryKv;
pub use store::Store;

/// String-keyed store of JSON documents. Each call is independent; there is no
/// transaction spanning keys.
#[async_trait::async_trait]
pub trait KvBackend: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Named lock shared by every process using the same storage. Backends
    /// private to one process return `None`.
    fn lock_file(&self, _name: &str) -> Option<LockFile> {
        None
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}
