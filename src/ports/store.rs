use std::io;

/// Durable key-value blob storage shared across request handlers and the
/// dispatch sweep. `set` is a full overwrite with last-writer-wins semantics;
/// there is no locking or versioning.
pub trait BlobStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Lazy, restartable enumeration of every stored entry. Used only by the
    /// dispatch sweep; a corrupt entry surfaces as an `Err` item so the sweep
    /// can skip it without aborting.
    fn list(&self) -> io::Result<Box<dyn Iterator<Item = io::Result<(String, String)>> + Send>>;
}
