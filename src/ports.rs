pub mod push;
pub mod store;
pub mod time;

pub use push::PushSender;
pub use store::BlobStore;
pub use time::TimeProvider;
