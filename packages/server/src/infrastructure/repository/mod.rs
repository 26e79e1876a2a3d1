//! Repository 実装
//!
//! - `inmemory`: インメモリ実装（プロセス再起動で消える）

pub mod inmemory;

pub use inmemory::InMemoryMessageStore;
