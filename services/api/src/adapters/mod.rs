pub mod clock;
pub mod db;
pub mod memory;

pub use clock::SystemClock;
pub use db::DbAdapter;
pub use memory::{MemoryAuth, MemoryCurriculum, MemoryScheduleStore};
