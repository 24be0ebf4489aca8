mod cache;
mod params;
mod queue;
mod shutdown;

pub use cache::MemCache;
pub use params::Params;
pub use queue::{BroadcastQueue, Queue};
pub use shutdown::Shutdown;
