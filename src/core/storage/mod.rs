//! Stack-native frame buffers.
//!
//! Frames crossing the bridge live in chains of fixed size segments taken
//! from a `Pool`. A `PacketBuf` has exactly one owner and gives its segments
//! back to the pool when dropped, so moving one across a boundary is the
//! ownership transfer and dropping it is the free.

pub mod chain;
pub mod pool;

pub use self::chain::{
    PacketBuf,
    Segment,
};
pub use self::pool::{
    Pool,
    PoolStats,
};
