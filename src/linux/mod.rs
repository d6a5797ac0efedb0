//! Linux host support.

mod libc;
pub mod tap;

pub use self::tap::Tap;
