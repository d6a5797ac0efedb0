//! Bridge coordination between an upstream wireless client interface and a
//! downstream wired-looking interface presented to a directly attached host.

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
extern crate byteorder;
#[macro_use]
extern crate lazy_static;
extern crate libc;
#[macro_use]
extern crate log;

pub mod core;

#[cfg(target_os = "linux")]
pub mod linux;

#[derive(Debug)]
pub enum Error {
    /// Indicates an interface that is not yet structurally attached.
    NotReady,
    /// Indicates the address service is not in the stopped/started state the
    /// requested operation needs.
    Conflict,
    /// Indicates a stop request on an address service that is already stopped.
    AlreadyStopped,
    /// Indicates an error where a buffer pool, queue, etc. is full or empty.
    Exhausted,
    /// Indicates the downstream transport cannot currently accept a frame.
    Busy,
    /// Indicates an error where a frame is empty or too large.
    Malformed,
    /// Indicates a miscellaneous failure reported by the network stack.
    Unknown(&'static str),
    /// Indicates a generic IO error.
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
