//! Sink implementations

mod file;
mod log;

pub use self::file::LogFileSink;
pub use self::log::LogSink;
