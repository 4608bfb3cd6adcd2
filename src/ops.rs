pub mod into_stream;
pub mod merge;
#[cfg(feature = "timer")]
pub mod timeout;
