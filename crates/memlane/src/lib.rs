//! memlane: a personal memory store you can search and question.
//!
//! The `memlane` binary is built on [`cli`]. Library users reach the store
//! through [`memory`], the assistant through [`core`] and the layered config
//! through [`config`].

pub use memlane_config as config;
pub use memlane_core as core;
pub use memlane_memory as memory;

pub mod cli;

/// Route `log` output to stderr, filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs a logger.
/// Without the `logging` feature nothing is installed.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    if let Err(err) = env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .try_init()
    {
        log::debug!("logger already installed ({err})");
    }
}

#[cfg(test)]
mod tests {
    /// Repeated initialization leaves the first logger in place.
    #[test]
    fn init_logging_is_idempotent() {
        super::init_logging();
        super::init_logging();
        log::info!("logging initialized twice");
    }
}
