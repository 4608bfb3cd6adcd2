use thiserror::Error;

/// Misconfiguration detected before any stream is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
  /// The client was built without an event manager, so notifications
  /// cannot be observed.
  #[error("no event manager is installed on this client")]
  NoEventManager,
}
