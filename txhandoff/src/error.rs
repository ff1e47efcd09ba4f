use core::fmt;

/// The result type of steady-state operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Recoverable conditions of the transmit path.
///
/// None of these are fatal. They signal that a single burst or descriptor could not make progress
/// right now and the caller is expected to drop it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// The action could not be completed because there were not enough resources.
    ///
    /// Returned by pools that have no free entry left. It would have been legal with more
    /// resources, retrying after the consumer retired some entries may succeed.
    Exhausted,

    /// The channel had no free slot for another descriptor.
    Full,

    /// A named resource could not be found, yet.
    Unbound,

    /// Not enough space for the requested packet length.
    BadSize,

    /// The operation was not permitted.
    ///
    /// Returned when a device does not implement an operation or refuses the target port.
    Illegal,
}

/// A fatal error while setting up the transmit path.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not well-formed.
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration is well-formed but violates a constraint.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A configured interface has no corresponding port.
    #[error("failed to get port id from interface {name}")]
    UnknownInterface {
        /// The offending interface name.
        name: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            Error::Exhausted => "resources exhausted",
            Error::Full => "channel full",
            Error::Unbound => "resource not bound",
            Error::BadSize => "bad size",
            Error::Illegal => "illegal operation",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {}
