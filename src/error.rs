//! Common error types for client operations.

/// The result of a CONNACK handshake, as reported by the broker.
///
/// A value other than [`ConnectReturnCode::Accepted`] means the broker refused
/// the connection and the session was not established.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectReturnCode {
    /// The connection was accepted.
    Accepted,
    /// The broker does not support the requested protocol level.
    UnacceptableProtocolVersion,
    /// The client identifier is not allowed by the broker.
    IdentifierRejected,
    /// The broker is unavailable.
    ServerUnavailable,
    /// The user name or password is malformed.
    BadUserNameOrPassword,
    /// The client is not authorized to connect.
    NotAuthorized,
    /// A reserved or unknown return code.
    Other(u8),
}

impl From<u8> for ConnectReturnCode {
    fn from(val: u8) -> Self {
        match val {
            0 => Self::Accepted,
            1 => Self::UnacceptableProtocolVersion,
            2 => Self::IdentifierRejected,
            3 => Self::ServerUnavailable,
            4 => Self::BadUserNameOrPassword,
            5 => Self::NotAuthorized,
            _ => Self::Other(val),
        }
    }
}

/// A common error type for client operations.
///
/// This enum defines the set of failures that can occur when driving the
/// protocol engine. It is designed to be simple and portable for `no_std`
/// environments; every failure is representable as a return value and nothing
/// in the crate aborts the process.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An operation was attempted without an established session.
    NotConnected,
    /// A connect was attempted while a session is already established.
    AlreadyConnected,
    /// An error occurred during a write operation.
    WriteError,
    /// An error occurred during a read operation.
    ReadError,
    /// An operation did not complete within its command timeout.
    Timeout,
    /// The broker refused the connection handshake.
    ConnectionRefused(ConnectReturnCode),
    /// The broker rejected a subscription request (SUBACK code 0x80).
    SubscriptionRejected,
    /// An encode destination buffer was too small for the packet.
    BufferTooSmall,
    /// A received packet violated the wire format and was dropped.
    MalformedPacket,
    /// A received string was not valid UTF-8.
    InvalidUtf8,
    /// The handler table is full and cannot accept another subscription.
    TooManySubscriptions,
    /// The transport could not be opened or re-opened.
    NotOpen,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotConnected => defmt::write!(f, "NotConnected"),
            Error::AlreadyConnected => defmt::write!(f, "AlreadyConnected"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionRefused(code) => defmt::write!(f, "ConnectionRefused({})", code),
            Error::SubscriptionRejected => defmt::write!(f, "SubscriptionRejected"),
            Error::BufferTooSmall => defmt::write!(f, "BufferTooSmall"),
            Error::MalformedPacket => defmt::write!(f, "MalformedPacket"),
            Error::InvalidUtf8 => defmt::write!(f, "InvalidUtf8"),
            Error::TooManySubscriptions => defmt::write!(f, "TooManySubscriptions"),
            Error::NotOpen => defmt::write!(f, "NotOpen"),
        }
    }
}
