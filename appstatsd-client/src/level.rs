use std::fmt;

/// Severity tag attached to log lines.
///
/// The level is carried on the wire as its numeric value and is never used to filter messages on the client side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Critical conditions.
    Critical = 1,

    /// Error conditions.
    Error = 2,

    /// Warning conditions.
    Warning = 3,

    /// Normal but significant conditions.
    Notice = 4,

    /// Informational messages.
    Info = 5,

    /// Debug-level messages.
    Debug = 6,
}

impl LogLevel {
    /// Returns the numeric value of the level as written on the wire.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            1 => Ok(LogLevel::Critical),
            2 => Ok(LogLevel::Error),
            3 => Ok(LogLevel::Warning),
            4 => Ok(LogLevel::Notice),
            5 => Ok(LogLevel::Info),
            6 => Ok(LogLevel::Debug),
            other => Err(other),
        }
    }
}
