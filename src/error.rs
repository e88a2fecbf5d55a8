use std::fmt;

#[derive(Debug)]
pub enum Error {
    Connect(std::io::Error),
    Send(std::io::Error),
    Receive(std::io::Error),
    ConfirmationFailed { attempts: u32 },
    InvalidFanLevel(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connect(e) => write!(f, "connect failed: {e}"),
            Error::Send(e) => write!(f, "send failed: {e}"),
            Error::Receive(e) => write!(f, "receive failed: {e}"),
            Error::ConfirmationFailed { attempts } => {
                write!(f, "unit did not confirm command after {attempts} attempts")
            }
            Error::InvalidFanLevel(level) => write!(f, "invalid fan level: {level}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connect(e) | Error::Send(e) | Error::Receive(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
