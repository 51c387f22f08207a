//
// Copyright (c) The lyb Core Contributors
//
// SPDX-License-Identifier: MIT
//

/// A convenience wrapper around `Result` for `lyb::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error category, patterned after libyang's `LY_ERR` codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Invalid argument passed to an API function.
    InvalidArgument,
    /// An underlying write or read failed (including short writes).
    Io,
    /// Internal invariant violation (pathological schema or a bug).
    Internal,
    /// A variant the implementation does not support.
    Unsupported,
    /// A referenced module, node or annotation does not exist.
    NotFound,
    /// Malformed or inconsistent input data.
    InvalidData,
}

/// Enum listing possible errors from lyb.
#[derive(Debug, Eq, PartialEq)]
pub struct Error {
    pub errcode: ErrorCode,
    pub msg: Option<String>,
    pub path: Option<String>,
}

impl Error {
    pub(crate) fn new<S: Into<String>>(errcode: ErrorCode, msg: S) -> Error {
        Error {
            errcode,
            msg: Some(msg.into()),
            path: None,
        }
    }

    pub(crate) fn invalid_argument<S: Into<String>>(msg: S) -> Error {
        Error::new(ErrorCode::InvalidArgument, msg)
    }

    pub(crate) fn internal<S: Into<String>>(msg: S) -> Error {
        Error::new(ErrorCode::Internal, msg)
    }

    pub(crate) fn unsupported<S: Into<String>>(msg: S) -> Error {
        Error::new(ErrorCode::Unsupported, msg)
    }

    pub(crate) fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::new(ErrorCode::NotFound, msg)
    }

    pub(crate) fn invalid_data<S: Into<String>>(msg: S) -> Error {
        Error::new(ErrorCode::InvalidData, msg)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::new(ErrorCode::Io, err.to_string())
    }
}

impl std::fmt::Display for Error {
    // Print only the base error message by default.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(msg) = &self.msg {
            write!(f, "{}", msg)
        } else {
            write!(f, "Unknown error: {:?}", self.errcode)
        }
    }
}

impl std::error::Error for Error {}
