//! Status vocabulary shared with the bus daemon.
//!
//! Every command returns an `i32`: `0` for success, or the negated code of
//! one of the [`Status`] values below. The numeric codes are the daemon's
//! own status codes and must not change.

use serde::{Deserialize, Serialize};

/// Success.
pub const OK: i32 = 0;

/// Failure statuses surfaced to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[error("generic failure")]
    Fail,
    #[error("address is empty or invalid")]
    InvalidAddress,
    #[error("Wi-Fi Direct helper call failed")]
    P2p,
    #[error("Wi-Fi Direct helper call timed out")]
    P2pTimeout,
    #[error("required Wi-Fi Direct connection does not exist")]
    P2pNotConnected,
    #[error("Wi-Fi Direct is disabled")]
    P2pDisabled,
    #[error("Wi-Fi Direct resources are busy")]
    P2pBusy,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::Fail,
        Status::InvalidAddress,
        Status::P2p,
        Status::P2pTimeout,
        Status::P2pNotConnected,
        Status::P2pDisabled,
        Status::P2pBusy,
    ];

    /// Positive status code.
    pub const fn code(self) -> i32 {
        match self {
            Status::Fail => 0x1,
            Status::InvalidAddress => 0x14,
            Status::P2p => 0x90dd,
            Status::P2pTimeout => 0x90de,
            Status::P2pNotConnected => 0x90df,
            Status::P2pDisabled => 0x90e4,
            Status::P2pBusy => 0x90e5,
        }
    }

    /// The value handed back across the command boundary (always negative).
    pub const fn as_return(self) -> i32 {
        -self.code()
    }

    /// Look up a status by code. Accepts either sign.
    pub fn from_code(code: i32) -> Option<Status> {
        let code = code.checked_abs()?;
        Status::ALL.into_iter().find(|s| s.code() == code)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Status::Fail => "ER_FAIL",
            Status::InvalidAddress => "ER_INVALID_ADDRESS",
            Status::P2p => "ER_P2P",
            Status::P2pTimeout => "ER_P2P_TIMEOUT",
            Status::P2pNotConnected => "ER_P2P_NOT_CONNECTED",
            Status::P2pDisabled => "ER_P2P_DISABLED",
            Status::P2pBusy => "ER_P2P_BUSY",
        }
    }
}

/// Failure reasons reported by the OS P2P framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Internal framework error.
    Error,
    /// P2P is unsupported on this device.
    Unsupported,
    /// The framework is busy with another request.
    Busy,
    /// Service discovery was requested without any service request added.
    NoServiceRequests,
}

impl FailureReason {
    pub const fn code(self) -> i32 {
        match self {
            FailureReason::Error => 0,
            FailureReason::Unsupported => 1,
            FailureReason::Busy => 2,
            FailureReason::NoServiceRequests => 3,
        }
    }

    /// Unknown codes are treated as a generic error.
    pub fn from_code(code: i32) -> FailureReason {
        match code {
            1 => FailureReason::Unsupported,
            2 => FailureReason::Busy,
            3 => FailureReason::NoServiceRequests,
            _ => FailureReason::Error,
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Error => write!(f, "error"),
            FailureReason::Unsupported => write!(f, "p2p unsupported"),
            FailureReason::Busy => write!(f, "busy"),
            FailureReason::NoServiceRequests => write!(f, "no service requests"),
        }
    }
}

impl From<FailureReason> for Status {
    fn from(reason: FailureReason) -> Status {
        match reason {
            FailureReason::Unsupported => Status::P2pDisabled,
            FailureReason::Busy => Status::P2pBusy,
            FailureReason::Error | FailureReason::NoServiceRequests => Status::P2p,
        }
    }
}
