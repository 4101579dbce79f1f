use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic outcome of a vendor billing call.
///
/// Raw vendor codes changed across SDK major versions; `from_raw` is the one
/// place that knows the numeric table. Unknown codes collapse into `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Ok,
    BillingUnavailable,
    DeveloperError,
    FeatureNotSupported,
    ItemAlreadyOwned,
    ItemNotOwned,
    ServiceDisconnected,
    UserCanceled,
    ItemUnavailable,
    ServiceUnavailable,
    Error,
}

impl ResponseCode {
    pub const ALL: [ResponseCode; 11] = [
        ResponseCode::Ok,
        ResponseCode::BillingUnavailable,
        ResponseCode::DeveloperError,
        ResponseCode::FeatureNotSupported,
        ResponseCode::ItemAlreadyOwned,
        ResponseCode::ItemNotOwned,
        ResponseCode::ServiceDisconnected,
        ResponseCode::UserCanceled,
        ResponseCode::ItemUnavailable,
        ResponseCode::ServiceUnavailable,
        ResponseCode::Error,
    ];

    pub fn from_raw(code: i32) -> Self {
        match code {
            -2 => Self::FeatureNotSupported,
            -1 => Self::ServiceDisconnected,
            0 => Self::Ok,
            1 => Self::UserCanceled,
            2 => Self::ServiceUnavailable,
            3 => Self::BillingUnavailable,
            4 => Self::ItemUnavailable,
            5 => Self::DeveloperError,
            6 => Self::Error,
            7 => Self::ItemAlreadyOwned,
            8 => Self::ItemNotOwned,
            _ => Self::Error,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Self::FeatureNotSupported => -2,
            Self::ServiceDisconnected => -1,
            Self::Ok => 0,
            Self::UserCanceled => 1,
            Self::ServiceUnavailable => 2,
            Self::BillingUnavailable => 3,
            Self::ItemUnavailable => 4,
            Self::DeveloperError => 5,
            Self::Error => 6,
            Self::ItemAlreadyOwned => 7,
            Self::ItemNotOwned => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BillingUnavailable => "BILLING_UNAVAILABLE",
            Self::DeveloperError => "DEVELOPER_ERROR",
            Self::FeatureNotSupported => "FEATURE_NOT_SUPPORTED",
            Self::ItemAlreadyOwned => "ITEM_ALREADY_OWNED",
            Self::ItemNotOwned => "ITEM_NOT_OWNED",
            Self::ServiceDisconnected => "SERVICE_DISCONNECTED",
            Self::UserCanceled => "USER_CANCELED",
            Self::ItemUnavailable => "ITEM_UNAVAILABLE",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Error => "ERROR",
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw result handed back by the vendor SDK: a numeric code plus a debug message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingResult {
    pub response_code: i32,
    pub debug_message: String,
}

impl BillingResult {
    pub fn new(response_code: i32, debug_message: impl Into<String>) -> Self {
        Self {
            response_code,
            debug_message: debug_message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(0, "")
    }

    pub fn from_code(code: ResponseCode) -> Self {
        Self::new(code.raw(), "")
    }

    pub fn code(&self) -> ResponseCode {
        ResponseCode::from_raw(self.response_code)
    }

    pub fn is_ok(&self) -> bool {
        self.code().is_ok()
    }
}
