use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a ledger invocation.
///
/// Submit and complete report through this code instead of an error type,
/// so local precondition failures and ledger-reported failures look alike
/// to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractResponse {
    Success,
    Error,
}

impl ContractResponse {
    /// Numeric wire code: `0` for success, `1` for error.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Error => 1,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for ContractResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(ContractResponse::Success.code(), 0);
        assert_eq!(ContractResponse::Error.code(), 1);
    }

    #[test]
    fn display() {
        assert_eq!(ContractResponse::Success.to_string(), "SUCCESS");
        assert_eq!(ContractResponse::Error.to_string(), "ERROR");
        assert!(!ContractResponse::Error.is_success());
    }
}
