use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wrap a caller-supplied identifier. Empty or whitespace-only
            /// values are rejected.
            pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(TypeError::EmptyId { kind: $kind });
                }
                Ok(Self(value))
            }

            /// Strict constructor: the value must be even-length hex.
            pub fn from_hex(value: impl Into<String>) -> Result<Self, TypeError> {
                let id = Self::new(value)?;
                if !id.is_hex() {
                    return Err(TypeError::InvalidHex(id.0));
                }
                Ok(id)
            }

            /// Whether the identifier is a valid even-length hex string.
            pub fn is_hex(&self) -> bool {
                is_hex_str(&self.0)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = TypeError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifier naming one work order. Supplied by the requester, never
    /// generated by the proxy.
    WorkOrderId,
    "work order id"
);

opaque_id!(
    /// Identifier of the worker that executes a work order.
    WorkerId,
    "worker id"
);

opaque_id!(
    /// Identifier of the party requesting a work order.
    RequesterId,
    "requester id"
);

fn is_hex_str(s: &str) -> bool {
    let s = s.strip_prefix("0x").unwrap_or(s);
    !s.is_empty() && hex::decode(s).is_ok()
}
