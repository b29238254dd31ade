use carelink_canonical::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

macro_rules! newtype {
    ($name:ident, $doc:expr, $pattern:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new instance without validation; callers are responsible for conformity.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Parses a validated identifier from a string.
            pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
                static PATTERN: LazyLock<Regex> =
                    LazyLock::new(|| Regex::new($pattern).expect("invalid regex"));
                let s = value.into();
                if !PATTERN.is_match(&s) {
                    return Err(ValidationError::PatternMismatch {
                        field: stringify!($name),
                        value: s,
                    });
                }
                Ok(Self(s))
            }

            /// String view.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype!(
    UserId,
    "Platform user identifier (family, caregiver, or the platform treasury).",
    r"^[A-Za-z0-9][A-Za-z0-9_.:@-]{0,127}$"
);
newtype!(
    AccountId,
    "Payable account/address resolved for a user by the wallet directory.",
    r"^[A-Za-z0-9][A-Za-z0-9_.:@-]{0,127}$"
);
newtype!(
    ContractId,
    "Contract identifier (UUID v4 when generated here).",
    r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$"
);
newtype!(
    EntryId,
    "Ledger entry identifier (UUID v4).",
    r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$"
);
newtype!(
    AnchorRef,
    "Reference returned by the anchoring service (for example a transaction id).",
    r"^\S{1,256}$"
);

impl ContractId {
    /// Fresh random contract id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl EntryId {
    /// Fresh random entry id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
