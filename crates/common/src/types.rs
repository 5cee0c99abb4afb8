use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Longest identifier accepted for shows, seats and owner tokens.
const MAX_ID_LEN: usize = 128;

/// Error returned when an identifier is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} is longer than {max} characters")]
    TooLong { kind: &'static str, max: usize },

    #[error("{kind} contains whitespace or control characters")]
    InvalidCharacters { kind: &'static str },

    #[error("invalid {kind}: {reason}")]
    InvalidUuid { kind: &'static str, reason: String },
}

fn validate(kind: &'static str, value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty { kind });
    }
    if value.len() > MAX_ID_LEN {
        return Err(IdError::TooLong {
            kind,
            max: MAX_ID_LEN,
        });
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(IdError::InvalidCharacters { kind });
    }
    Ok(())
}

/// Declares a validated, string-backed identifier.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parses and validates an identifier.
            pub fn parse(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                validate($kind, &value)?;
                Ok(Self(value))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
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
    };
}

string_id!(
    /// Identifier of a scheduled show (one screening of a movie).
    ShowId,
    "show id"
);

string_id!(
    /// Identifier of a seat, unique within its show (e.g. `A1`).
    SeatId,
    "seat id"
);

string_id!(
    /// Opaque token identifying the client session that owns a hold.
    OwnerToken,
    "owner token"
);

/// Unique identifier of a seat hold.
///
/// Drafts and confirmed orders share the identity of the hold they were
/// created from, so [`DraftId`] and [`OrderId`] are aliases of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldId(Uuid);

/// Identifier of an order draft. Always equal to the hold id.
pub type DraftId = HoldId;

/// Identifier of a confirmed order. Always equal to the draft id.
pub type OrderId = HoldId;

impl HoldId {
    /// Creates a new random hold ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a hold ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a hold ID from its hyphenated UUID form.
    pub fn parse(value: &str) -> Result<Self, IdError> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|e| IdError::InvalidUuid {
                kind: "hold id",
                reason: e.to_string(),
            })
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for HoldId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HoldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for HoldId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for HoldId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
