use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Ids handed out by the backend are opaque strings.
macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw value. Returns `None` for an empty or blank string.
            pub fn parse(s: impl Into<String>) -> Option<Self> {
                let s = s.into();
                if s.trim().is_empty() {
                    None
                } else {
                    Some(Self(s))
                }
            }

            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(SessionId);
opaque_id!(VideoId);

impl SessionId {
    /// Mint a `sess_`-prefixed uuid v7 id, shaped like the ids the backend
    /// hands out. Used by the mock backend.
    pub fn generate() -> Self {
        Self(format!("sess_{}", Uuid::now_v7()))
    }

    /// First eight characters followed by an ellipsis, for status lines.
    pub fn short(&self) -> String {
        let head: String = self.0.chars().take(8).collect();
        format!("{head}...")
    }
}
