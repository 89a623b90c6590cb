use std::fmt;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new<T: Into<String>>(value: T) -> Self {
                Self(value.into())
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

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Stable identifier of a user inside one account's graph.
    UserId
);
opaque_id!(
    /// Identifier of a single connection record.
    ConnectionId
);
opaque_id!(
    /// Partition key for storage and queries; one graph per account.
    AccountId
);

pub(crate) const USER_PREFIX: &str = "user";
pub(crate) const CONNECTION_PREFIX: &str = "conn";

/// Draws `<prefix>_<millis><nnn>` until `taken` reports the candidate free.
pub(crate) fn allocate<F>(prefix: &str, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut rng = rand::thread_rng();
    loop {
        let candidate = format!(
            "{prefix}_{}{:03}",
            Utc::now().timestamp_millis(),
            rng.gen_range(0..1000)
        );
        if !taken(&candidate) {
            return candidate;
        }
    }
}
