//! Typed identifier newtypes backed by strings.

use std::borrow::Borrow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_name {
    ($(#[doc = $doc:expr])* $name:ident, $normalize:path) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self($normalize(raw.into()))
            }

            /// Access the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::new(s))
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self::new(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

fn keep(raw: String) -> String {
    raw
}

fn uppercase(raw: String) -> String {
    raw.trim().to_ascii_uppercase()
}

define_name!(
    /// Key of one sensor inside a registry snapshot (e.g. `"time"`, `"AA:BB"`).
    SensorId,
    keep
);

define_name!(
    /// Stable identifier of a physical peripheral (MAC-like, stored uppercase).
    PeripheralAddress,
    uppercase
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_normalise_address_to_uppercase() {
        let address = PeripheralAddress::new(" aa:bb:cc:dd:ee:ff ");
        assert_eq!(address.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn should_compare_addresses_case_insensitively_through_normalisation() {
        assert_eq!(
            PeripheralAddress::from("c4:7c:8d:6a:12:34"),
            PeripheralAddress::from("C4:7C:8D:6A:12:34")
        );
    }

    #[test]
    fn should_keep_sensor_id_verbatim() {
        let id = SensorId::new("Location");
        assert_eq!(id.to_string(), "Location");
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let id = SensorId::new("time");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"time\"");
        let parsed: SensorId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn should_normalise_address_when_deserializing() {
        let parsed: PeripheralAddress = serde_json::from_str("\"aa:bb\"").unwrap();
        assert_eq!(parsed.as_str(), "AA:BB");
    }
}
