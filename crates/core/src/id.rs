//! Strongly-typed identifiers used across the workspace.
//!
//! Account and organization ids are opaque strings owned by the user store
//! (the relational layer generates them), so they are not parsed as UUIDs.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Identifier of an account in one of the tiered user collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

/// Identifier of a transport organization (the organization boundary key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(String);

macro_rules! impl_string_id {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> DomainResult<Self> {
                if s.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: empty", $name)));
                }
                if s.chars().any(char::is_whitespace) {
                    return Err(DomainError::invalid_id(format!(
                        "{}: contains whitespace",
                        $name
                    )));
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<&'static str> for $t {
            fn from(value: &'static str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

impl_string_id!(AccountId, "AccountId");
impl_string_id!(OrganizationId, "OrganizationId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_empty_and_whitespace() {
        assert!(AccountId::from_str("").is_err());
        assert!(OrganizationId::from_str("org A").is_err());
        assert_eq!(
            OrganizationId::from_str("org_A").unwrap().as_str(),
            "org_A"
        );
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = AccountId::from("acc_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"acc_1\"");
    }

    #[test]
    fn parse_errors_name_the_identifier() {
        let err = AccountId::from_str(" ").unwrap_err();
        assert_eq!(err, DomainError::InvalidId("AccountId: contains whitespace".to_string()));
    }
}
