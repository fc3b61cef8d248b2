use crate::error::{ConvertError, Result};
use once_cell::sync::Lazy;

pub const SHOPWARE54: &str = "shopware54";
pub const SHOPWARE55: &str = "shopware55";
pub const SHOPWARE56: &str = "shopware56";
pub const SHOPWARE57: &str = "shopware57";
pub const SHOPWARE6_MAJOR: &str = "shopware6major";

/// Profiles whose converters share the legacy (Shopware 5) source schema.
pub const LEGACY_PROFILES: &[&str] = &[SHOPWARE54, SHOPWARE55, SHOPWARE56, SHOPWARE57];

pub const CURRENT_PROFILES: &[&str] = &[SHOPWARE6_MAJOR];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFamily {
    /// Serialized blobs, attribute columns, numeric ids.
    Legacy,
    /// Same schema as the destination; ids are carried over.
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    pub family: SourceFamily,
    pub source_system: &'static str,
    pub version: &'static str,
}

static PROFILES: Lazy<Vec<Profile>> = Lazy::new(|| {
    vec![
        Profile {
            name: SHOPWARE54,
            family: SourceFamily::Legacy,
            source_system: "shopware",
            version: "5.4",
        },
        Profile {
            name: SHOPWARE55,
            family: SourceFamily::Legacy,
            source_system: "shopware",
            version: "5.5",
        },
        Profile {
            name: SHOPWARE56,
            family: SourceFamily::Legacy,
            source_system: "shopware",
            version: "5.6",
        },
        Profile {
            name: SHOPWARE57,
            family: SourceFamily::Legacy,
            source_system: "shopware",
            version: "5.7",
        },
        Profile {
            name: SHOPWARE6_MAJOR,
            family: SourceFamily::Current,
            source_system: "shopware",
            version: "6",
        },
    ]
});

pub struct ProfileRegistry;

impl ProfileRegistry {
    pub fn get_profile(name: &str) -> Result<&'static Profile> {
        PROFILES
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConvertError::ProfileNotFound(name.to_string()))
    }

    pub fn profiles() -> &'static [Profile] {
        &PROFILES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_profile_is_an_error() {
        let err = ProfileRegistry::get_profile("foo").unwrap_err();
        assert!(matches!(err, ConvertError::ProfileNotFound(name) if name == "foo"));
    }

    #[test]
    fn test_family_of_known_profiles() {
        assert_eq!(
            ProfileRegistry::get_profile(SHOPWARE55).unwrap().family,
            SourceFamily::Legacy
        );
        assert_eq!(
            ProfileRegistry::get_profile(SHOPWARE6_MAJOR).unwrap().family,
            SourceFamily::Current
        );
        assert_eq!(ProfileRegistry::profiles().len(), 5);
    }
}
