use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use derive_more::{From, Into};

use crate::error::{OptError, OptResult};

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident, $invalid:path) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, From, Into)]
        pub struct $name(u64);

        impl FromStr for $name {
            type Err = OptError;

            /// Parses the 16 hex digit form. Zero is never a valid id.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let invalid = || $invalid(s.to_string());
                if s.len() != 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(invalid());
                }
                match u64::from_str_radix(s, 16) {
                    Ok(0) | Err(_) => Err(invalid()),
                    Ok(id) => Ok(Self(id)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:016x}", self.0)
            }
        }
    };
}

platform_id!(
    /// Identifier of a bucket, rendered as 16 lowercase hex digits.
    BucketId,
    OptError::InvalidBucketId
);
platform_id!(
    /// Identifier of the organization a query runs for.
    OrgId,
    OptError::InvalidOrgId
);

/// Resolves bucket names within an organization.
pub trait BucketLookup: fmt::Debug + Send + Sync {
    fn lookup(&self, org_id: OrgId, name: &str) -> Option<BucketId>;
}

/// A fixed name to id table.
#[derive(Clone, Debug, Default)]
pub struct StaticBucketLookup {
    buckets: HashMap<(OrgId, String), BucketId>,
}

impl StaticBucketLookup {
    pub fn with_bucket(mut self, org_id: OrgId, name: impl Into<String>, id: BucketId) -> Self {
        self.buckets.insert((org_id, name.into()), id);
        self
    }
}

impl BucketLookup for StaticBucketLookup {
    fn lookup(&self, org_id: OrgId, name: &str) -> Option<BucketId> {
        self.buckets.get(&(org_id, name.to_string())).copied()
    }
}

/// Resolves the bucket a `from` reads, preferring an explicit id over a name.
pub fn resolve_bucket_id(
    lookup: &dyn BucketLookup,
    org_id: Option<OrgId>,
    name: Option<&str>,
    id: Option<&str>,
) -> OptResult<BucketId> {
    match (id, name) {
        (Some(id), _) => id.parse(),
        (None, Some(name)) => {
            let org_id = org_id.ok_or_else(|| OptError::MissingOrganization(name.to_string()))?;
            lookup
                .lookup(org_id, name)
                .ok_or_else(|| OptError::BucketNotFound(name.to_string()))
        }
        (None, None) => Err(OptError::MissingBucket),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORG: OrgId = OrgId(0x0a);

    fn lookup() -> StaticBucketLookup {
        StaticBucketLookup::default().with_bucket(ORG, "telegraf", BucketId(0xbeef))
    }

    #[test]
    fn test_parse_id() {
        let id: BucketId = "000000000000beef".parse().unwrap();
        assert_eq!(BucketId(0xbeef), id);
        assert_eq!("000000000000beef", id.to_string());

        for bad in ["beef", "0000000000000000", "000000000000beeg", "+00000000000beef"] {
            assert!(
                matches!(bad.parse::<BucketId>(), Err(OptError::InvalidBucketId(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_resolve_prefers_id() {
        let id = resolve_bucket_id(
            &lookup(),
            Some(ORG),
            Some("telegraf"),
            Some("00000000000000aa"),
        )
        .unwrap();
        assert_eq!(BucketId(0xaa), id);
    }

    #[test]
    fn test_resolve_by_name() {
        assert_eq!(
            BucketId(0xbeef),
            resolve_bucket_id(&lookup(), Some(ORG), Some("telegraf"), None).unwrap()
        );
        assert!(matches!(
            resolve_bucket_id(&lookup(), Some(ORG), Some("missing"), None),
            Err(OptError::BucketNotFound(name)) if name == "missing"
        ));
        assert!(matches!(
            resolve_bucket_id(&lookup(), Some(OrgId(0x0b)), Some("telegraf"), None),
            Err(OptError::BucketNotFound(_))
        ));
        assert!(matches!(
            resolve_bucket_id(&lookup(), None, Some("telegraf"), None),
            Err(OptError::MissingOrganization(_))
        ));
    }

    #[test]
    fn test_resolve_requires_a_reference() {
        assert!(matches!(
            resolve_bucket_id(&lookup(), Some(ORG), None, None),
            Err(OptError::MissingBucket)
        ));
        assert!(matches!(
            resolve_bucket_id(&lookup(), Some(ORG), None, Some("nope")),
            Err(OptError::InvalidBucketId(_))
        ));
    }
}
