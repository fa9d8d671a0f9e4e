use crate::core::{Result, StoreError};
use std::fmt;

/// On-disk format version tag: two lowercase ASCII letters, ordered
/// lexicographically ("ka" < "la" < "mc").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion([u8; 2]);

impl FormatVersion {
    /// The version this build writes by default.
    pub const CURRENT: FormatVersion = FormatVersion(*b"mc");

    /// First version whose components carry a magic header and a
    /// checksummed trailer. Everything older uses the bare legacy layout.
    pub const FIRST_CHECKSUMMED: FormatVersion = FormatVersion(*b"mc");

    pub fn parse(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(|b| b.is_ascii_lowercase()) {
            return Err(StoreError::UnknownVersion(s.to_string()));
        }
        Ok(Self([bytes[0], bytes[1]]))
    }

    pub fn from_tag_bytes(bytes: [u8; 2]) -> Result<Self> {
        if !bytes.iter().all(|b| b.is_ascii_lowercase()) {
            return Err(StoreError::UnknownVersion(format!(
                "0x{:02x}{:02x}",
                bytes[0], bytes[1]
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("??")
    }

    pub fn tag_bytes(&self) -> [u8; 2] {
        self.0
    }

    pub fn has_checksummed_layout(&self) -> bool {
        *self >= Self::FIRST_CHECKSUMMED
    }

    pub fn is_stale(&self, current: FormatVersion) -> bool {
        *self < current
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let v = FormatVersion::parse("ka").unwrap();
        assert_eq!(v.to_string(), "ka");
        assert_eq!(v.tag_bytes(), *b"ka");
    }

    #[test]
    fn test_parse_rejects_bad_tags() {
        assert!(FormatVersion::parse("").is_err());
        assert!(FormatVersion::parse("k").is_err());
        assert!(FormatVersion::parse("kab").is_err());
        assert!(FormatVersion::parse("KA").is_err());
        assert!(FormatVersion::parse("k1").is_err());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let ka = FormatVersion::parse("ka").unwrap();
        let la = FormatVersion::parse("la").unwrap();
        let mc = FormatVersion::parse("mc").unwrap();
        assert!(ka < la);
        assert!(la < mc);
        assert_eq!(mc, FormatVersion::CURRENT);
    }

    #[test]
    fn test_staleness_against_injected_current() {
        let ka = FormatVersion::parse("ka").unwrap();
        let la = FormatVersion::parse("la").unwrap();
        assert!(ka.is_stale(la));
        assert!(!la.is_stale(la));
        assert!(!la.is_stale(ka));
    }

    #[test]
    fn test_layout_boundary() {
        assert!(!FormatVersion::parse("ka").unwrap().has_checksummed_layout());
        assert!(!FormatVersion::parse("la").unwrap().has_checksummed_layout());
        assert!(FormatVersion::parse("mc").unwrap().has_checksummed_layout());
        assert!(FormatVersion::parse("md").unwrap().has_checksummed_layout());
    }
}
