use std::fmt;

/// Owned byte string with an explicit length.
///
/// BGEN strings are not NUL-terminated, may be empty, and carry no encoding
/// guarantee, so equality is byte-identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BgenString(Vec<u8>);

impl BgenString {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BgenString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for BgenString {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for BgenString {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl PartialEq<&str> for BgenString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}
