use std::fmt;

pub const KEY_LEN: usize = 16;

/// A generated primary-key value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self { Key(bytes) }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] { &self.0 }

    /// The leading eight bytes, which carry the timestamp for time-ordered keys.
    pub fn ordering_prefix(&self) -> [u8; 8] {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&self.0[..8]);
        prefix
    }

    /// Uppercase hex, two characters per byte.
    pub fn to_hex(&self) -> String {
        use fmt::Write;
        self.0.iter().fold(String::with_capacity(KEY_LEN * 2), |mut out, byte| {
            let _ = write!(out, "{byte:02X}");
            out
        })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.to_hex()) }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Key({})", self.to_hex()) }
}
