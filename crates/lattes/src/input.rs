//! Raw curriculum bytes as exported (ISO-8859-1)

use std::borrow::Cow;

/// Input source abstraction
#[derive(Clone, Debug)]
pub struct Input<'a> {
    source: &'a [u8],
    filename: Option<&'a str>,
}

impl<'a> Input<'a> {
    /// Create from bytes in the export charset
    pub const fn from_bytes(source: &'a [u8]) -> Self {
        Self {
            source,
            filename: None,
        }
    }

    /// Set filename for diagnostics
    pub const fn with_filename(mut self, filename: &'a str) -> Self {
        self.filename = Some(filename);
        self
    }

    /// Get filename if set
    pub const fn filename(&self) -> Option<&str> {
        self.filename
    }

    pub(crate) const fn len(&self) -> usize {
        self.source.len()
    }

    /// Decode ISO-8859-1 into text; never fails
    ///
    /// Every byte is the code point of the same value, so ASCII input is
    /// borrowed as is.
    pub fn decode(&self) -> Cow<'a, str> {
        match std::str::from_utf8(self.source) {
            Ok(text) if self.source.is_ascii() => Cow::Borrowed(text),
            _ => Cow::Owned(self.source.iter().copied().map(char::from).collect()),
        }
    }
}

impl<'a> From<&'a [u8]> for Input<'a> {
    fn from(b: &'a [u8]) -> Self {
        Self::from_bytes(b)
    }
}
