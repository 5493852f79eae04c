//! Size estimation in budget units
//!
//! A budget unit is the byte length of the compact JSON form divided by a
//! constant. It stands in for a token count; no tokenizer is involved.

use serde::Serialize;
use std::io;

/// Counts bytes without keeping them
#[derive(Default)]
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Byte length of the compact JSON form
pub fn serialized_len<T: Serialize + ?Sized>(value: &T) -> usize {
    let mut counter = ByteCounter::default();
    match serde_json::to_writer(&mut counter, value) {
        Ok(()) => counter.0,
        // string-keyed trees always serialize; an unserializable value weighs nothing
        Err(_) => 0,
    }
}

/// Cost of `value` in budget units
pub fn estimate<T: Serialize + ?Sized>(value: &T, divisor: usize) -> usize {
    serialized_len(value) / divisor.max(1)
}

/// Compact JSON form handed to callers
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
