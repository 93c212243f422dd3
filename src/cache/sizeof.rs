//! Size Estimation Module
//!
//! Pluggable cost function for cached values. The engine charges each entry
//! the estimator's result against `max_size`.

// == Size Estimator ==
/// Cost function mapping a value to its size.
///
/// Returning None signals that the value's size could not be determined; the
/// engine rejects the write with `SizeEstimationFailed` and leaves the cache
/// unchanged. Estimators must not mutate the value.
pub type SizeOfFn<V> = Box<dyn Fn(&V) -> Option<u64> + Send>;

// == Byte Weight ==
/// Default byte-length heuristic for common payload types.
///
/// Types implementing this get a default estimator via `CacheEngine::new`
/// without the caller supplying a `SizeOfFn`.
pub trait ByteWeight {
    /// Approximate size of the value in bytes.
    fn byte_weight(&self) -> u64;
}

impl ByteWeight for String {
    fn byte_weight(&self) -> u64 {
        self.len() as u64
    }
}

impl ByteWeight for Vec<u8> {
    fn byte_weight(&self) -> u64 {
        self.len() as u64
    }
}

impl ByteWeight for serde_json::Value {
    // Serialized length; a heuristic, not an allocation measurement.
    fn byte_weight(&self) -> u64 {
        self.to_string().len() as u64
    }
}

/// Builds the default estimator for payloads with a byte-length heuristic.
pub fn default_sizeof<V: ByteWeight>() -> SizeOfFn<V> {
    Box::new(|value| Some(value.byte_weight()))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_byte_weight() {
        assert_eq!("hello".to_string().byte_weight(), 5);
        assert_eq!(String::new().byte_weight(), 0);
    }

    #[test]
    fn test_vec_byte_weight() {
        assert_eq!(vec![0u8; 16].byte_weight(), 16);
    }

    #[test]
    fn test_json_byte_weight() {
        let value = serde_json::json!({"a": 1});
        assert_eq!(value.byte_weight(), value.to_string().len() as u64);
    }

    #[test]
    fn test_default_sizeof() {
        let sizeof = default_sizeof::<String>();
        assert_eq!(sizeof(&"abc".to_string()), Some(3));
    }
}
