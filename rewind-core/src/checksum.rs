//! CRC32 checksums of source files.

/// CRC32 of the raw file contents.
pub fn crc32(content: &str) -> u32 {
    crc32fast::hash(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_is_deterministic() {
        let a = crc32("CREATE TABLE t (id INT);");
        assert_eq!(a, crc32("CREATE TABLE t (id INT);"));
        assert_ne!(a, crc32("CREATE TABLE t (id BIGINT);"));
    }

    #[test]
    fn test_crc32_known_value() {
        // Standard CRC-32 check value
        assert_eq!(crc32("123456789"), 0xCBF4_3926);
    }
}
