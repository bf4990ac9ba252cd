//! Checksum pass-throughs with legacy calling conventions
//!
//! Both functions continue a running checksum: pass the previous value (or
//! the initial value) and the next chunk.

/// Initial Adler-32 value
pub const ADLER32_INIT: u32 = 1;

/// Initial CRC-32 value
pub const CRC32_INIT: u32 = 0;

/// Continue an Adler-32 checksum
pub fn adler32(adler: u32, bytes: &[u8]) -> u32 {
    let mut hasher = adler2::Adler32::from_checksum(adler);
    hasher.write_slice(bytes);
    hasher.checksum()
}

/// Continue a CRC-32 checksum
pub fn crc32(crc: u32, bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(crc);
    hasher.update(bytes);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_eq!(adler32(ADLER32_INIT, b"Wikipedia"), 0x11E6_0398);
        assert_eq!(crc32(CRC32_INIT, b"123456789"), 0xCBF4_3926);
        assert_eq!(adler32(ADLER32_INIT, b""), ADLER32_INIT);
    }

    proptest! {
        #[test]
        fn test_chunked_equals_whole(data in prop::collection::vec(any::<u8>(), 0..2048), split in 0usize..2048) {
            let split = split.min(data.len());
            let (head, tail) = data.split_at(split);

            prop_assert_eq!(adler32(adler32(ADLER32_INIT, head), tail), adler32(ADLER32_INIT, &data));
            prop_assert_eq!(crc32(crc32(CRC32_INIT, head), tail), crc32(CRC32_INIT, &data));
        }
    }
}
