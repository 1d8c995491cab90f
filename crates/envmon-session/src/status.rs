//! Station status-code decoding

/// Bit assignment for the status word a measurement station reports.
const STATUS_BITS: [(u32, &str); 7] = [
    (0x01, "311"), // inlet fault
    (0x02, "312"), // camera fault
    (0x04, "313"), // QR reader fault
    (0x08, "314"), // measurement data fault
    (0x10, "315"), // disk fault
    (0x20, "316"), // measurement unavailable
    (0x40, "317"), // station disconnected
];

/// Decodes a status bitmask into the numeric error codes it carries, in
/// ascending code order. Unrecognized bits are ignored.
pub fn parse_status_code(code: u32) -> Vec<&'static str> {
    STATUS_BITS
        .iter()
        .filter(|(bit, _)| code & bit != 0)
        .map(|&(_, code)| code)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_code() {
        assert_eq!(parse_status_code(0), Vec::<&str>::new());
        assert_eq!(parse_status_code(0b1010), vec!["312", "314"]);
        assert_eq!(
            parse_status_code(0x7f),
            vec!["311", "312", "313", "314", "315", "316", "317"]
        );
    }

    #[test]
    fn test_unknown_bits_are_ignored() {
        assert_eq!(parse_status_code(0x80), Vec::<&str>::new());
        assert_eq!(parse_status_code(0x80 | 0x01), vec!["311"]);
    }
}
