//! Decoding of the packed hex fields used by `/proc/net/{tcp,udp}[6]`.
//!
//! Addresses are stored as 32-bit words in host byte order, so on the
//! little-endian machines this probe targets every 4-byte group appears
//! reversed relative to network order.

use crate::error::ProbeError;
use std::net::Ipv4Addr;
use std::str::FromStr;

const IPV4_MAPPED_PREFIX: &str = "00:00:00:00:00:00:00:00:00:00:FF:FF";

/// `"0100007F"` -> `"127.0.0.1"`.
pub fn decode_ipv4(hex: &str) -> Result<String, ProbeError> {
    if hex.len() != 8 {
        return Err(ProbeError::malformed(hex, "IPv4 address must be 8 hex digits"));
    }
    let raw = parse_word(hex)?;
    Ok(Ipv4Addr::from(raw.swap_bytes()).to_string())
}

/// Decodes a 32-digit address into sixteen uppercase two-digit segments
/// joined by `:`, without zero compression.
pub fn decode_ipv6(hex: &str) -> Result<String, ProbeError> {
    if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ProbeError::malformed(hex, "IPv6 address must be 32 hex digits"));
    }
    let mut octets = [0_u8; 16];
    for (group, chunk) in octets.chunks_exact_mut(4).enumerate() {
        let word = parse_word(&hex[group * 8..(group + 1) * 8])?;
        chunk.copy_from_slice(&word.swap_bytes().to_be_bytes());
    }
    Ok(render_octets(&octets))
}

pub fn decode_hex_int(hex: &str) -> Result<u64, ProbeError> {
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ProbeError::malformed(hex, "expected hexadecimal digits"));
    }
    u64::from_str_radix(hex, 16).map_err(|_| ProbeError::malformed(hex, "hex value out of range"))
}

/// Renders a dotted quad the way `decode_ipv6` renders `::ffff:a.b.c.d`.
pub fn ipv4_mapped_ipv6(dotted: &str) -> Result<String, ProbeError> {
    let addr =
        Ipv4Addr::from_str(dotted).map_err(|_| ProbeError::InvalidAddress(dotted.to_string()))?;
    Ok(format!(
        "{IPV4_MAPPED_PREFIX}:{}",
        render_octets(&addr.octets())
    ))
}

pub(crate) fn render_octets(octets: &[u8]) -> String {
    octets
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn parse_word(hex: &str) -> Result<u32, ProbeError> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ProbeError::malformed(hex, "expected hexadecimal digits"));
    }
    u32::from_str_radix(hex, 16).map_err(|_| ProbeError::malformed(hex, "expected hexadecimal digits"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_ipv4(dotted: &str) -> String {
        let addr: Ipv4Addr = dotted.parse().unwrap();
        format!("{:08X}", u32::from(addr).swap_bytes())
    }

    #[test]
    fn ipv4_kernel_sample_is_byte_reversed() {
        assert_eq!(decode_ipv4("0100007F").unwrap(), "127.0.0.1");
        assert_eq!(decode_ipv4("6401A8C0").unwrap(), "192.168.1.100");
        assert_eq!(decode_ipv4("00000000").unwrap(), "0.0.0.0");
    }

    #[test]
    fn ipv4_network_order_input_comes_out_reversed() {
        assert_eq!(decode_ipv4("7F000001").unwrap(), "1.0.0.127");
    }

    #[test]
    fn ipv4_decode_inverts_kernel_encoding() {
        for dotted in ["10.0.0.5", "255.255.255.255", "172.16.254.1", "8.8.4.4"] {
            assert_eq!(decode_ipv4(&encode_ipv4(dotted)).unwrap(), dotted);
        }
    }

    #[test]
    fn ipv4_rejects_bad_length_and_digits() {
        assert!(matches!(
            decode_ipv4("0100007"),
            Err(ProbeError::MalformedInput { .. })
        ));
        assert!(matches!(
            decode_ipv4("0100007G"),
            Err(ProbeError::MalformedInput { .. })
        ));
        assert!(matches!(
            decode_ipv4("+100007F"),
            Err(ProbeError::MalformedInput { .. })
        ));
    }

    #[test]
    fn ipv6_groups_are_reversed_in_place() {
        assert_eq!(
            decode_ipv6("00000000000000000000000001000000").unwrap(),
            "00:00:00:00:00:00:00:00:00:00:00:00:00:00:00:01"
        );
        assert_eq!(
            decode_ipv6("B80D0120000000000000000001000000").unwrap(),
            "20:01:0D:B8:00:00:00:00:00:00:00:00:00:00:00:01"
        );
    }

    #[test]
    fn ipv6_mapped_sample_matches_mapped_rendering() {
        let decoded = decode_ipv6("0000000000000000FFFF00000500000A").unwrap();
        assert_eq!(decoded, ipv4_mapped_ipv6("10.0.0.5").unwrap());
        assert_eq!(decoded, "00:00:00:00:00:00:00:00:00:00:FF:FF:0A:00:00:05");
    }

    #[test]
    fn ipv6_rejects_wrong_length() {
        assert!(matches!(
            decode_ipv6("0000"),
            Err(ProbeError::MalformedInput { .. })
        ));
    }

    #[test]
    fn ipv6_rejects_multibyte_characters() {
        // 32 bytes, with a two-byte char straddling the first group boundary
        let field = format!("aaaaaaa\u{e9}{}", "a".repeat(23));
        assert_eq!(field.len(), 32);
        assert!(matches!(
            decode_ipv6(&field),
            Err(ProbeError::MalformedInput { .. })
        ));
    }

    #[test]
    fn hex_int_parses_ports() {
        assert_eq!(decode_hex_int("0035").unwrap(), 53);
        assert_eq!(decode_hex_int("01BB").unwrap(), 443);
        assert_eq!(decode_hex_int("ffff").unwrap(), 65535);
        assert!(decode_hex_int("").is_err());
        assert!(decode_hex_int("12Z4").is_err());
    }

    #[test]
    fn mapped_rejects_non_ipv4() {
        assert!(matches!(
            ipv4_mapped_ipv6("10.0.0"),
            Err(ProbeError::InvalidAddress(_))
        ));
        assert!(matches!(
            ipv4_mapped_ipv6("example.com"),
            Err(ProbeError::InvalidAddress(_))
        ));
    }
}
