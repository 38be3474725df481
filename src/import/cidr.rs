//! CIDR network syntax validation.
//!
//! RFC 8805 requires the network column to be an IP prefix: a dotted-quad
//! IPv4 or colon-form IPv6 address followed by `/` and a prefix length.
//! A bare address with no prefix length is rejected.

use std::net::{Ipv4Addr, Ipv6Addr};

/// Check whether `input` is a valid CIDR network.
///
/// Accepts dotted-quad IPv4 with `/0`..`/32` and colon-form IPv6
/// (abbreviated groups permitted) with `/0`..`/128`. Pure and total:
/// anything else, including a missing prefix length, returns `false`.
pub fn is_valid_cidr(input: &str) -> bool {
    let trimmed = input.trim();
    let Some((addr, prefix)) = trimmed.split_once('/') else {
        return false;
    };

    // `u8::from_str` tolerates a leading `+`, which is not valid prefix syntax.
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };

    if addr.contains(':') {
        addr.parse::<Ipv6Addr>().is_ok() && prefix <= 128
    } else {
        addr.parse::<Ipv4Addr>().is_ok() && prefix <= 32
    }
}
