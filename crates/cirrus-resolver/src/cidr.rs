//! IPv4 subnet carving for `Fn::Cidr`

use cirrus_core::{Result, TemplateError};
use std::net::Ipv4Addr;

const MAX_SUBNETS: i64 = 256;

/// Carve `count` consecutive subnets with `cidr_bits` host bits out of `block`.
pub fn subnets(block: &str, count: i64, cidr_bits: i64, at: &str) -> Result<Vec<String>> {
    let (address, prefix) = parse_block(block, at)?;

    if !(1..=MAX_SUBNETS).contains(&count) {
        return Err(TemplateError::type_error(
            at,
            format!("subnet count must be between 1 and {}, got {}", MAX_SUBNETS, count),
        ));
    }
    if !(1..=32).contains(&cidr_bits) {
        return Err(TemplateError::type_error(
            at,
            format!("cidrBits must be between 1 and 32, got {}", cidr_bits),
        ));
    }

    let subnet_prefix = 32 - cidr_bits as u32;
    if subnet_prefix < prefix {
        return Err(TemplateError::type_error(
            at,
            format!("/{} subnets do not fit in {}", subnet_prefix, block),
        ));
    }
    let available = 1u64 << (subnet_prefix - prefix);
    if count as u64 > available {
        return Err(TemplateError::type_error(
            at,
            format!("{} only holds {} /{} subnets, {} requested", block, available, subnet_prefix, count),
        ));
    }

    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    let base = (u32::from(address) & mask) as u64;
    let step = 1u64 << cidr_bits;

    Ok((0..count as u64)
        .map(|i| {
            let network = Ipv4Addr::from((base + i * step) as u32);
            format!("{}/{}", network, subnet_prefix)
        })
        .collect())
}

fn parse_block(block: &str, at: &str) -> Result<(Ipv4Addr, u32)> {
    let malformed = || TemplateError::type_error(at, format!("'{}' is not an IPv4 CIDR block", block));
    let (address, prefix) = block.trim().split_once('/').ok_or_else(malformed)?;
    let address: Ipv4Addr = address.parse().map_err(|_| malformed())?;
    let prefix: u32 = prefix.parse().map_err(|_| malformed())?;
    if prefix > 32 {
        return Err(malformed());
    }
    Ok((address, prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_carves_consecutive_subnets() {
        assert_eq!(
            subnets("10.0.0.0/16", 4, 8, "x").unwrap(),
            vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]
        );
        assert_eq!(
            subnets("192.168.0.0/24", 2, 6, "x").unwrap(),
            vec!["192.168.0.0/26", "192.168.0.64/26"]
        );
    }

    #[test]
    fn test_host_bits_are_masked() {
        assert_eq!(subnets("10.0.7.9/16", 1, 8, "x").unwrap(), vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_block_too_small() {
        let err = subnets("10.0.0.0/24", 8, 6, "Resources.A").unwrap_err();
        assert_eq!(err.kind(), "TypeError");
        assert!(subnets("10.0.0.0/24", 1, 16, "x").is_err());
    }

    #[test]
    fn test_malformed_block() {
        assert!(subnets("10.0.0.0", 1, 8, "x").is_err());
        assert!(subnets("10.0.0/16", 1, 8, "x").is_err());
        assert!(subnets("10.0.0.0/40", 1, 8, "x").is_err());
    }
}
