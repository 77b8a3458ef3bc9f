//! Account address validation
//!
//! Cosmos-style bech32 account addresses: a lowercase human-readable prefix,
//! a `1` separator, and a data part in the bech32 charset. Full checksum
//! verification belongs to the chain client; commands only need a shape check
//! good enough to reject typos before simulation.

/// bech32 data charset; excludes `1`, `b`, `i`, `o`
const CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Shape-check a bech32 account address
pub fn is_valid_address(address: &str) -> bool {
    if address.len() < 8 || address.len() > 90 {
        return false;
    }
    if address.chars().any(|c| c.is_ascii_uppercase()) {
        return false;
    }
    let Some(separator) = address.rfind('1') else {
        return false;
    };
    if separator == 0 {
        return false;
    }
    let (prefix, data) = address.split_at(separator);
    let data = &data[1..];
    if data.len() < 6 {
        return false;
    }
    prefix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && data.chars().all(|c| CHARSET.contains(c))
}

/// Shorten an address for display: first 10 and last 6 characters
pub fn abbreviate(address: &str) -> String {
    if address.len() <= 16 {
        return address.to_string();
    }
    format!("{}..{}", &address[..10], &address[address.len() - 6..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_wasmd_addresses() {
        assert!(is_valid_address("wasm1hft9sxhx7d7furw9y0rjxu4hfsm76ehkman78g"));
        assert!(is_valid_address("wasm10f0wy3fs6ex395ylturr0hv03m3cjcjpy4ux6x"));
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("wasm1"));
        assert!(!is_valid_address("noseparator"));
        assert!(!is_valid_address("wasm1UPPER9xf2tvdw0s3jn54khce6mua7l"));
        // `b` is outside the bech32 charset
        assert!(!is_valid_address("wasm1bbbbbbbbbbbbbbbbbbbb"));
    }

    #[test]
    fn test_abbreviate() {
        let addr = "wasm1hft9sxhx7d7furw9y0rjxu4hfsm76ehkman78g";
        assert_eq!(abbreviate(addr), "wasm1hft9s..man78g");
        assert_eq!(abbreviate("short"), "short");
    }
}
