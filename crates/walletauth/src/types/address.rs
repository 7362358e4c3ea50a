/*
[INPUT]:  Account address strings from tokens, providers and recovery
[OUTPUT]: Syntax checks and case-insensitive comparison
[POS]:    Data layer - EVM address conventions
[UPDATE]: When address validation rules change (e.g. enforcing EIP-55)
*/

const ADDRESS_HEX_LEN: usize = 40;

/// `0x` followed by exactly 40 hex digits, any casing.
///
/// Checksum casing is not validated.
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| {
            hex.len() == ADDRESS_HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit())
        })
}

/// Lowercase form with a `0x` prefix
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    let hex = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    format!("0x{}", hex.to_ascii_lowercase())
}

pub fn addresses_match(a: &str, b: &str) -> bool {
    normalize_address(a) == normalize_address(b)
}
