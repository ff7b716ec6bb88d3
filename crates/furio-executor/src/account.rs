//! Accounts and address masking.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Characters of the address kept at the front of a mask.
const MASK_PREFIX: usize = 5;

/// Characters of the address kept at the back of a mask.
const MASK_SUFFIX: usize = 6;

/// A private key, wiped from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for the signer only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(***)")
    }
}

/// A wallet that performs remote writes.
#[derive(Debug, Clone)]
pub struct Account {
    /// Position in configuration, starting at 1.
    pub index: usize,
    pub address: String,
    pub key: SigningKey,
}

impl Account {
    pub fn new(index: usize, address: impl Into<String>, key: SigningKey) -> Self {
        Self {
            index,
            address: address.into(),
            key,
        }
    }

    /// Redacted form of the address for logs and reports.
    pub fn mask(&self) -> String {
        mask_address(&self.address)
    }

    /// `text` with every occurrence of this account's address masked.
    pub fn redact(&self, text: &str) -> String {
        redact_address(text, &self.address)
    }
}

/// Redact an address to `prefix...suffix`.
///
/// Addresses too short to hide anything mask to `***`.
pub fn mask_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= MASK_PREFIX + MASK_SUFFIX {
        return "***".to_string();
    }

    let prefix: String = chars[..MASK_PREFIX].iter().collect();
    let suffix: String = chars[chars.len() - MASK_SUFFIX..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// Replace every occurrence of `address` in `text` with its mask.
///
/// Matching ignores ASCII case. For `0x` addresses the bare hex form is
/// masked as well.
pub fn redact_address(text: &str, address: &str) -> String {
    let address = address.trim();
    if address.is_empty() {
        return text.to_string();
    }

    let redacted = replace_ignore_case(text, address, &mask_address(address));
    match address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    {
        Some(bare) if bare.len() > MASK_PREFIX + MASK_SUFFIX => {
            replace_ignore_case(&redacted, bare, &mask_address(bare))
        }
        _ => redacted,
    }
}

fn replace_ignore_case(text: &str, needle: &str, replacement: &str) -> String {
    // ASCII lowercasing keeps byte offsets, so indexes into `haystack` are valid in `text`
    let haystack = text.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, _) in haystack.match_indices(&needle) {
        out.push_str(&text[last..start]);
        out.push_str(replacement);
        last = start + needle.len();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mask_evm_address() {
        assert_eq!(
            mask_address("0xFdD831b51DCdA2be256Edf12Cd81C6Af79b6D7Df"),
            "0xFdD...b6D7Df"
        );
    }

    #[test]
    fn test_mask_short_address() {
        assert_eq!(mask_address("0x1234"), "***");
        assert_eq!(mask_address(""), "***");
    }

    #[test]
    fn test_key_is_not_debug_printed() {
        let account = Account::new(1, "0xabc", SigningKey::new("deadbeef"));
        let printed = format!("{:?}", account);

        assert!(!printed.contains("deadbeef"));
        assert!(printed.contains("SigningKey(***)"));
    }

    #[test]
    fn test_redact_node_error_mentions() {
        let account = Account::new(
            1,
            "0xFdD831b51DCdA2be256Edf12Cd81C6Af79b6D7Df",
            SigningKey::new("k"),
        );
        let message = "insufficient funds for gas * price + value: \
                       address 0xfdd831b51dcda2be256edf12cd81c6af79b6d7df have 0 want 1";

        let redacted = account.redact(message);
        assert_eq!(
            redacted,
            "insufficient funds for gas * price + value: address 0xFdD...b6D7Df have 0 want 1"
        );
    }

    #[test]
    fn test_redact_bare_hex_and_repeats() {
        let address = "0xFdD831b51DCdA2be256Edf12Cd81C6Af79b6D7Df";
        let message = format!(
            "from {} nonce 3, sender FdD831b51DCdA2be256Edf12Cd81C6Af79b6D7Df",
            address
        );

        let redacted = redact_address(&message, address);
        assert!(
            !redacted
                .to_ascii_lowercase()
                .contains("fdd831b51dcda2be256edf12cd81c6af79b6d7df")
        );
        assert!(redacted.starts_with("from 0xFdD...b6D7Df nonce 3"));
    }

    #[test]
    fn test_redact_leaves_other_text_alone() {
        assert_eq!(redact_address("nonce too low", "0xabc"), "nonce too low");
        assert_eq!(redact_address("anything", ""), "anything");
    }

    proptest! {
        // A mask never contains the full address and always has a fixed width
        #[test]
        fn mask_is_fixed_width(address in "0x[0-9a-fA-F]{40}") {
            let masked = mask_address(&address);

            prop_assert_eq!(masked.len(), MASK_PREFIX + 3 + MASK_SUFFIX);
            prop_assert!(!masked.contains(&address));
            prop_assert!(masked.starts_with(&address[..MASK_PREFIX]));
            prop_assert!(masked.ends_with(&address[address.len() - MASK_SUFFIX..]));
        }
    }
}
