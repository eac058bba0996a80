//! Legacy Niceware mnemonic support.
//!
//! Niceware maps each 16-bit half-word to one of 65536 dictionary
//! entries. The dictionary itself is an external collaborator — loaded
//! by the embedder from `LoadNicewareList` (see `ledger-wallet`'s
//! recovery path) — so this module only re-exports the pure decode
//! function from [`crate::seed`] under the name callers expect.

pub use crate::seed::decode_niceware;

/// Parse a newline-delimited dictionary blob (the shape
/// `LoadNicewareList` hands back) into an ordered word list.
pub fn parse_dictionary(blob: &str) -> Vec<String> {
    blob.lines().map(|l| l.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_newline_delimited_blob() {
        let blob = "alpha\nbravo\ncharlie\n";
        let words = parse_dictionary(blob);
        assert_eq!(words, vec!["alpha", "bravo", "charlie"]);
    }
}
