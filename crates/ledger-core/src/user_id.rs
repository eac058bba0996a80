//! `user_id` / `anonize_viewing_id` derivation.
//!
//! Both ids are produced the same way from a GUID: strip the hyphens,
//! then delete the byte at index 12, yielding a 31-octet token the
//! blinded-credential library accepts.

/// Derive a 31-octet anonize id from a 36-character hyphenated GUID.
pub fn derive_anonize_id(guid: &str) -> String {
    let stripped: String = guid.chars().filter(|&c| c != '-').collect();
    let mut bytes: Vec<u8> = stripped.into_bytes();
    if bytes.len() > 12 {
        bytes.remove(12);
    }
    String::from_utf8(bytes).expect("GUID characters are ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_persona_scenario() {
        let persona_id = "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee";
        let user_id = derive_anonize_id(persona_id);
        assert_eq!(user_id, "aaaaaaaabbbbccccddddeeeeeeeeeee");
        assert_eq!(user_id.len(), 31);
    }

    #[test]
    fn output_is_always_31_octets_for_a_standard_guid() {
        let guid = "12345678-1234-1234-1234-123456789012";
        assert_eq!(derive_anonize_id(guid).len(), 31);
    }
}
