//! draft-cavage HTTP-Signatures, restricted to the one shape this
//! protocol needs: signing a single `digest` header with Ed25519.

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signer, SigningKey};

/// Build the `signature` header value for a request whose `digest`
/// header has already been computed. Only `digest` is ever signed here;
/// `headers` is accepted as a list for shape-fidelity with the general
/// scheme but this protocol always passes `["digest"]`.
pub fn sign_http(headers_to_sign: &[(&str, &str)], key_id: &str, signing_key: &SigningKey) -> String {
    let signing_string: String = headers_to_sign
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n");

    let signature = signing_key.sign(signing_string.as_bytes());
    let signature_b64 = STANDARD.encode(signature.to_bytes());

    let header_names: Vec<&str> = headers_to_sign.iter().map(|(name, _)| *name).collect();

    format!(
        "keyId=\"{key_id}\",algorithm=\"ed25519\",headers=\"{}\",signature=\"{signature_b64}\"",
        header_names.join(" ")
    )
}
