//! Sealed-box encryption of secret values for the GitHub secrets API.

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crypto_box::PublicKey;
use crypto_box::aead::OsRng;

/// Seal `plaintext` for the holder of the base64 `public_key`, returning the
/// ciphertext as base64.
pub fn seal_secret(public_key: &str, plaintext: &str) -> Result<String> {
    let raw = STANDARD
        .decode(public_key.trim())
        .context("decode repository public key")?;
    let bytes: [u8; crypto_box::KEY_SIZE] = raw
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("public key must be {} bytes, got {}", crypto_box::KEY_SIZE, raw.len()))?;
    let sealed = PublicKey::from(bytes)
        .seal(&mut OsRng, plaintext.as_bytes())
        .map_err(|err| anyhow!("seal secret: {err}"))?;
    Ok(STANDARD.encode(sealed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_box::SecretKey;

    #[test]
    fn sealed_value_opens_with_matching_secret_key() {
        let secret = SecretKey::generate(&mut OsRng);
        let public = STANDARD.encode(secret.public_key().as_bytes());

        let sealed = seal_secret(&public, "deploy@example.org").expect("seal");
        let opened = secret
            .unseal(&STANDARD.decode(sealed).expect("base64"))
            .expect("unseal");
        assert_eq!(opened, b"deploy@example.org");
    }

    #[test]
    fn rejects_short_key() {
        let err = seal_secret(&STANDARD.encode([1u8; 16]), "x").expect_err("should fail");
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn rejects_non_base64_key() {
        assert!(seal_secret("not base64!!", "x").is_err());
    }
}
