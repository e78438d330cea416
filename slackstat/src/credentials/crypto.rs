//! Chromium "Safe Storage" cookie decryption.
//!
//! Encrypted cookie values are `v10` + AES-128-CBC(PKCS#7) ciphertext with a
//! fixed IV of 16 spaces. The key is PBKDF2-HMAC-SHA1 over the Keychain
//! passphrase with the salt `saltysalt` and 1003 iterations.

use aes::Aes128;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use tracing::debug;

use super::error::ExtractionError;

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

pub const KEY_LEN: usize = 16;
pub const PBKDF2_SALT: &[u8] = b"saltysalt";
pub const PBKDF2_ITERATIONS: u32 = 1003;
pub const CBC_IV: [u8; 16] = [0x20; 16];

/// Length of the version tag (`v10`/`v11`) in front of the ciphertext.
pub const VERSION_PREFIX_LEN: usize = 3;

/// Marker at the start of the session cookie value.
pub const COOKIE_MARKER: &[u8] = b"xoxd-";

/// AES-128 key derived from the Safe Storage passphrase.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieKey([u8; KEY_LEN]);

impl CookieKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for CookieKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CookieKey(..)")
    }
}

pub fn derive_key(passphrase: &str) -> CookieKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<sha1::Sha1>(
        passphrase.as_bytes(),
        PBKDF2_SALT,
        PBKDF2_ITERATIONS,
        &mut key,
    );
    CookieKey(key)
}

/// Decrypt and unpad `ciphertext` with AES-128-CBC.
pub fn aes_cbc_decrypt(
    ciphertext: &[u8],
    key: &CookieKey,
    iv: &[u8; 16],
) -> Result<Vec<u8>, ExtractionError> {
    let cipher = Aes128CbcDec::new(key.as_bytes().into(), iv.into());
    let mut buf = ciphertext.to_vec();
    let len = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| ExtractionError::cookie("AES decryption failed (bad key or padding)"))?
        .len();
    buf.truncate(len);
    Ok(buf)
}

/// Encrypt with AES-128-CBC and PKCS#7 padding.
pub fn aes_cbc_encrypt(plaintext: &[u8], key: &CookieKey, iv: &[u8; 16]) -> Vec<u8> {
    let cipher = Aes128CbcEnc::new(key.as_bytes().into(), iv.into());
    let msg_len = plaintext.len();
    let mut buf = vec![0u8; msg_len + 16];
    buf[..msg_len].copy_from_slice(plaintext);
    // The buffer always has room for a full padding block.
    let len = cipher
        .encrypt_padded_mut::<Pkcs7>(&mut buf, msg_len)
        .map(|ct| ct.len())
        .unwrap_or(msg_len);
    buf.truncate(len);
    buf
}

/// Recover the `xoxd-` cookie from an encrypted `cookies.encrypted_value` blob.
pub fn decrypt_cookie_value(blob: &[u8], key: &CookieKey) -> Result<String, ExtractionError> {
    if blob.len() <= VERSION_PREFIX_LEN {
        return Err(ExtractionError::cookie("Cookie data too short"));
    }

    let (version, ciphertext) = blob.split_at(VERSION_PREFIX_LEN);
    if version != b"v10" && version != b"v11" {
        debug!(version = ?String::from_utf8_lossy(version), "Unexpected cookie version prefix");
    }

    let plaintext = aes_cbc_decrypt(ciphertext, key, &CBC_IV)?;
    extract_cookie(&plaintext)
}

/// Take everything from the `xoxd-` marker onward, trimmed of control chars.
pub fn extract_cookie(plaintext: &[u8]) -> Result<String, ExtractionError> {
    let start = plaintext
        .windows(COOKIE_MARKER.len())
        .position(|w| w == COOKIE_MARKER)
        .ok_or_else(|| ExtractionError::cookie("No xoxd token in decrypted cookie"))?;

    let cookie = std::str::from_utf8(&plaintext[start..])
        .map_err(|_| ExtractionError::cookie("Could not decode cookie as UTF-8"))?;

    Ok(cookie.trim_matches(|c: char| c.is_control()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PASSPHRASE: &str = "test-passphrase";

    /// `v10` + AES-128-CBC("\x01\x02junk..junk!!xoxd-abc%2FDEF%3D%3D\x03") under
    /// the key for `test-passphrase`.
    const COOKIE_BLOB_HEX: &str = "763130e24f475a9f74ae16abb991b04bb285b1711cf834c06f9106294aeefbc5d95c41c4cf56228443ff4a833609d4781e3d8ac5e77a9551e95124b43d7b777367c176";

    /// `v10` + AES-128-CBC("no cookie marker in here at all").
    const NO_MARKER_BLOB_HEX: &str =
        "763130e631822a1b6d75514d44f13305ddc464ac238ca29be490925e41670bd2b60686";

    #[test]
    fn test_derive_key_known_vectors() {
        assert_eq!(
            hex::encode(derive_key(TEST_PASSPHRASE).as_bytes()),
            "1520ca2d2c5dceeeebcd3a50818a46c7"
        );
        assert_eq!(
            hex::encode(derive_key("peanuts").as_bytes()),
            "d9a09d499b4e1b7461f28e67972c6dbd"
        );
    }

    #[test]
    fn test_round_trip() {
        let key = derive_key(TEST_PASSPHRASE);
        for plaintext in [&b""[..], b"xoxd-short", &[0x41u8; 16], &[0x42u8; 37]] {
            let ciphertext = aes_cbc_encrypt(plaintext, &key, &CBC_IV);
            assert_eq!(ciphertext.len() % 16, 0);
            assert_eq!(aes_cbc_decrypt(&ciphertext, &key, &CBC_IV).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_decrypt_known_cookie_blob() {
        let blob = hex::decode(COOKIE_BLOB_HEX).unwrap();
        let cookie = decrypt_cookie_value(&blob, &derive_key(TEST_PASSPHRASE)).unwrap();
        assert_eq!(cookie, "xoxd-abc%2FDEF%3D%3D");
    }

    #[test]
    fn test_missing_marker_is_error() {
        let blob = hex::decode(NO_MARKER_BLOB_HEX).unwrap();
        let err = decrypt_cookie_value(&blob, &derive_key(TEST_PASSPHRASE)).unwrap_err();
        assert!(matches!(err, ExtractionError::CookieDecryptionFailed(_)));
    }

    #[test]
    fn test_wrong_key_never_yields_cookie() {
        let blob = hex::decode(COOKIE_BLOB_HEX).unwrap();
        // A wrong key either fails unpadding or produces bytes with no marker.
        assert!(decrypt_cookie_value(&blob, &derive_key("peanuts")).is_err());
    }

    #[test]
    fn test_short_blob_is_error() {
        let key = derive_key(TEST_PASSPHRASE);
        assert!(decrypt_cookie_value(b"v10", &key).is_err());
        assert!(decrypt_cookie_value(b"", &key).is_err());
    }

    #[test]
    fn test_extract_cookie_invalid_utf8() {
        let err = extract_cookie(b"xoxd-\xff\xfe").unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_key_debug_is_redacted() {
        assert_eq!(format!("{:?}", derive_key("x")), "CookieKey(..)");
    }
}
