//! Obfuscated user identifier sent with every request to the collector.

use aes::Aes128;
use ecb::cipher::block_padding::Pkcs7;
use ecb::cipher::{BlockEncryptMut, KeyInit};

type IdentityCipher = ecb::Encryptor<Aes128>;

/// Key shared with the collector to decode the user identifier.
const IDENTITY_KEY: [u8; 16] = [
    0x7a, 0x82, 0xfb, 0x3e, 0x54, 0x89, 0xcf, 0xff, 0xc4, 0x2b, 0xe3, 0xf0, 0xb9, 0xf9, 0xb2, 0xac,
];

/// Name reported for clients without a configured user name.
pub const ANONYMOUS: &str = "anonymous";

/// Encrypts the user name for the identity header.
///
/// The name, or `anonymous` if none is set, is encrypted with AES-128 in ECB mode with PKCS#7
/// padding and rendered as uppercase hex.
pub fn obfuscate_username(username: Option<&str>) -> String {
    let plain = match username {
        Some(name) if !name.is_empty() => name,
        _ => ANONYMOUS,
    };

    let encrypted =
        IdentityCipher::new(&IDENTITY_KEY.into()).encrypt_padded_vec_mut::<Pkcs7>(plain.as_bytes());
    hex::encode_upper(encrypted)
}
