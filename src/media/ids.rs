use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

/// 256 bits of entropy per identifier.
pub const ID_BYTES: usize = 32;

/// Fresh url-safe identifier for temp files and object keys.
///
/// Drawn from the thread-local CSPRNG, which is seeded from the OS. The
/// encoding never yields `/` or `.`, so the id is safe as a single path
/// component.
pub fn random_id() -> String {
    let bytes: [u8; ID_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}
