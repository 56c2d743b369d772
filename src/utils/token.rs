use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, Rng, RngCore};

pub const RECRUITER_CODE_LEN: usize = 8;
pub const INVITE_TOKEN_BYTES: usize = 32;

const RECRUITER_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 8 characters drawn from `A-Z0-9`. Uniqueness is checked by the caller.
pub fn generate_recruiter_code() -> String {
    let mut rng = OsRng;
    (0..RECRUITER_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..RECRUITER_CODE_CHARSET.len());
            RECRUITER_CODE_CHARSET[idx] as char
        })
        .collect()
}

/// 32 bytes from the OS RNG, URL-safe base64 without padding.
pub fn generate_invitation_token() -> String {
    let mut bytes = [0u8; INVITE_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Codes are typed by hand, so compare them trimmed and upper-cased.
pub fn normalize_recruiter_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

pub fn is_well_formed_recruiter_code(code: &str) -> bool {
    code.len() == RECRUITER_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
