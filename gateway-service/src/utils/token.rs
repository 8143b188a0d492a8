use rand::Rng;
use sha2::{Digest, Sha256};

/// 32 random bytes, hex encoded. Used for invite tokens.
pub fn generate_random_token() -> String {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; 32] = rng.gen();
    hex::encode(token_bytes)
}

/// One-time password for auto-provisioned accounts.
///
/// The fixed suffix satisfies upper/lower/digit/symbol password rules.
pub fn generate_temporary_password() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 12] = rng.gen();
    format!("{}!Aa1", hex::encode(bytes))
}

/// Storage form of a one-time token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
