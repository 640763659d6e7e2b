//! Identifier and password helpers

use bech32::Bech32m;
use uuid7::uuid7;

use crate::error::Result;

// construct a unique record id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> Result<String> {
    let hrp = bech32::Hrp::parse(hrp)
        .map_err(|e| crate::error::BackofficeError::Validation(e.to_string()))?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Random hex salt taken from the bytes of a fresh uuid7.
pub fn new_salt() -> String {
    hex::encode(uuid7().as_bytes())
}

pub fn salted_digest(salt: &str, secret: &str) -> String {
    sha256::digest(format!("{salt}:{secret}"))
}

/// Throwaway password handed out on reset. Uses the random tail of a uuid7.
pub fn temporary_password() -> String {
    hex::encode(&uuid7().as_bytes()[8..])
}
