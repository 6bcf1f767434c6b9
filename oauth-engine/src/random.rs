use crate::error::EngineError;
use rand::RngCore;
use rand::rngs::OsRng;

/// `len` bytes from the OS CSPRNG
pub fn random_bytes(len: usize) -> Result<Vec<u8>, EngineError> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| EngineError::Random(e.to_string()))?;
    Ok(bytes)
}

/// A hex code carrying `len` random bytes
pub fn generate_code(len: usize) -> Result<String, EngineError> {
    random_bytes(len).map(hex::encode)
}
