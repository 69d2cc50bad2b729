use crate::core::error::AppError;
use tokio::task;
use tracing::warn;

/// bcrypt hashing and verification, run off the async worker threads
pub struct PasswordHasher {
    cost: u32,
    /// Verified against when the username is unknown, so a miss costs as
    /// much time as a wrong password
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, bcrypt::BcryptError> {
        let dummy_hash = bcrypt::hash("not-a-real-password", cost)?;
        Ok(Self { cost, dummy_hash })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, password: String) -> Result<String, AppError> {
        let cost = self.cost;
        let hashed = task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;
        Ok(hashed)
    }

    /// Check `password` against `stored_hash`. With no stored hash the dummy
    /// hash is checked instead and the result is always `false`.
    pub async fn verify(&self, password: String, stored_hash: Option<String>) -> Result<bool, AppError> {
        let known = stored_hash.is_some();
        let hash = stored_hash.unwrap_or_else(|| self.dummy_hash.clone());

        let matched = task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .unwrap_or_else(|e| {
                warn!(error = %e, "Stored password hash could not be parsed");
                false
            });

        Ok(known && matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_is_not_plaintext() {
        let hasher = PasswordHasher::new(4).unwrap();
        let hashed = hasher.hash("secret123".to_string()).await.unwrap();

        assert_ne!(hashed, "secret123");
        assert!(hashed.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_verify_round_trip() {
        let hasher = PasswordHasher::new(4).unwrap();
        let hashed = hasher.hash("secret123".to_string()).await.unwrap();

        assert!(hasher.verify("secret123".to_string(), Some(hashed.clone())).await.unwrap());
        assert!(!hasher.verify("wrong-pass".to_string(), Some(hashed)).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_user_never_matches() {
        let hasher = PasswordHasher::new(4).unwrap();
        assert!(!hasher
            .verify("not-a-real-password".to_string(), None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_hash_is_a_mismatch() {
        let hasher = PasswordHasher::new(4).unwrap();
        assert!(!hasher
            .verify("secret123".to_string(), Some("garbage".to_string()))
            .await
            .unwrap());
    }

    #[test]
    fn test_rejects_invalid_cost() {
        assert!(PasswordHasher::new(3).is_err());
    }
}
