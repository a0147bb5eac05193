//! bcrypt password hashing on the blocking pool.

use async_trait::async_trait;

use crate::{application::accounts::PasswordHasher, infra::error::InfraError};

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, password: &str) -> Result<String, InfraError> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|err| InfraError::hashing(format!("hashing task failed: {err}")))?
            .map_err(|err| InfraError::hashing(err.to_string()))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, InfraError> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|err| InfraError::hashing(format!("verify task failed: {err}")))?
            .map_err(|err| InfraError::hashing(err.to_string()))
    }
}
