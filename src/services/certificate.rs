// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Placeholder certificate minting.
//!
//! Certificates snapshot a user's totals and carry random identifiers
//! formatted like on-chain ones. Minting reads the aggregate but never
//! writes it.

use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::Certificate;

const TOKEN_ID_BYTES: usize = 16;
const TX_HASH_BYTES: usize = 32;

#[derive(Clone)]
pub struct CertificateService {
    store: Arc<dyn Store>,
    rng: SystemRandom,
}

impl CertificateService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            rng: SystemRandom::new(),
        }
    }

    /// Mint a certificate for the user's current totals.
    pub async fn mint(&self, user_id: &str) -> Result<Certificate> {
        let aggregate = self
            .store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile for {} not found", user_id)))?;

        if aggregate.total_green_points <= 0 {
            return Err(AppError::Validation(
                "Earn green points before minting a certificate".to_string(),
            ));
        }

        let certificate = Certificate {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            token_id: random_hex(&self.rng, TOKEN_ID_BYTES)?,
            tx_hash: random_hex(&self.rng, TX_HASH_BYTES)?,
            total_carbon_footprint: aggregate.total_carbon_footprint,
            total_green_points: aggregate.total_green_points,
            issued_at: Utc::now(),
        };

        self.store.save_certificate(&certificate).await?;

        tracing::info!(
            user_id,
            certificate_id = %certificate.id,
            points = certificate.total_green_points,
            "Certificate minted"
        );

        Ok(certificate)
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Certificate>> {
        self.store.list_certificates(user_id).await
    }
}

/// `0x`-prefixed hex string of `len` random bytes.
fn random_hex(rng: &dyn SecureRandom, len: usize) -> Result<String> {
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System randomness unavailable")))?;
    Ok(format!("0x{}", hex::encode(bytes)))
}
