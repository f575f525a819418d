//! Ingest guard for webhook-style deliveries: signature, freshness, replay,
//! rate limiting, and idempotency. Transport-agnostic; callers hand over
//! the raw body and the extracted header values.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ring::hmac;
use shared::config::SecurityConfig;
use shared::infrastructure::security::SecurityStore;
use shared::{AppError, AppResult};
use tracing::instrument;

/// Header values accompanying one delivery.
#[derive(Debug, Clone, Default)]
pub struct DeliveryHeaders {
    pub signature: Option<String>,
    pub timestamp: Option<i64>,
    pub nonce: Option<String>,
    pub source_system: Option<String>,
    pub idempotency_key: Option<String>,
}

pub struct WebhookSecurity {
    store: Arc<dyn SecurityStore>,
    config: SecurityConfig,
}

impl WebhookSecurity {
    pub fn new(store: Arc<dyn SecurityStore>, config: SecurityConfig) -> Self {
        Self { store, config }
    }

    /// Verify an HMAC-SHA256 signature over the body. A `sha256=` prefix on
    /// the presented signature is tolerated.
    pub fn verify_hmac(&self, body: &[u8], signature: &str) -> AppResult<()> {
        if self.config.webhook_secret.is_empty() {
            return Err(AppError::Configuration(
                "webhook secret not configured".to_string(),
            ));
        }
        let presented = signature.strip_prefix("sha256=").unwrap_or(signature);
        let presented = hex::decode(presented)
            .map_err(|_| AppError::Validation("malformed signature".to_string()))?;

        let key = hmac::Key::new(hmac::HMAC_SHA256, self.config.webhook_secret.as_bytes());
        let computed = hmac::sign(&key, body);
        ring::constant_time::verify_slices_are_equal(computed.as_ref(), &presented)
            .map_err(|_| AppError::Validation("invalid signature".to_string()))
    }

    /// Reject stale timestamps and replayed nonces. The nonce claim lives
    /// in the security store for the replay TTL.
    pub async fn verify_timestamp_and_nonce(&self, timestamp: i64, nonce: &str) -> AppResult<()> {
        let now = Utc::now().timestamp();
        if (now - timestamp).abs() > self.config.webhook_timestamp_tolerance_seconds {
            return Err(AppError::Validation("stale request".to_string()));
        }
        let key = format!("nonce:{nonce}");
        let claimed = self
            .store
            .set_if_absent(&key, "1", Duration::from_secs(self.config.replay_ttl_seconds))
            .await?;
        if !claimed {
            return Err(AppError::Conflict("replay detected".to_string()));
        }
        Ok(())
    }

    /// Hourly counter per source; over max + burst trips the limit.
    pub async fn enforce_rate_limit(&self, source: &str) -> AppResult<()> {
        let hour_bucket = Utc::now().timestamp() / 3600;
        let key = format!("rl:{source}:{hour_bucket}");
        let count = self.store.incr(&key, Duration::from_secs(3600)).await?;
        if count > self.config.rate_limit_max_per_hour + self.config.rate_limit_burst {
            return Err(AppError::Conflict("rate limit exceeded".to_string()));
        }
        Ok(())
    }

    /// Claim an idempotency key. False means the delivery was already
    /// processed within the idempotency TTL.
    pub async fn enforce_idempotency(&self, idempotency_key: &str) -> AppResult<bool> {
        let key = format!("idem:{idempotency_key}");
        self.store
            .set_if_absent(
                &key,
                "1",
                Duration::from_secs(self.config.idempotency_ttl_seconds),
            )
            .await
    }

    /// Full gate in delivery order: signature, freshness/nonce, rate limit,
    /// idempotency. A duplicate delivery surfaces as Conflict.
    #[instrument(skip_all, fields(source = headers.source_system.as_deref().unwrap_or("unknown")))]
    pub async fn validate_delivery(
        &self,
        headers: &DeliveryHeaders,
        body: &[u8],
    ) -> AppResult<()> {
        let signature = headers
            .signature
            .as_deref()
            .ok_or_else(|| AppError::Validation("missing signature".to_string()))?;
        self.verify_hmac(body, signature)?;

        let (timestamp, nonce) = match (&headers.timestamp, &headers.nonce) {
            (Some(ts), Some(nonce)) => (*ts, nonce.as_str()),
            _ => return Err(AppError::Validation("missing timestamp/nonce".to_string())),
        };
        self.verify_timestamp_and_nonce(timestamp, nonce).await?;

        let source = headers.source_system.as_deref().unwrap_or("unknown");
        self.enforce_rate_limit(source).await?;

        let idempotency_key = headers
            .idempotency_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Validation("missing idempotency key".to_string()))?;
        if !self.enforce_idempotency(idempotency_key).await? {
            return Err(AppError::Conflict("duplicate request".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::infrastructure::security::InMemorySecurityStore;

    fn guard() -> WebhookSecurity {
        let config = SecurityConfig {
            webhook_secret: "test-secret".to_string(),
            webhook_timestamp_tolerance_seconds: 600,
            replay_ttl_seconds: 600,
            idempotency_ttl_seconds: 86_400,
            rate_limit_max_per_hour: 3,
            rate_limit_burst: 1,
            allow_identifiers: false,
        };
        WebhookSecurity::new(Arc::new(InMemorySecurityStore::new()), config)
    }

    fn sign(body: &[u8]) -> String {
        let key = hmac::Key::new(hmac::HMAC_SHA256, b"test-secret");
        hex::encode(hmac::sign(&key, body).as_ref())
    }

    #[test]
    fn valid_signature_passes_with_and_without_prefix() {
        let guard = guard();
        let body = br#"{"ok":true}"#;
        let sig = sign(body);
        guard.verify_hmac(body, &sig).unwrap();
        guard.verify_hmac(body, &format!("sha256={sig}")).unwrap();
    }

    #[test]
    fn tampered_body_fails_signature() {
        let guard = guard();
        let sig = sign(b"original");
        let err = guard.verify_hmac(b"tampered", &sig).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn stale_timestamp_is_rejected() {
        let guard = guard();
        let old = Utc::now().timestamp() - 10_000;
        let err = guard
            .verify_timestamp_and_nonce(old, "nonce-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn replayed_nonce_is_a_conflict() {
        let guard = guard();
        let now = Utc::now().timestamp();
        guard.verify_timestamp_and_nonce(now, "nonce-2").await.unwrap();
        let err = guard
            .verify_timestamp_and_nonce(now, "nonce-2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn rate_limit_trips_past_max_plus_burst() {
        let guard = guard();
        for _ in 0..4 {
            guard.enforce_rate_limit("epr").await.unwrap();
        }
        let err = guard.enforce_rate_limit("epr").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_reports_false() {
        let guard = guard();
        assert!(guard.enforce_idempotency("abc").await.unwrap());
        assert!(!guard.enforce_idempotency("abc").await.unwrap());
    }

    #[tokio::test]
    async fn full_gate_accepts_then_rejects_duplicate() {
        let guard = guard();
        let body = br#"{"event":"obs"}"#;
        let headers = DeliveryHeaders {
            signature: Some(sign(body)),
            timestamp: Some(Utc::now().timestamp()),
            nonce: Some("nonce-3".to_string()),
            source_system: Some("EPR".to_string()),
            idempotency_key: Some("delivery-1".to_string()),
        };
        guard.validate_delivery(&headers, body).await.unwrap();

        let replayed = DeliveryHeaders {
            nonce: Some("nonce-4".to_string()),
            ..headers
        };
        let err = guard.validate_delivery(&replayed, body).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
