//! Supabase Storage bucket bootstrap.
//!
//! Creates the buckets the backend stores documents in, through the
//! Storage REST API with the service-role key. Idempotent: a bucket
//! that already exists counts as ready, so the setup can run on every
//! deployment.

use serde::Serialize;
use serde_json::{Value, json};

use guiasmei_core::config::SupabaseConfig;
use guiasmei_core::error::{GuiasMeiError, Result};

/// Buckets the backend expects, with their content descriptions.
pub const BUCKET_SPECS: [(&str, &str); 3] = [
    ("pdf-gps", "PDFs de guias GPS"),
    ("certificados", "Certificados PFX dos contribuintes"),
    ("danfse", "DANFSe de notas fiscais"),
];

/// What happened to one bucket during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketOutcome {
    Created,
    AlreadyExists,
    Failed(String),
}

/// Setup result for one bucket.
#[derive(Debug, Clone, Serialize)]
pub struct BucketSetup {
    pub bucket: &'static str,
    pub outcome: BucketOutcome,
}

impl BucketSetup {
    pub fn ready(&self) -> bool {
        !matches!(self.outcome, BucketOutcome::Failed(_))
    }
}

/// All buckets are private; access policies live in the database, not
/// in this payload.
fn bucket_payload(name: &str) -> Value {
    json!({ "name": name, "public": false })
}

/// 200/201 create the bucket. Storage answers 400 with an
/// "already exists" message when the bucket is already there, which is
/// success for an idempotent setup.
fn interpret_create_response(status: u16, body: &str) -> BucketOutcome {
    match status {
        200 | 201 => BucketOutcome::Created,
        400 if body.contains("already exists") => BucketOutcome::AlreadyExists,
        _ => {
            let snippet: String = body.chars().take(200).collect();
            BucketOutcome::Failed(format!("falhou (status {status}): {snippet}"))
        }
    }
}

#[derive(Debug)]
pub struct StorageBootstrap {
    client: reqwest::Client,
    storage_url: String,
    service_key: String,
}

impl StorageBootstrap {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(GuiasMeiError::Config(
                "Supabase URL and service key not configured".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Ok(Self {
            client,
            storage_url: format!("{}/storage/v1", config.url.trim_end_matches('/')),
            service_key: config.service_key.clone(),
        })
    }

    /// Create every expected bucket. Failures are reported per bucket,
    /// never short-circuited, so one bad bucket does not hide the rest.
    pub async fn ensure_buckets(&self) -> Vec<BucketSetup> {
        let mut results = Vec::with_capacity(BUCKET_SPECS.len());
        for (bucket, description) in BUCKET_SPECS {
            tracing::debug!("creating bucket '{bucket}' ({description})");
            let outcome = self.create_bucket(bucket).await;
            match &outcome {
                BucketOutcome::Created => tracing::info!("✅ Bucket '{bucket}' created"),
                BucketOutcome::AlreadyExists => {
                    tracing::debug!("bucket '{bucket}' already exists");
                }
                BucketOutcome::Failed(reason) => {
                    tracing::warn!("⚠️ Bucket '{bucket}' setup failed: {reason}");
                }
            }
            results.push(BucketSetup { bucket, outcome });
        }
        results
    }

    async fn create_bucket(&self, name: &str) -> BucketOutcome {
        let response = self
            .client
            .post(format!("{}/buckets", self.storage_url))
            .header("Authorization", format!("Bearer {}", self.service_key))
            .json(&bucket_payload(name))
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                let text = response.text().await.unwrap_or_default();
                interpret_create_response(status, &text)
            }
            Err(e) => BucketOutcome::Failed(format!("erro de rede: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_specs_cover_the_document_stores() {
        let names: Vec<&str> = BUCKET_SPECS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["pdf-gps", "certificados", "danfse"]);
    }

    #[test]
    fn test_bucket_payload_is_private() {
        let payload = bucket_payload("pdf-gps");
        assert_eq!(payload["name"], "pdf-gps");
        assert_eq!(payload["public"], false);
    }

    #[test]
    fn test_interpret_created() {
        assert_eq!(interpret_create_response(201, ""), BucketOutcome::Created);
        assert_eq!(interpret_create_response(200, "{}"), BucketOutcome::Created);
    }

    #[test]
    fn test_existing_bucket_counts_as_ready() {
        let outcome = interpret_create_response(400, r#"{"error":"Bucket already exists"}"#);
        assert_eq!(outcome, BucketOutcome::AlreadyExists);
        assert!(BucketSetup { bucket: "pdf-gps", outcome }.ready());
    }

    #[test]
    fn test_rejection_is_a_per_bucket_failure() {
        let outcome = interpret_create_response(403, "new row violates row-level security policy");
        let BucketOutcome::Failed(reason) = &outcome else {
            panic!("expected a failure outcome");
        };
        assert!(reason.contains("status 403"));
        assert!(!BucketSetup { bucket: "danfse", outcome: outcome.clone() }.ready());
    }

    #[test]
    fn test_new_requires_credentials() {
        let err = StorageBootstrap::new(&SupabaseConfig::default()).unwrap_err();
        assert!(matches!(err, GuiasMeiError::Config(_)));
    }

    #[test]
    fn test_storage_url_strips_trailing_slash() {
        let config = SupabaseConfig {
            url: "https://project.supabase.co/".into(),
            service_key: "service-key".into(),
            anon_key: "anon-key".into(),
        };
        let bootstrap = StorageBootstrap::new(&config).unwrap();
        assert_eq!(bootstrap.storage_url, "https://project.supabase.co/storage/v1");
    }
}
