//! Helm release clients
//!
//! Helm stores every release revision as a Secret or ConfigMap labelled
//! `owner=helm,name=<release>`. The record's `release` key holds the release
//! as base64 encoded, gzip compressed JSON.

use super::types::{HelmRelease, ReleaseDriver};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use flate2::read::GzDecoder;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{Api, ListParams};
use kube::Client;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

const RELEASE_KEY: &str = "release";
const RELEASE_SECRET_TYPE: &str = "helm.sh/release.v1";
const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Read access to the releases of one namespace
#[async_trait]
pub trait ReleaseReader: Send + Sync {
    /// Latest revision of the named release, `None` if it does not exist
    async fn latest(&self, name: &str) -> Result<Option<HelmRelease>>;
}

/// Creates namespace-scoped release readers for a storage driver
pub trait ReleaseClientProducer: Send + Sync {
    fn produce(&self, driver: &str, namespace: &str) -> Result<Arc<dyn ReleaseReader>>;
}

/// Decode the `release` payload of a Helm storage record
pub fn decode_release(encoded: &[u8]) -> Result<HelmRelease> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| Error::internal(format!("Invalid base64 in Helm release record: {}", e)))?;

    let json = if raw.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut out)
            .map_err(|e| Error::io(e, "while decompressing Helm release record"))?;
        out
    } else {
        raw
    };

    serde_json::from_slice(&json)
        .map_err(|e| Error::serialization(e, "while decoding Helm release record"))
}

/// Pick the highest revision out of a release's records
fn latest_of(records: impl IntoIterator<Item = Result<HelmRelease>>) -> Option<HelmRelease> {
    records
        .into_iter()
        .filter_map(|record| match record {
            Ok(release) => Some(release),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable Helm release record");
                None
            }
        })
        .max_by_key(|release| release.version)
}

/// Produces readers backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeReleaseClientProducer {
    client: Client,
}

impl KubeReleaseClientProducer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Discover cluster configuration from the environment.
    ///
    /// Tries the in-cluster service account first, then `KUBECONFIG` and
    /// `~/.kube/config`.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| Error::kube(e, "while creating Kubernetes client"))?;
        debug!("Kubernetes client initialized");
        Ok(Self::new(client))
    }
}

impl ReleaseClientProducer for KubeReleaseClientProducer {
    fn produce(&self, driver: &str, namespace: &str) -> Result<Arc<dyn ReleaseReader>> {
        let driver: ReleaseDriver = driver.parse().map_err(Error::config)?;
        Ok(Arc::new(KubeReleaseReader {
            client: self.client.clone(),
            namespace: namespace.to_string(),
            driver,
        }))
    }
}

pub struct KubeReleaseReader {
    client: Client,
    namespace: String,
    driver: ReleaseDriver,
}

impl KubeReleaseReader {
    fn list_params(name: &str) -> ListParams {
        ListParams::default().labels(&format!("owner=helm,name={}", name))
    }

    fn secret_list_params(name: &str) -> ListParams {
        Self::list_params(name).fields(&format!("type={}", RELEASE_SECRET_TYPE))
    }

    async fn from_secrets(&self, name: &str) -> Result<Option<HelmRelease>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api.list(&Self::secret_list_params(name)).await.map_err(|e| {
            Error::kube(e, format!("while listing Helm release secrets in {}", self.namespace))
        })?;

        Ok(latest_of(list.items.into_iter().filter_map(|secret| {
            let data = secret.data?;
            let payload = data.get(RELEASE_KEY)?;
            Some(decode_release(&payload.0))
        })))
    }

    async fn from_config_maps(&self, name: &str) -> Result<Option<HelmRelease>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api.list(&Self::list_params(name)).await.map_err(|e| {
            Error::kube(e, format!("while listing Helm release config maps in {}", self.namespace))
        })?;

        Ok(latest_of(list.items.into_iter().filter_map(|config_map| {
            let data = config_map.data?;
            let payload = data.get(RELEASE_KEY)?;
            Some(decode_release(payload.as_bytes()))
        })))
    }
}

#[async_trait]
impl ReleaseReader for KubeReleaseReader {
    async fn latest(&self, name: &str) -> Result<Option<HelmRelease>> {
        debug!(release = %name, namespace = %self.namespace, driver = %self.driver, "Fetching Helm release");
        match self.driver {
            ReleaseDriver::Secrets => self.from_secrets(name).await,
            ReleaseDriver::ConfigMaps => self.from_config_maps(name).await,
        }
    }
}

/// Release reader over a fixed set of releases of one namespace
#[derive(Debug, Clone, Default)]
pub struct InMemoryReleaseClient {
    releases: Vec<HelmRelease>,
}

impl InMemoryReleaseClient {
    pub fn new(releases: Vec<HelmRelease>) -> Self {
        Self { releases }
    }
}

#[async_trait]
impl ReleaseReader for InMemoryReleaseClient {
    async fn latest(&self, name: &str) -> Result<Option<HelmRelease>> {
        Ok(latest_of(self.releases.iter().filter(|r| r.name == name).cloned().map(Ok)))
    }
}

/// Producer handing out [`InMemoryReleaseClient`]s, keyed by namespace.
///
/// Remembers every driver it was asked for so callers can assert on driver
/// selection.
#[derive(Debug, Default)]
pub struct InMemoryReleaseClientProducer {
    releases: HashMap<String, Vec<HelmRelease>>,
    requested_drivers: Mutex<Vec<String>>,
}

impl InMemoryReleaseClientProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(mut self, release: HelmRelease) -> Self {
        self.releases.entry(release.namespace.clone()).or_default().push(release);
        self
    }

    pub fn requested_drivers(&self) -> Vec<String> {
        self.requested_drivers.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl ReleaseClientProducer for InMemoryReleaseClientProducer {
    fn produce(&self, driver: &str, namespace: &str) -> Result<Arc<dyn ReleaseReader>> {
        if let Ok(mut drivers) = self.requested_drivers.lock() {
            drivers.push(driver.to_string());
        }
        let releases = self.releases.get(namespace).cloned().unwrap_or_default();
        Ok(Arc::new(InMemoryReleaseClient::new(releases)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::types::{HelmChart, HelmChartMetadata};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn release(name: &str, version: i32, chart_version: &str) -> HelmRelease {
        HelmRelease {
            name: name.into(),
            namespace: "default".into(),
            version,
            chart: HelmChart {
                metadata: HelmChartMetadata {
                    name: "postgresql".into(),
                    version: chart_version.into(),
                },
            },
        }
    }

    fn encode(json: &str, gzip: bool) -> Vec<u8> {
        let raw = if gzip {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(json.as_bytes()).unwrap();
            encoder.finish().unwrap()
        } else {
            json.as_bytes().to_vec()
        };
        base64::engine::general_purpose::STANDARD.encode(raw).into_bytes()
    }

    const RELEASE_JSON: &str = r#"{
        "name": "psql",
        "namespace": "default",
        "version": 2,
        "info": {"status": "deployed"},
        "chart": {"metadata": {"name": "postgresql", "version": "10.2.0", "apiVersion": "v2"}},
        "manifest": "---"
    }"#;

    #[test]
    fn test_decode_gzipped_release() {
        let decoded = decode_release(&encode(RELEASE_JSON, true)).unwrap();
        assert_eq!(decoded, release("psql", 2, "10.2.0"));
    }

    #[test]
    fn test_decode_plain_release() {
        let decoded = decode_release(&encode(RELEASE_JSON, false)).unwrap();
        assert_eq!(decoded.chart.metadata.version, "10.2.0");
    }

    #[test]
    fn test_decode_invalid_payload() {
        assert!(decode_release(b"%%%").is_err());
        assert!(decode_release(&encode("not json", true)).is_err());
    }

    #[tokio::test]
    async fn test_in_memory_client_returns_latest_revision() {
        let client = InMemoryReleaseClient::new(vec![
            release("psql", 1, "10.1.0"),
            release("psql", 3, "10.3.0"),
            release("psql", 2, "10.2.0"),
            release("redis", 7, "1.0.0"),
        ]);

        let latest = client.latest("psql").await.unwrap().unwrap();
        assert_eq!(latest.version, 3);
        assert!(client.latest("missing").await.unwrap().is_none());
    }

    #[test]
    fn test_release_list_selectors() {
        let params = KubeReleaseReader::list_params("psql");
        assert_eq!(params.label_selector.as_deref(), Some("owner=helm,name=psql"));
        assert_eq!(params.field_selector, None);

        let params = KubeReleaseReader::secret_list_params("psql");
        assert_eq!(params.label_selector.as_deref(), Some("owner=helm,name=psql"));
        assert_eq!(params.field_selector.as_deref(), Some("type=helm.sh/release.v1"));
    }

    #[test]
    fn test_in_memory_producer_records_drivers() {
        let producer = InMemoryReleaseClientProducer::new().with_release(release("psql", 1, "1"));
        producer.produce("secrets", "default").unwrap();
        producer.produce("configmaps", "other").unwrap();
        assert_eq!(producer.requested_drivers(), vec!["secrets", "configmaps"]);
    }
}
