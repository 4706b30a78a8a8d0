//! Types shared by the Helm release storage backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Request context understood by the release storage backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseContext {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub chart_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

/// Value returned for a release-backed TypeInstance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDetails {
    pub name: String,
    pub namespace: String,
    pub chart: ChartDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDetails {
    pub name: String,
    pub version: String,
    pub repo: String,
}

/// The part of a Helm storage record the backend reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmRelease {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub version: i32,
    pub chart: HelmChart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmChart {
    pub metadata: HelmChartMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmChartMetadata {
    pub name: String,
    pub version: String,
}

impl ReleaseDetails {
    /// Project a release onto the value exposed to TypeInstance consumers
    pub fn from_release(release: &HelmRelease, chart_location: &str) -> Self {
        Self {
            name: release.name.clone(),
            namespace: release.namespace.clone(),
            chart: ChartDetails {
                name: release.chart.metadata.name.clone(),
                version: release.chart.metadata.version.clone(),
                repo: chart_location.to_string(),
            },
        }
    }
}

/// Where Helm keeps its release records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseDriver {
    Secrets,
    ConfigMaps,
}

impl ReleaseDriver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secrets => "secrets",
            Self::ConfigMaps => "configmaps",
        }
    }
}

impl FromStr for ReleaseDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "secret" | "secrets" => Ok(Self::Secrets),
            "configmap" | "configmaps" => Ok(Self::ConfigMaps),
            _ => Err(format!("unsupported Helm storage driver {:?}", s)),
        }
    }
}

impl fmt::Display for ReleaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
