//! # Hub Client
//!
//! GraphQL client for the Hub lookups the policy metadata resolver needs:
//! the TypeRef of stored TypeInstances and the additional references of Types.

use crate::policy::HubClient;
use crate::types::TypeRef;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Hub request failures
#[derive(thiserror::Error, Debug)]
pub enum HubError {
    #[error("while building Hub HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("while calling Hub: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Hub responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Hub returned errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("Hub response does not contain data")]
    MissingData,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeInstanceNode {
    id: String,
    type_ref: TypeRef,
}

#[derive(Debug, Deserialize)]
struct TypesData {
    types: Vec<TypeNode>,
}

#[derive(Debug, Deserialize)]
struct TypeNode {
    path: String,
    #[serde(default)]
    revisions: Vec<TypeRevisionNode>,
}

#[derive(Debug, Deserialize)]
struct TypeRevisionNode {
    revision: String,
    spec: Option<TypeSpecNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeSpecNode {
    #[serde(default)]
    additional_refs: Option<Vec<String>>,
}

const LIST_TYPES_QUERY: &str = "query ListTypes($pathPattern: NodePath!) { \
    types(filter: { pathPattern: $pathPattern }) { \
        path revisions { revision spec { additionalRefs } } \
    } \
}";

/// Hub client speaking GraphQL over HTTP
#[derive(Debug, Clone)]
pub struct GraphQlHubClient {
    client: Client,
    endpoint: String,
}

impl GraphQlHubClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, HubError> {
        let client = Client::builder().timeout(timeout).build().map_err(HubError::Client)?;
        Ok(Self { client, endpoint: endpoint.into() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, HubError> {
        debug!(endpoint = %self.endpoint, "Sending Hub query");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HubError::Status { status: status.as_u16(), body });
        }

        let body: GraphQlResponse<T> = response.json().await?;
        if !body.errors.is_empty() {
            return Err(HubError::GraphQl(body.errors.into_iter().map(|e| e.message).collect()));
        }
        body.data.ok_or(HubError::MissingData)
    }
}

/// One aliased `typeInstance` field per ID, so all IDs go in a single request
fn find_type_instances_query(ids: &[String]) -> (String, Value) {
    let mut params = Vec::with_capacity(ids.len());
    let mut fields = Vec::with_capacity(ids.len());
    let mut variables = Map::new();

    for (idx, id) in ids.iter().enumerate() {
        params.push(format!("$id{}: ID!", idx));
        fields.push(format!("ti{idx}: typeInstance(id: $id{idx}) {{ id typeRef {{ path revision }} }}"));
        variables.insert(format!("id{}", idx), Value::String(id.clone()));
    }

    let query = format!(
        "query FindTypeInstancesTypeRef({}) {{ {} }}",
        params.join(", "),
        fields.join(" ")
    );
    (query, Value::Object(variables))
}

#[async_trait]
impl HubClient for GraphQlHubClient {
    async fn find_type_instances_type_ref(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, TypeRef>, HubError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let (query, variables) = find_type_instances_query(ids);
        let data: HashMap<String, Option<TypeInstanceNode>> = self.query(&query, variables).await?;

        Ok(data.into_values().flatten().map(|node| (node.id, node.type_ref)).collect())
    }

    async fn list_types_additional_refs(
        &self,
        path_pattern: &str,
    ) -> Result<HashMap<TypeRef, Vec<String>>, HubError> {
        let data: TypesData =
            self.query(LIST_TYPES_QUERY, json!({ "pathPattern": path_pattern })).await?;

        let mut refs = HashMap::new();
        for ty in data.types {
            for rev in ty.revisions {
                let additional_refs =
                    rev.spec.and_then(|spec| spec.additional_refs).unwrap_or_default();
                refs.insert(TypeRef::new(ty.path.clone(), rev.revision), additional_refs);
            }
        }
        Ok(refs)
    }
}
