//! GraphQL transport
//!
//! A thin client that posts `{query, variables}` documents and unwraps the
//! `{data, errors}` envelope. Entity-specific operations live in sibling
//! modules and build on [`GraphqlClient::execute`].

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::GatewayError;
use crate::config::BackendConfig;
use crate::listing::ListQuery;
use crate::models::{Page, PageInfo};

#[derive(Serialize)]
struct GraphqlRequest<'a, V> {
    query: &'a str,
    #[serde(rename = "operationName")]
    operation_name: &'a str,
    variables: V,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Deserialize)]
struct GraphqlErrorEntry {
    #[serde(default)]
    message: String,
}

/// Relay-style connection as returned by list queries
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
    #[serde(default)]
    pub total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Edge<T> {
    pub node: T,
}

impl<T> From<Connection<T>> for Page<T> {
    fn from(connection: Connection<T>) -> Self {
        Page {
            items: connection.edges.into_iter().map(|edge| edge.node).collect(),
            page_info: connection.page_info,
            total_count: connection.total_count,
        }
    }
}

/// Variables shared by the list queries
///
/// `kind_field` names the category-like filter in the API's filter input.
pub(crate) fn list_variables(query: &ListQuery, kind_field: &str) -> Value {
    let mut filter = Map::new();
    if let Some(search) = &query.search {
        filter.insert("search".to_string(), json!(search));
    }
    if let Some(status) = query.status {
        filter.insert("status".to_string(), json!(status));
    }
    if let Some(kind) = &query.kind {
        filter.insert(kind_field.to_string(), json!(kind));
    }
    if let Some(tag) = &query.tag {
        filter.insert("tagId".to_string(), json!(tag));
    }
    filter.insert("includeArchived".to_string(), json!(query.include_archived));

    json!({
        "filter": filter,
        "sort": {
            "field": query.sort_field,
            "direction": query.sort_direction,
        },
        "first": query.first,
        "after": query.after,
    })
}

/// Client for the content GraphQL API
#[derive(Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl std::fmt::Debug for GraphqlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlClient")
            .field("endpoint", &self.endpoint)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl GraphqlClient {
    pub fn new(config: &BackendConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("newsroom/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Run one operation and return its `data`
    pub async fn execute<V, T>(
        &self,
        operation_name: &str,
        query: &str,
        variables: V,
    ) -> Result<T, GatewayError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let mut request = self.http.post(&self.endpoint).json(&GraphqlRequest {
            query,
            operation_name,
            variables,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(operation = operation_name, status = status.as_u16(), "GraphQL request failed");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphqlResponse<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("{}: {}", operation_name, e)))?;

        if !envelope.errors.is_empty() {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            tracing::warn!(operation = operation_name, errors = ?messages, "GraphQL operation returned errors");
            return Err(GatewayError::Graphql(messages));
        }

        envelope
            .data
            .ok_or_else(|| GatewayError::Decode(format!("{}: response has no data", operation_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Ping {
        ping: String,
    }

    async fn client(server: &MockServer, token: Option<&str>) -> GraphqlClient {
        GraphqlClient::new(&BackendConfig {
            endpoint: format!("{}/graphql", server.uri()),
            token: token.map(str::to_string),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_execute_unwraps_data_and_sends_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer t0k"))
            .and(body_partial_json(json!({"operationName": "Ping", "variables": {"n": 1}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ping": "pong"}})))
            .expect(1)
            .mount(&server)
            .await;

        let ping: Ping = client(&server, Some("t0k"))
            .await
            .execute("Ping", "query Ping { ping }", json!({"n": 1}))
            .await
            .unwrap();
        assert_eq!(ping.ping, "pong");
    }

    #[tokio::test]
    async fn test_execute_surfaces_graphql_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{"message": "Title is required"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .await
            .execute::<_, Ping>("Ping", "query Ping { ping }", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Title is required");
    }

    #[tokio::test]
    async fn test_execute_maps_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .await
            .execute::<_, Ping>("Ping", "query Ping { ping }", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 503, .. }));
    }

    #[test]
    fn test_list_variables_skip_unset_filters() {
        let query = ListQuery {
            search: Some("gala".to_string()),
            kind: Some("bar".to_string()),
            after: Some("c2".to_string()),
            ..ListQuery::default()
        };
        let variables = list_variables(&query, "venueType");
        assert_eq!(
            variables,
            json!({
                "filter": {"search": "gala", "venueType": "bar", "includeArchived": false},
                "sort": {"field": "createdAt", "direction": "DESC"},
                "first": 20,
                "after": "c2"
            })
        );
    }

    #[test]
    fn test_connection_converts_to_page() {
        let connection: Connection<Ping> = serde_json::from_value(json!({
            "edges": [{"node": {"ping": "a"}}, {"node": {"ping": "b"}}],
            "pageInfo": {"hasNextPage": true, "endCursor": "c2"},
            "totalCount": 7
        }))
        .unwrap();
        let page: Page<Ping> = connection.into();
        assert_eq!(page.len(), 2);
        assert_eq!(page.next_cursor(), Some("c2"));
        assert_eq!(page.total_count, Some(7));
    }
}
