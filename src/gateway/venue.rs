//! Venue operations over GraphQL

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::graphql::{list_variables, Connection, GraphqlClient};
use super::{GatewayError, VenueApi};
use crate::listing::ListQuery;
use crate::models::{Page, Venue, VenueInput};

const VENUE_FIELDS: &str = r#"
fragment VenueFields on Venue {
  id
  name
  venueType
  market
  address
  city
  tagIds
  description
  websiteUrl
  phone
  image
  status
  createdAt
  updatedAt
}
"#;

const LIST_VENUES: &str = r#"
query ListVenues($filter: VenueFilterInput, $sort: SortInput, $first: Int, $after: String) {
  venues(filter: $filter, sort: $sort, first: $first, after: $after) {
    edges { node { ...VenueFields } }
    pageInfo { hasNextPage endCursor }
    totalCount
  }
}
"#;

const GET_VENUE: &str = r#"
query GetVenue($id: ID!) {
  venue(id: $id) { ...VenueFields }
}
"#;

const CREATE_VENUE: &str = r#"
mutation CreateVenue($input: VenueInput!) {
  createVenue(input: $input) { ...VenueFields }
}
"#;

const UPDATE_VENUE: &str = r#"
mutation UpdateVenue($id: ID!, $input: VenueInput!) {
  updateVenue(id: $id, input: $input) { ...VenueFields }
}
"#;

const DELETE_VENUE: &str = r#"
mutation DeleteVenue($id: ID!) {
  deleteVenue(id: $id)
}
"#;

const REMOVE_VENUE_IMAGE: &str = r#"
mutation RemoveVenueImage($id: ID!) {
  removeVenueImage(id: $id)
}
"#;

fn document(operation: &str) -> String {
    format!("{}{}", operation, VENUE_FIELDS)
}

#[derive(Deserialize)]
struct ListData {
    venues: Connection<Venue>,
}

#[derive(Deserialize)]
struct GetData {
    venue: Option<Venue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    create_venue: Venue,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateData {
    update_venue: Option<Venue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteData {
    delete_venue: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveImageData {
    remove_venue_image: bool,
}

#[async_trait]
impl VenueApi for GraphqlClient {
    async fn list_venues(&self, query: &ListQuery) -> Result<Page<Venue>, GatewayError> {
        let data: ListData = self
            .execute("ListVenues", &document(LIST_VENUES), list_variables(query, "venueType"))
            .await?;
        Ok(data.venues.into())
    }

    async fn get_venue(&self, id: &str) -> Result<Option<Venue>, GatewayError> {
        let data: GetData = self
            .execute("GetVenue", &document(GET_VENUE), json!({ "id": id }))
            .await?;
        Ok(data.venue)
    }

    async fn create_venue(&self, input: &VenueInput) -> Result<Venue, GatewayError> {
        let data: CreateData = self
            .execute("CreateVenue", &document(CREATE_VENUE), json!({ "input": input }))
            .await?;
        tracing::info!(id = %data.create_venue.id, "Created venue");
        Ok(data.create_venue)
    }

    async fn update_venue(&self, id: &str, input: &VenueInput) -> Result<Venue, GatewayError> {
        let data: UpdateData = self
            .execute(
                "UpdateVenue",
                &document(UPDATE_VENUE),
                json!({ "id": id, "input": input }),
            )
            .await?;
        let venue = data
            .update_venue
            .ok_or_else(|| GatewayError::NotFound(format!("Venue {}", id)))?;
        tracing::info!(id = %venue.id, "Updated venue");
        Ok(venue)
    }

    async fn delete_venue(&self, id: &str) -> Result<(), GatewayError> {
        let data: DeleteData = self
            .execute("DeleteVenue", DELETE_VENUE, json!({ "id": id }))
            .await?;
        if !data.delete_venue {
            return Err(GatewayError::NotFound(format!("Venue {}", id)));
        }
        tracing::info!(id = %id, "Deleted venue");
        Ok(())
    }

    async fn remove_venue_image(&self, id: &str) -> Result<(), GatewayError> {
        let data: RemoveImageData = self
            .execute("RemoveVenueImage", REMOVE_VENUE_IMAGE, json!({ "id": id }))
            .await?;
        if !data.remove_venue_image {
            return Err(GatewayError::NotFound(format!("Image of venue {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GraphqlClient {
        GraphqlClient::new(&BackendConfig {
            endpoint: server.uri(),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_venues_filters_by_venue_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "operationName": "ListVenues",
                "variables": {
                    "filter": {"venueType": "bar", "includeArchived": true},
                    "sort": {"field": "name", "direction": "ASC"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"venues": {
                    "edges": [{"node": {
                        "id": "v1",
                        "name": "Blue Bar",
                        "venueType": "bar",
                        "market": "miami",
                        "status": "APPROVED",
                        "createdAt": "2026-02-01T00:00:00Z",
                        "updatedAt": "2026-02-01T00:00:00Z"
                    }}],
                    "pageInfo": {"hasNextPage": true, "endCursor": "v1"}
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = ListQuery {
            kind: Some("bar".to_string()),
            include_archived: true,
            sort_field: "name",
            sort_direction: crate::listing::SortDirection::Asc,
            ..ListQuery::default()
        };
        let page = client(&server).list_venues(&query).await.unwrap();
        assert_eq!(page.items[0].name, "Blue Bar");
        assert_eq!(page.next_cursor(), Some("v1"));
        assert_eq!(page.total_count, None);
    }

    #[tokio::test]
    async fn test_update_missing_venue_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"updateVenue": null}})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .update_venue("v404", &VenueInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }
}
