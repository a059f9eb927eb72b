//! News article operations over GraphQL

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::graphql::{list_variables, Connection, GraphqlClient};
use super::{GatewayError, NewsApi};
use crate::listing::ListQuery;
use crate::models::{NewsArticle, NewsInput, Page};

const NEWS_FIELDS: &str = r#"
fragment NewsFields on NewsArticle {
  id
  title
  summary
  body
  author
  categoryIds
  tagIds
  publishedMarkets
  image
  sourceUrl
  status
  createdAt
  updatedAt
}
"#;

const LIST_NEWS: &str = r#"
query ListNews($filter: NewsFilterInput, $sort: SortInput, $first: Int, $after: String) {
  newsArticles(filter: $filter, sort: $sort, first: $first, after: $after) {
    edges { node { ...NewsFields } }
    pageInfo { hasNextPage endCursor }
    totalCount
  }
}
"#;

const GET_NEWS: &str = r#"
query GetNews($id: ID!) {
  newsArticle(id: $id) { ...NewsFields }
}
"#;

const CREATE_NEWS: &str = r#"
mutation CreateNews($input: NewsArticleInput!) {
  createNewsArticle(input: $input) { ...NewsFields }
}
"#;

const UPDATE_NEWS: &str = r#"
mutation UpdateNews($id: ID!, $input: NewsArticleInput!) {
  updateNewsArticle(id: $id, input: $input) { ...NewsFields }
}
"#;

const DELETE_NEWS: &str = r#"
mutation DeleteNews($id: ID!) {
  deleteNewsArticle(id: $id)
}
"#;

const REMOVE_NEWS_IMAGE: &str = r#"
mutation RemoveNewsImage($id: ID!) {
  removeNewsArticleImage(id: $id)
}
"#;

fn document(operation: &str) -> String {
    format!("{}{}", operation, NEWS_FIELDS)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListData {
    news_articles: Connection<NewsArticle>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetData {
    news_article: Option<NewsArticle>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    create_news_article: NewsArticle,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateData {
    update_news_article: Option<NewsArticle>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteData {
    delete_news_article: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveImageData {
    remove_news_article_image: bool,
}

#[async_trait]
impl NewsApi for GraphqlClient {
    async fn list_news(&self, query: &ListQuery) -> Result<Page<NewsArticle>, GatewayError> {
        let data: ListData = self
            .execute("ListNews", &document(LIST_NEWS), list_variables(query, "categoryId"))
            .await?;
        Ok(data.news_articles.into())
    }

    async fn get_news(&self, id: &str) -> Result<Option<NewsArticle>, GatewayError> {
        let data: GetData = self
            .execute("GetNews", &document(GET_NEWS), json!({ "id": id }))
            .await?;
        Ok(data.news_article)
    }

    async fn create_news(&self, input: &NewsInput) -> Result<NewsArticle, GatewayError> {
        let data: CreateData = self
            .execute("CreateNews", &document(CREATE_NEWS), json!({ "input": input }))
            .await?;
        tracing::info!(id = %data.create_news_article.id, "Created news article");
        Ok(data.create_news_article)
    }

    async fn update_news(&self, id: &str, input: &NewsInput) -> Result<NewsArticle, GatewayError> {
        let data: UpdateData = self
            .execute(
                "UpdateNews",
                &document(UPDATE_NEWS),
                json!({ "id": id, "input": input }),
            )
            .await?;
        let article = data
            .update_news_article
            .ok_or_else(|| GatewayError::NotFound(format!("News article {}", id)))?;
        tracing::info!(id = %article.id, "Updated news article");
        Ok(article)
    }

    async fn delete_news(&self, id: &str) -> Result<(), GatewayError> {
        let data: DeleteData = self
            .execute("DeleteNews", DELETE_NEWS, json!({ "id": id }))
            .await?;
        if !data.delete_news_article {
            return Err(GatewayError::NotFound(format!("News article {}", id)));
        }
        tracing::info!(id = %id, "Deleted news article");
        Ok(())
    }

    async fn remove_news_image(&self, id: &str) -> Result<(), GatewayError> {
        let data: RemoveImageData = self
            .execute("RemoveNewsImage", REMOVE_NEWS_IMAGE, json!({ "id": id }))
            .await?;
        if !data.remove_news_article_image {
            return Err(GatewayError::NotFound(format!("Image of news article {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::models::ContentStatus;
    use serde_json::Value;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn article_json(id: &str, title: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "summary": null,
            "categoryIds": ["c1"],
            "tagIds": [],
            "publishedMarkets": ["miami"],
            "image": "news/cover.png",
            "status": "DRAFT",
            "createdAt": "2026-01-05T10:00:00Z",
            "updatedAt": "2026-01-05T10:00:00Z"
        })
    }

    fn client(server: &MockServer) -> GraphqlClient {
        GraphqlClient::new(&BackendConfig {
            endpoint: server.uri(),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_news_sends_filters_and_maps_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "operationName": "ListNews",
                "variables": {
                    "filter": {"status": "APPROVED", "search": "gala"},
                    "sort": {"field": "createdAt", "direction": "DESC"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"newsArticles": {
                    "edges": [{"node": article_json("n1", "Gala night")}],
                    "pageInfo": {"hasNextPage": false, "endCursor": null},
                    "totalCount": 1
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = ListQuery {
            search: Some("gala".to_string()),
            status: Some(ContentStatus::Approved),
            ..ListQuery::default()
        };
        let page = client(&server).list_news(&query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.items[0].title, "Gala night");
        assert!(!page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn test_create_news_posts_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "operationName": "CreateNews",
                "variables": {"input": {"title": "Test Article", "image": "placeholders/default.png"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"createNewsArticle": article_json("n9", "Test Article")}
            })))
            .mount(&server)
            .await;

        let input = NewsInput {
            title: Some("Test Article".to_string()),
            image: Some("placeholders/default.png".to_string()),
            ..NewsInput::default()
        };
        let article = client(&server).create_news(&input).await.unwrap();
        assert_eq!(article.id, "n9");
    }

    #[tokio::test]
    async fn test_get_missing_news_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"newsArticle": null}})),
            )
            .mount(&server)
            .await;

        assert!(client(&server).get_news("gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reported_false_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"deleteNewsArticle": false}})),
            )
            .mount(&server)
            .await;

        let err = client(&server).delete_news("n1").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }
}
