//! PostgREST-style table access.
//!
//! A [`Query`] names a table plus filters, ordering, and a limit; a [`Rest`]
//! handle sends it with the credentials of one access level.

use std::fmt::Display;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::client::BackendClient;
use super::orders::OrderRepository;
use super::products::ProductRepository;
use super::users::UserRepository;
use super::{ApiErrorBody, BackendError, UNIQUE_VIOLATION};

/// Table query: filters, ordering, and limit rendered as URL parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: &'static str,
    params: Vec<(String, String)>,
}

impl Query {
    /// Start a query on `table`.
    #[must_use]
    pub const fn table(table: &'static str) -> Self {
        Self {
            table,
            params: Vec::new(),
        }
    }

    /// Columns to return, including embedded relations (`*,product_master(*)`).
    #[must_use]
    pub fn select(self, columns: &str) -> Self {
        self.param("select", columns)
    }

    /// `column = value`
    #[must_use]
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{value}"))
    }

    /// `column <> value`
    #[must_use]
    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("neq.{value}"))
    }

    /// `column >= value`
    #[must_use]
    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("gte.{value}"))
    }

    /// `column < value`
    #[must_use]
    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("lt.{value}"))
    }

    /// `column IN (values...)`
    #[must_use]
    pub fn is_in<T: Display>(self, column: &str, values: &[T]) -> Self {
        let list = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.param(column, format!("in.({list})"))
    }

    /// Sort by `column`.
    #[must_use]
    pub fn order(self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.param("order", format!("{column}.{direction}"))
    }

    /// Return at most `n` rows.
    #[must_use]
    pub fn limit(self, n: usize) -> Self {
        self.param("limit", n.to_string())
    }

    /// The table this query targets.
    #[must_use]
    pub const fn table_name(&self) -> &'static str {
        self.table
    }

    /// Rendered URL parameters, in insertion order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }
}

/// REST handle bound to one access level.
#[derive(Clone, Copy)]
pub struct Rest<'a> {
    client: &'a BackendClient,
    api_key: &'a str,
    bearer: &'a str,
}

impl<'a> Rest<'a> {
    pub(crate) const fn new(client: &'a BackendClient, api_key: &'a str, bearer: &'a str) -> Self {
        Self {
            client,
            api_key,
            bearer,
        }
    }

    /// Catalog queries.
    #[must_use]
    pub const fn products(self) -> ProductRepository<'a> {
        ProductRepository::new(self)
    }

    /// Profile queries.
    #[must_use]
    pub const fn users(self) -> UserRepository<'a> {
        UserRepository::new(self)
    }

    /// Order and payment queries.
    #[must_use]
    pub const fn orders(self) -> OrderRepository<'a> {
        OrderRepository::new(self)
    }

    pub(crate) const fn client(&self) -> &'a BackendClient {
        self.client
    }

    /// Fetch all rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or rows do not decode as `T`.
    #[instrument(skip(self, query), fields(table = query.table))]
    pub async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, BackendError> {
        let response = self.request(Method::GET, query)?.send().await?;
        let response = check(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to decode rows"
            );
            BackendError::Parse(e)
        })
    }

    /// Fetch the first row matching `query`, if any.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn fetch_optional<T: DeserializeOwned>(
        &self,
        query: Query,
    ) -> Result<Option<T>, BackendError> {
        let rows = self.fetch::<T>(&query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Fetch exactly one row, failing with `NotFound` when none match.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if no row matches.
    pub async fn fetch_one<T: DeserializeOwned>(&self, query: Query) -> Result<T, BackendError> {
        let table = query.table;
        self.fetch_optional(query)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("no matching row in {table}")))
    }

    /// Exact number of rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the count header is missing.
    #[instrument(skip(self, query), fields(table = query.table))]
    pub async fn count(&self, query: &Query) -> Result<u64, BackendError> {
        let response = self
            .request(Method::HEAD, query)?
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = check(response).await?;
        let total = response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| BackendError::Api {
                status: response.status().as_u16(),
                code: None,
                message: "missing Content-Range total".to_string(),
            })?;
        debug!(total, "Counted rows");
        Ok(total)
    }

    /// Insert one row or an array of rows.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` on a duplicate key.
    #[instrument(skip(self, body))]
    pub async fn insert<B: Serialize + ?Sized>(
        &self,
        table: &'static str,
        body: &B,
    ) -> Result<(), BackendError> {
        let response = self
            .request(Method::POST, &Query::table(table))?
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Insert and return the stored rows.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` on a duplicate key.
    #[instrument(skip(self, body))]
    pub async fn insert_returning<B, T>(
        &self,
        table: &'static str,
        body: &B,
    ) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, &Query::table(table))?
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    /// Patch every row matching `query`. Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, query, body), fields(table = query.table))]
    pub async fn update<B: Serialize + ?Sized>(
        &self,
        query: &Query,
        body: &B,
    ) -> Result<usize, BackendError> {
        let response = self
            .request(Method::PATCH, query)?
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let response = check(response).await?;
        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(rows.len())
    }

    /// Delete every row matching `query`. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, query), fields(table = query.table))]
    pub async fn delete(&self, query: &Query) -> Result<usize, BackendError> {
        let response = self
            .request(Method::DELETE, query)?
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let response = check(response).await?;
        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(rows.len())
    }

    fn request(&self, method: Method, query: &Query) -> Result<RequestBuilder, BackendError> {
        let mut url = self.client.endpoint(&["rest", "v1", query.table])?;
        if !query.params.is_empty() {
            url.query_pairs_mut().extend_pairs(query.params.iter());
        }
        Ok(self
            .client
            .http()
            .request(method, url)
            .headers(self.headers()))
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(self.api_key) {
            headers.insert("apikey", value);
        }
        if let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {}", self.bearer)) {
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        headers
    }
}

/// Map a non-success response to a `BackendError`.
pub(crate) async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // Check for rate limiting
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(BackendError::RateLimited(retry_after));
    }

    let text = response.text().await.unwrap_or_default();
    let body = ApiErrorBody::parse(&text);
    let code = body.code();
    let message = body.summary();

    tracing::warn!(
        status = %status,
        code = code.as_deref().unwrap_or(""),
        message = %message,
        "Backend returned non-success status"
    );

    Err(match status {
        StatusCode::CONFLICT => BackendError::Conflict(message),
        _ if code.as_deref() == Some(UNIQUE_VIOLATION) => BackendError::Conflict(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        _ => BackendError::Api {
            status: status.as_u16(),
            code,
            message,
        },
    })
}

/// Parse the total from `Content-Range: 0-24/573` or `*/0`.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_renders_postgrest_params() {
        let query = Query::table("sales_order")
            .select("*,sales_order_details(*,product_master(*))")
            .eq("user_id", "abc")
            .order("order_date", false)
            .limit(5);

        assert_eq!(query.table_name(), "sales_order");
        assert_eq!(
            query.params(),
            &[
                (
                    "select".to_string(),
                    "*,sales_order_details(*,product_master(*))".to_string()
                ),
                ("user_id".to_string(), "eq.abc".to_string()),
                ("order".to_string(), "order_date.desc".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_range_and_in_filters() {
        let query = Query::table("product_master")
            .gte("product_price", 50)
            .lt("product_price", 100)
            .neq("product_no", 0)
            .is_in("product_no", &[1, 2, 3]);
        let values: Vec<&str> = query.params().iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(values, vec!["gte.50", "lt.100", "neq.0", "in.(1,2,3)"]);
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/573"), Some(573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
