use agora_core::CoreError;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CLIENT_NAME: &str = "agora";
const UNIQUE_VIOLATION: &str = "23505";
const NO_SINGLE_ROW: &str = "PGRST116";

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error ({status}): {message}")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("missing data: {0}")]
    MissingData(&'static str),
}

pub type Filter = (&'static str, String);

pub fn eq(column: &'static str, value: impl ToString) -> Filter {
    (column, format!("eq.{}", value.to_string()))
}

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(http: reqwest::Client, base_url: &str, anon_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            anon_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn select<T>(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&str>,
    ) -> Result<Vec<T>, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let query = select_query(filters, order);
        let response = self
            .request(Method::GET, &self.rest_url(table), None)
            .query(&query)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn insert<B, T>(
        &self,
        access_token: Option<&str>,
        table: &str,
        row: &B,
    ) -> Result<T, SupabaseError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, &self.rest_url(table), access_token)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let rows: Vec<T> = read_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or(SupabaseError::MissingData("inserted row"))
    }

    pub async fn update<B>(
        &self,
        access_token: Option<&str>,
        table: &str,
        filters: &[Filter],
        patch: &B,
    ) -> Result<(), SupabaseError>
    where
        B: Serialize,
    {
        let response = self
            .request(Method::PATCH, &self.rest_url(table), access_token)
            .query(filters)
            .json(patch)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn delete(
        &self,
        access_token: Option<&str>,
        table: &str,
        filters: &[Filter],
    ) -> Result<(), SupabaseError> {
        let response = self
            .request(Method::DELETE, &self.rest_url(table), access_token)
            .query(filters)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Calls a set-returning database function; filters apply to its result rows.
    pub async fn rpc<T>(&self, function: &str, filters: &[Filter]) -> Result<Vec<T>, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, &self.rest_url(&format!("rpc/{function}")), None)
            .query(filters)
            .json(&EmptyArgs {})
            .send()
            .await?;
        read_json(response).await
    }

    pub(crate) fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.base_url)
    }

    pub(crate) fn request(
        &self,
        method: Method,
        url: &str,
        access_token: Option<&str>,
    ) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .header(USER_AGENT, CLIENT_NAME)
    }
}

#[derive(Debug, Serialize)]
struct EmptyArgs {}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    code: Option<serde_json::Value>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        match self.code.as_ref()? {
            serde_json::Value::String(code) => Some(code.clone()),
            serde_json::Value::Number(code) => Some(code.to_string()),
            _ => None,
        }
    }

    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

fn select_query(filters: &[Filter], order: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(filters.len() + 2);
    query.push(("select", "*".to_string()));
    query.extend(filters.iter().cloned());
    if let Some(order) = order {
        query.push(("order", order.to_string()));
    }
    query
}

pub(crate) async fn read_json<T>(response: Response) -> Result<T, SupabaseError>
where
    T: DeserializeOwned,
{
    let response = check_status(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|err| SupabaseError::InvalidResponse(format!("{err}: {body}")))
}

pub(crate) async fn check_status(response: Response) -> Result<Response, SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await?;
    Err(api_error(status, &body))
}

fn api_error(status: StatusCode, body: &str) -> SupabaseError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(ErrorBody::code);
    let message = parsed
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.to_string()
            } else {
                trimmed.to_string()
            }
        });
    SupabaseError::Api {
        status,
        code,
        message,
    }
}

impl From<SupabaseError> for CoreError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Api {
                status,
                code,
                message,
            } => {
                let code = code.as_deref();
                if code == Some(UNIQUE_VIOLATION) || status == StatusCode::CONFLICT {
                    CoreError::DataIntegrity(message)
                } else if code == Some(NO_SINGLE_ROW) || status == StatusCode::NOT_FOUND {
                    CoreError::NotFound(message)
                } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    CoreError::AuthRequired(message)
                } else if status == StatusCode::BAD_REQUEST
                    || status == StatusCode::UNPROCESSABLE_ENTITY
                {
                    CoreError::Validation(message)
                } else {
                    CoreError::Transport(format!("{status}: {message}"))
                }
            }
            SupabaseError::Http(err) => CoreError::Transport(err.to_string()),
            SupabaseError::InvalidResponse(message) => CoreError::Transport(message),
            SupabaseError::MissingData(what) => CoreError::Transport(format!("missing {what}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use agora_core::CoreError;
    use reqwest::StatusCode;

    use super::{SupabaseClient, SupabaseError, api_error, eq, select_query};

    fn api(status: StatusCode, body: &str) -> CoreError {
        api_error(status, body).into()
    }

    #[test]
    fn base_url_is_normalized() {
        let client = SupabaseClient::new(
            reqwest::Client::new(),
            " https://demo.supabase.co/ ",
            "anon".to_string(),
        );
        assert_eq!(client.base_url(), "https://demo.supabase.co");
        assert_eq!(
            client.rest_url("votes"),
            "https://demo.supabase.co/rest/v1/votes"
        );
    }

    #[test]
    fn select_query_orders_after_filters() {
        let query = select_query(&[eq("post_id", 4)], Some("created_at.asc"));
        assert_eq!(
            query,
            vec![
                ("select", "*".to_string()),
                ("post_id", "eq.4".to_string()),
                ("order", "created_at.asc".to_string()),
            ]
        );
    }

    #[test]
    fn postgrest_unique_violation_is_integrity_error() {
        let err = api(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":null,"hint":null}"#,
        );
        assert_eq!(
            err,
            CoreError::DataIntegrity("duplicate key value violates unique constraint".to_string())
        );
    }

    #[test]
    fn single_row_miss_is_not_found() {
        let err = api(
            StatusCode::NOT_ACCEPTABLE,
            r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#,
        );
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn auth_error_body_uses_msg() {
        let err = api(StatusCode::UNAUTHORIZED, r#"{"code":401,"msg":"invalid JWT"}"#);
        assert_eq!(err, CoreError::AuthRequired("invalid JWT".to_string()));
    }

    #[test]
    fn unparseable_body_falls_back_to_text() {
        let err = api(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(
            err,
            CoreError::Transport("502 Bad Gateway: upstream down".to_string())
        );
        let err = api(StatusCode::BAD_REQUEST, "");
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn missing_data_is_transport_error() {
        let err: CoreError = SupabaseError::MissingData("inserted row").into();
        assert_eq!(err, CoreError::Transport("missing inserted row".to_string()));
    }
}
