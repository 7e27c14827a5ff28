//! Authenticated API request command

use colored::Colorize;
use reqwest::Method;
use serde_json::Value;

use crate::api::client::ApiRequest;
use crate::context::SessionContext;
use crate::error::{CinearcError, Result};

/// Sends one request through the session's API client and prints the JSON
/// response.
///
/// # Errors
///
/// Returns [`CinearcError::InvalidInput`] for an unknown method, a body that
/// is not JSON, or a malformed `key=value` query pair. Request failures are
/// returned as produced by the client.
pub async fn request(
    ctx: &SessionContext,
    method: &str,
    path: &str,
    data: Option<&str>,
    query: &[String],
) -> Result<()> {
    let request = build_request(method, path, data, query)?;

    if !ctx.store.is_authenticated() {
        tracing::debug!("No access token held; sending anonymous request");
    }

    match ctx.api.send(&request).await {
        Ok(Value::Null) => {
            println!("{}", "(empty response)".dimmed());
            Ok(())
        }
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Err(e) => {
            if let Some(CinearcError::RefreshFailed(_)) = e.downcast_ref::<CinearcError>() {
                println!(
                    "{} Run {} to start a new session.",
                    "Session expired.".red(),
                    "cinearc login".cyan()
                );
            }
            Err(e)
        }
    }
}

fn build_request(
    method: &str,
    path: &str,
    data: Option<&str>,
    query: &[String],
) -> Result<ApiRequest> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| CinearcError::InvalidInput(format!("unknown HTTP method: {method}")))?;

    let mut request = ApiRequest::new(method, path);

    for pair in query {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            CinearcError::InvalidInput(format!("query must be key=value, got: {pair}"))
        })?;
        request = request.with_query(key, value);
    }

    if let Some(raw) = data {
        let body: Value = serde_json::from_str(raw)
            .map_err(|e| CinearcError::InvalidInput(format!("request body is not JSON: {e}")))?;
        request = request.with_body(body);
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_request_normalizes_method() {
        let req = build_request("post", "/basket/", Some(r#"{"session":1}"#), &[]).unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body, Some(json!({"session": 1})));
    }

    #[test]
    fn test_build_request_parses_query_pairs() {
        let query = vec!["page=2".to_string(), "q=a=b".to_string()];
        let req = build_request("GET", "/movies/", None, &query).unwrap();
        assert_eq!(
            req.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "a=b".to_string())
            ]
        );
    }

    #[test]
    fn test_build_request_rejects_bad_query() {
        let err = build_request("GET", "/movies/", None, &["page".to_string()]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CinearcError>(),
            Some(CinearcError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_build_request_rejects_invalid_body() {
        assert!(build_request("POST", "/basket/", Some("{oops"), &[]).is_err());
    }

    #[test]
    fn test_build_request_rejects_invalid_method() {
        assert!(build_request("GE T", "/", None, &[]).is_err());
    }
}
