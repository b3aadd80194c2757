// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth authorization and callback routes for both providers.
//!
//! The frontend opens the authorization URL in a popup. The callback page
//! posts a message back to the opener and closes itself.

use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, session_cookie};
use crate::models::Provider;
use crate::services::oauth_state::{sign_state, verify_state};
use crate::services::tokens::OAuthResult;
use crate::AppState;

/// CSP for the callback page, which needs its inline script.
const CALLBACK_CSP: &str =
    "default-src 'none'; script-src 'unsafe-inline'; style-src 'unsafe-inline'";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/oauth2/authorize", get(google_authorize))
        .route("/oauth2/callback", get(google_callback))
        .route("/api/microsoft/auth/url", get(microsoft_authorize))
        .route("/oauth2/microsoft/callback", get(microsoft_callback))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeParams {
    /// Frontend origin to notify when the flow completes.
    #[serde(default)]
    return_to: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GoogleAuthorizeResponse {
    pub authorization_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MicrosoftAuthorizeResponse {
    pub auth_url: String,
}

#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn google_authorize(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Json<GoogleAuthorizeResponse>> {
    let url = authorization_url(&state, Provider::Google, params.return_to)?;
    Ok(Json(GoogleAuthorizeResponse {
        authorization_url: url,
    }))
}

async fn microsoft_authorize(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Json<MicrosoftAuthorizeResponse>> {
    let url = authorization_url(&state, Provider::Microsoft, params.return_to)?;
    Ok(Json(MicrosoftAuthorizeResponse { auth_url: url }))
}

fn authorization_url(
    state: &AppState,
    provider: Provider,
    return_to: Option<String>,
) -> Result<String> {
    let return_to = return_to.unwrap_or_else(|| state.config.frontend_url.clone());
    let signed = sign_state(
        &return_to,
        &state.config.oauth_state_key,
        chrono::Utc::now().timestamp_millis(),
    )?;

    tracing::info!(provider = %provider, return_to = %return_to, "Starting OAuth flow");
    Ok(state.tokens.provider(provider)?.authorization_url(&signed))
}

async fn google_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    complete_callback(&state, Provider::Google, jar, params).await
}

async fn microsoft_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    complete_callback(&state, Provider::Microsoft, jar, params).await
}

async fn complete_callback(
    state: &AppState,
    provider: Provider,
    jar: CookieJar,
    params: CallbackParams,
) -> Result<Response> {
    if let Some(error) = params.error {
        tracing::warn!(
            provider = %provider,
            error = %error,
            description = ?params.error_description,
            "Authorization denied"
        );
        return Err(AppError::BadRequest(format!("Authorization failed: {}", error)));
    }

    let return_to = params
        .state
        .as_deref()
        .and_then(|s| {
            verify_state(
                s,
                &state.config.oauth_state_key,
                chrono::Utc::now().timestamp_millis(),
            )
        })
        .ok_or_else(|| AppError::BadRequest("Invalid OAuth state".to_string()))?;

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let result = state.tokens.handle_oauth_callback(provider, &code).await?;

    let jwt = create_jwt(&result.user.id, &state.config.jwt_signing_key)?;
    let jar = jar.add(session_cookie(jwt, state.config.secure_cookies()));

    let page = success_page(provider, &result, &return_to)?;
    Ok((
        jar,
        [(header::CONTENT_SECURITY_POLICY, CALLBACK_CSP)],
        Html(page),
    )
        .into_response())
}

/// Message posted to the opener window.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallbackMessage<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    user_id: &'a str,
    email: &'a str,
    name: &'a str,
}

fn message_type(provider: Provider) -> &'static str {
    match provider {
        Provider::Google => "GOOGLE_AUTH_SUCCESS",
        Provider::Microsoft => "MICROSOFT_AUTH_SUCCESS",
    }
}

/// Render the popup page. All interpolated values are JSON encoded.
fn success_page(provider: Provider, result: &OAuthResult, return_to: &str) -> Result<String> {
    let message = CallbackMessage {
        kind: message_type(provider),
        user_id: &result.user.id,
        email: &result.user.email,
        name: &result.user.name,
    };
    let message = script_json(&serde_json::to_string(&message).map_err(anyhow::Error::from)?);
    let target = script_json(&serde_json::to_string(return_to).map_err(anyhow::Error::from)?);

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title} sign-in complete</title></head>
<body>
<p>Sign-in complete. You can close this window.</p>
<script>
(function () {{
  var message = {message};
  var target = {target};
  if (window.opener) {{
    try {{ window.opener.postMessage(message, new URL(target).origin); }} catch (e) {{}}
  }}
  window.close();
}})();
</script>
</body>
</html>
"#,
        title = provider.display_name(),
    ))
}

/// Keep JSON from closing the surrounding script element.
fn script_json(json: &str) -> String {
    json.replace("</", "<\\/").replace("<!--", "<\\!--")
}
