use std::collections::BTreeMap;

use axum::{
    Form, Json,
    extract::{FromRequest, Multipart, Request},
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

/// Accepts the site's contact form. Submissions are only logged; delivery is not wired up.
pub async fn post_contact(request: Request) -> Result<Json<Value>, Response> {
    let payload = read_fields(request).await?;
    tracing::info!(?payload, "Contact submission");
    Ok(Json(json!({ "ok": true })))
}

/// Collect form fields from either a multipart (browser `FormData`) or urlencoded body.
async fn read_fields(request: Request) -> Result<BTreeMap<String, String>, Response> {
    let multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));
    if !multipart {
        let Form(fields) = Form::<BTreeMap<String, String>>::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        return Ok(fields);
    }

    let mut multipart =
        Multipart::from_request(request, &()).await.map_err(IntoResponse::into_response)?;
    let mut fields = BTreeMap::new();
    while let Some(field) = multipart.next_field().await.map_err(IntoResponse::into_response)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        // Attachments are noted by name only
        let file_name = field.file_name().map(str::to_string);
        let value = match file_name {
            Some(file_name) => format!("[file {file_name}]"),
            None => field.text().await.map_err(IntoResponse::into_response)?,
        };
        fields.insert(name, value);
    }
    Ok(fields)
}
