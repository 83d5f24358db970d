pub mod og;
pub mod svg;
pub mod template;
pub mod text;

use std::{io::Cursor, sync::Arc};

use axum::{
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use current_market_core::AppError;
use image::{ImageFormat, RgbaImage};

use crate::og::OgRenderer;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to load fonts: {0}")]
    Fonts(String),
    #[error("Failed to parse SVG: {0}")]
    Svg(#[from] resvg::usvg::Error),
    #[error("Failed to allocate {0}x{1} canvas")]
    Canvas(u32, u32),
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to encode WebP: {0}")]
    WebP(String),
    #[error("{0} is not a raster format")]
    NotRaster(&'static str),
    #[error("Render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OutputFormat {
    Png,
    WebP,
    Svg,
}

impl OutputFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Svg => "image/svg+xml",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Svg => "svg",
        }
    }
}

pub fn encode_image(image: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>, RenderError> {
    match format {
        OutputFormat::Png => {
            let mut out = Vec::new();
            image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
            Ok(out)
        }
        OutputFormat::WebP => {
            // image only writes lossless WebP, which is far larger for gradients
            let encoder = webp::Encoder::from_rgba(image.as_raw(), image.width(), image.height());
            let memory = encoder
                .encode_simple(false, 90.0)
                .map_err(|e| RenderError::WebP(format!("{e:?}")))?;
            Ok(memory.to_vec())
        }
        OutputFormat::Svg => Err(RenderError::NotRaster(format.extension())),
    }
}

pub async fn get_og(
    State(og): State<Arc<OgRenderer>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    respond(og, query, &headers, OutputFormat::Png).await
}

pub async fn get_og_webp(
    State(og): State<Arc<OgRenderer>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    respond(og, query, &headers, OutputFormat::WebP).await
}

pub async fn get_og_svg(
    State(og): State<Arc<OgRenderer>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    respond(og, query, &headers, OutputFormat::Svg).await
}

async fn respond(
    og: Arc<OgRenderer>,
    query: Option<String>,
    headers: &HeaderMap,
    format: OutputFormat,
) -> Result<Response, AppError> {
    let raw_title = query.as_deref().and_then(title_param);
    let title = og.title(raw_title.as_deref());
    let etag = og.etag(&title, format);
    let cache_control = og.cache_control();
    if if_none_match(headers, &etag) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, etag), (header::CACHE_CONTROL, cache_control)],
        )
            .into_response());
    }

    // Rasterizing is CPU-bound
    let image = tokio::task::spawn_blocking(move || og.render(&title, format))
        .await
        .map_err(RenderError::from)??;
    Ok((
        [
            (header::CONTENT_TYPE, image.format.content_type().to_string()),
            (header::CACHE_CONTROL, cache_control),
            (header::ETAG, image.etag),
        ],
        image.bytes,
    )
        .into_response())
}

/// First `title` pair in the query. Malformed percent-encoding is decoded lossily.
fn title_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "title")
        .map(|(_, value)| value.into_owned())
}

fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|s| s.split(','))
        .map(|s| s.trim())
        .any(|tag| tag == "*" || tag.strip_prefix("W/").unwrap_or(tag) == etag)
}
