use std::io::ErrorKind;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use canlabel_core::pricing::SAMPLE_PRICE_MINOR;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::bootstrap::AppState;

pub const DEFAULT_TEMPLATE_FILENAME: &str = "canlabel-white-label-template.zip";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetError {
    pub error: String,
}

fn asset_error(status: StatusCode, message: &str) -> (StatusCode, Json<AssetError>) {
    (status, Json(AssetError { error: message.to_string() }))
}

pub async fn template_download(
    State(state): State<AppState>,
) -> Result<Response, (StatusCode, Json<AssetError>)> {
    let path = &state.config.site.template_path;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_TEMPLATE_FILENAME)
        .to_string();

    let bytes = tokio::fs::read(path).await.map_err(|error| {
        if error.kind() == ErrorKind::NotFound {
            warn!(
                event_name = "template.download.missing",
                path = %path.display(),
                "template archive not found"
            );
            asset_error(StatusCode::NOT_FOUND, "Template not found")
        } else {
            error!(
                event_name = "template.download.failed",
                path = %path.display(),
                error = %error,
                "template archive could not be read"
            );
            asset_error(StatusCode::INTERNAL_SERVER_ERROR, "Template download failed")
        }
    })?;

    info!(
        event_name = "template.download.served",
        filename = %filename,
        size_bytes = bytes.len(),
        "template archive served"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub publishable_key: Option<String>,
    pub sample_amount: i64,
    pub currency: String,
}

pub async fn public_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(PublicConfig {
        publishable_key: state.config.payments.publishable_key.clone(),
        sample_amount: SAMPLE_PRICE_MINOR,
        currency: state.config.payments.currency.clone(),
    })
}
