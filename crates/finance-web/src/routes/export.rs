//! Yearly report download.

use askama::Template;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use services::export::{self, ExportFormat};
use services::reports;
use tracing::info;

use crate::error::Result;
use crate::forms;
use crate::routes::{nav, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "export.html")]
pub struct ExportPage {
    pub nav: Nav,
    pub year: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub year: Option<i32>,
    pub format: Option<String>,
}

/// Without `format` the export form is shown; with it the report file is
/// sent as an attachment.
pub async fn export(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let year = forms::year(query.year, state.today())?;

    let Some(format) = query.format.as_deref().filter(|f| !f.trim().is_empty()) else {
        return Ok(ExportPage {
            nav: nav(&state, &user).await?,
            year,
        }
        .into_response());
    };

    let format: ExportFormat = format.parse()?;
    let report = reports::yearly_report(&state.db, user.id(), year).await?;
    let file = export::export_report(&report, format)?;

    info!(user_id = user.id(), year, %format, "Report downloaded");

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [(CONTENT_TYPE, file.content_type.to_string()), (CONTENT_DISPOSITION, disposition)],
        file.bytes,
    )
        .into_response())
}
