use axum::{
    Form,
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    application::{
        diary::{DiaryEntryInput, DiaryError, ENTRY_REJECTED},
        gate::{INDEX_PATH, login_gate},
        viewer::Viewer,
    },
    presentation::views::{
        DiaryLogView, DiaryLogsTemplate, DiaryTemplate, PageChrome, render_template_response,
    },
};

use super::{
    CurrentViewer, HandlerResult, HttpState, StatusBody, children::IdForm, parse_id, require,
    require_member, requested, see_other,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct DiaryForm {
    title: String,
    text: String,
    image: Option<String>,
    check_id: String,
}

pub(super) async fn diary_children(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
) -> HandlerResult {
    let user_id = require_member(&viewer, &uri)?;
    let children = state.diary.children(user_id).await?;
    Ok(render_template_response(
        DiaryTemplate {
            chrome: PageChrome::for_viewer(&viewer).titled("Diary"),
            children,
        },
        StatusCode::OK,
    ))
}

/// Logs of one child. Another account's child sends the viewer back to the start.
async fn render_logs(
    state: &HttpState,
    viewer: &Viewer,
    user_id: i64,
    raw_child_id: &str,
    error: Option<&str>,
) -> HandlerResult {
    let Some(child_id) = parse_id(raw_child_id) else {
        return Ok(see_other(INDEX_PATH));
    };
    let (child, logs) = match state.diary.logs(user_id, child_id).await {
        Ok(found) => found,
        Err(DiaryError::Repo(err)) => return Err(err.into()),
        Err(_) => return Ok(see_other(INDEX_PATH)),
    };
    Ok(render_template_response(
        DiaryLogsTemplate {
            chrome: PageChrome::for_viewer(viewer).titled(format!("{}'s diary", child.name)),
            child,
            logs: logs.into_iter().map(DiaryLogView::from).collect(),
            error: error.map(str::to_string),
        },
        StatusCode::OK,
    ))
}

pub(super) async fn child_logs(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Path(child_id): Path<String>,
) -> HandlerResult {
    let user_id = require_member(&viewer, &uri)?;
    render_logs(&state, &viewer, user_id, &child_id, None).await
}

/// `check_id` 0 creates an entry; any other value edits that entry.
pub(super) async fn save_log(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Path(raw_child_id): Path<String>,
    Form(form): Form<DiaryForm>,
) -> HandlerResult {
    let user_id = require_member(&viewer, &uri)?;
    let (Some(child_id), Some(check_id)) = (parse_id(&raw_child_id), parse_id(&form.check_id))
    else {
        return render_logs(&state, &viewer, user_id, &raw_child_id, Some(ENTRY_REJECTED)).await;
    };

    let input = DiaryEntryInput {
        title: form.title,
        text: form.text,
        image: form.image,
    };
    match state.diary.save(user_id, child_id, check_id, input).await {
        Ok(_) => Ok(see_other(&format!("/diary/{child_id}"))),
        Err(DiaryError::Repo(err)) => Err(err.into()),
        Err(_) => render_logs(&state, &viewer, user_id, &raw_child_id, Some(ENTRY_REJECTED)).await,
    }
}

pub(super) async fn delete_log(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Form(form): Form<IdForm>,
) -> HandlerResult {
    require(login_gate(&viewer, &requested(&uri)))?;
    let (Some(user_id), Some(log_id)) = (viewer.user_id(), parse_id(&form.id)) else {
        return Ok(StatusBody::failed().into_response());
    };
    match state.diary.delete(user_id, log_id).await {
        Ok(()) => Ok(StatusBody::ok().into_response()),
        Err(DiaryError::Repo(err)) => Err(err.into()),
        Err(_) => Ok(StatusBody::failed().into_response()),
    }
}
