use axum::{
    Form,
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    application::{
        children::{CHILD_REJECTED, ChildError},
        gate::{CHILD_PATH, login_gate},
        viewer::Viewer,
    },
    presentation::views::{
        ChildManageTemplate, ChildView, MyChildTemplate, PageChrome, render_template_response,
    },
};

use super::{
    CurrentViewer, HandlerResult, HttpState, StatusBody, parse_id, require, require_member,
    requested, see_other,
};

const MANAGE_PATH: &str = "/child/manage/";

const DATE_INPUT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ChildForm {
    #[serde(rename = "childName")]
    name: String,
    dob: String,
    #[serde(rename = "childID")]
    child_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct IdForm {
    pub id: String,
}

#[derive(Clone, Copy)]
enum ChildPage {
    List,
    Manage,
}

fn parse_dob(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), DATE_INPUT).ok()
}

async fn render_page(
    state: &HttpState,
    viewer: &Viewer,
    page: ChildPage,
    error: Option<&str>,
) -> HandlerResult {
    let Some(user_id) = viewer.user_id() else {
        return Ok(see_other(CHILD_PATH));
    };
    let children: Vec<ChildView> = state
        .children
        .list(user_id)
        .await?
        .into_iter()
        .map(ChildView::from)
        .collect();
    let chrome = PageChrome::for_viewer(viewer);
    let today = state.clock.today().to_string();
    let error = error.map(str::to_string);

    Ok(match page {
        ChildPage::List => render_template_response(
            MyChildTemplate {
                chrome: chrome.titled("My children"),
                children,
                error,
                today,
            },
            StatusCode::OK,
        ),
        ChildPage::Manage => render_template_response(
            ChildManageTemplate {
                chrome: chrome.titled("Edit children"),
                children,
                error,
                today,
            },
            StatusCode::OK,
        ),
    })
}

/// Re-render the form with an inline message, or fail for repository errors.
async fn rejected(
    state: &HttpState,
    viewer: &Viewer,
    page: ChildPage,
    err: ChildError,
) -> HandlerResult {
    match err {
        ChildError::Repo(err) => Err(err.into()),
        other => {
            let message = other.form_message().unwrap_or(CHILD_REJECTED);
            render_page(state, viewer, page, Some(message)).await
        }
    }
}

pub(super) async fn my_children(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
) -> HandlerResult {
    require_member(&viewer, &uri)?;
    render_page(&state, &viewer, ChildPage::List, None).await
}

pub(super) async fn add_child(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Form(form): Form<ChildForm>,
) -> HandlerResult {
    let user_id = require_member(&viewer, &uri)?;
    let Some(dob) = parse_dob(&form.dob) else {
        return render_page(&state, &viewer, ChildPage::List, Some(CHILD_REJECTED)).await;
    };
    match state.children.add(user_id, &form.name, dob).await {
        Ok(_) => Ok(see_other(CHILD_PATH)),
        Err(err) => rejected(&state, &viewer, ChildPage::List, err).await,
    }
}

pub(super) async fn manage_children(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
) -> HandlerResult {
    require_member(&viewer, &uri)?;
    render_page(&state, &viewer, ChildPage::Manage, None).await
}

pub(super) async fn edit_child(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Form(form): Form<ChildForm>,
) -> HandlerResult {
    let user_id = require_member(&viewer, &uri)?;
    let (Some(child_id), Some(dob)) = (parse_id(&form.child_id), parse_dob(&form.dob)) else {
        return render_page(&state, &viewer, ChildPage::Manage, Some(CHILD_REJECTED)).await;
    };
    match state.children.edit(user_id, child_id, &form.name, dob).await {
        Ok(_) => Ok(see_other(MANAGE_PATH)),
        Err(err) => rejected(&state, &viewer, ChildPage::Manage, err).await,
    }
}

pub(super) async fn activate_child(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Form(form): Form<IdForm>,
) -> HandlerResult {
    require(login_gate(&viewer, &requested(&uri)))?;
    let (Some(user_id), Some(child_id)) = (viewer.user_id(), parse_id(&form.id)) else {
        return Ok(StatusBody::failed().into_response());
    };
    json_status(state.children.activate(user_id, child_id).await)
}

pub(super) async fn delete_child(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Form(form): Form<IdForm>,
) -> HandlerResult {
    require(login_gate(&viewer, &requested(&uri)))?;
    let (Some(user_id), Some(child_id)) = (viewer.user_id(), parse_id(&form.id)) else {
        return Ok(StatusBody::failed().into_response());
    };
    json_status(state.children.delete(user_id, child_id).await)
}

fn json_status(result: Result<(), ChildError>) -> HandlerResult {
    match result {
        Ok(()) => Ok(StatusBody::ok().into_response()),
        Err(ChildError::Repo(err)) => Err(err.into()),
        Err(_) => Ok(StatusBody::failed().into_response()),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn date_inputs_use_iso_format() {
        assert_eq!(parse_dob("2023-02-28"), Some(date!(2023 - 02 - 28)));
        assert_eq!(parse_dob(" 2023-02-28 "), Some(date!(2023 - 02 - 28)));
        assert_eq!(parse_dob("28/02/2023"), None);
        assert_eq!(parse_dob(""), None);
    }
}

