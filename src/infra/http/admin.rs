//! Editor console: symptom, heading and sub-heading maintenance.

use axum::{
    Form, Json,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::Form as MultiForm;
use serde::Deserialize;
use url::form_urlencoded;

use crate::{
    application::{
        admin::{AdminContentError, SubHeadingInput, SymptomInput},
        gate::{editor_gate, login_gate},
        viewer::Viewer,
    },
    domain::{entities::CategoryRecord, types::AgeGroup},
    presentation::views::{
        AdminHeadingTemplate, AdminHeadingView, AdminSubHeadingTemplate, AdminSymptomTemplate,
        AdminTemplate, PageChrome, SubHeadingView, age_options, render_template_response,
    },
};

use super::{
    CurrentViewer, HandlerResult, HttpState, Rejection, StatusBody, children::IdForm, parse_id,
    require, require_member, requested, see_other,
};

const ADMIN_PATH: &str = "/admin/";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SymptomForm {
    name: String,
    description: String,
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct HeadingForm {
    category_id: String,
    text: String,
    delete: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct HeadingQuery {
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SubHeadingForm {
    heading_id: String,
    title: String,
    text: String,
    age_groups: Vec<String>,
    delete: Option<String>,
}

/// Signed in, disclaimer accepted, and an editor.
fn require_editor(viewer: &Viewer, uri: &OriginalUri) -> Result<(), Rejection> {
    require_member(viewer, uri)?;
    require(editor_gate(viewer))
}

fn symptom_page_path(category: &CategoryRecord) -> String {
    let segment: String = form_urlencoded::byte_serialize(category.name.as_bytes()).collect();
    format!("{ADMIN_PATH}{segment}")
}

/// Map a failed edit to an inline message, a redirect to the console for
/// vanished records, or an error response.
fn edit_failure(err: AdminContentError) -> Result<String, Rejection> {
    if let Some(message) = err.form_message() {
        return Ok(message);
    }
    match err {
        AdminContentError::Repo(err) => Err(err.into()),
        _ => Err(see_other(ADMIN_PATH).into()),
    }
}

async fn render_symptoms(state: &HttpState, viewer: &Viewer, error: Option<String>) -> HandlerResult {
    let symptoms = state.admin.list_symptoms().await?;
    Ok(render_template_response(
        AdminTemplate {
            chrome: PageChrome::for_viewer(viewer).titled("Editor"),
            symptoms,
            error,
        },
        StatusCode::OK,
    ))
}

pub(super) async fn symptoms(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
) -> HandlerResult {
    require_editor(&viewer, &uri)?;
    render_symptoms(&state, &viewer, None).await
}

/// Create a symptom, or edit the one named by `id`.
pub(super) async fn save_symptom(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Form(form): Form<SymptomForm>,
) -> HandlerResult {
    require_editor(&viewer, &uri)?;
    let id = match form.id.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => match parse_id(raw) {
            Some(id) => Some(id),
            None => return Ok(see_other(ADMIN_PATH)),
        },
        None => None,
    };
    let input = SymptomInput {
        name: form.name,
        description: form.description,
    };
    match state.admin.save_symptom(id, input).await {
        Ok(_) => Ok(see_other(ADMIN_PATH)),
        Err(err) => {
            let message = edit_failure(err)?;
            render_symptoms(&state, &viewer, Some(message)).await
        }
    }
}

pub(super) async fn symptom_detail(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Path(key): Path<String>,
) -> HandlerResult {
    require_editor(&viewer, &uri)?;
    let Some(detail) = state.admin.symptom_detail(&key).await? else {
        return Ok(see_other(ADMIN_PATH));
    };
    let headings = detail
        .headings
        .into_iter()
        .map(|(heading, sub_headings)| AdminHeadingView {
            heading,
            sub_headings: sub_headings.into_iter().map(SubHeadingView::from).collect(),
        })
        .collect();
    Ok(render_template_response(
        AdminSymptomTemplate {
            chrome: PageChrome::for_viewer(&viewer).titled(detail.category.label()),
            category: detail.category,
            headings,
        },
        StatusCode::OK,
    ))
}

struct HeadingDraft {
    heading_id: i64,
    category_id: i64,
    text: String,
}

async fn render_heading(
    state: &HttpState,
    viewer: &Viewer,
    draft: HeadingDraft,
    error: Option<String>,
) -> HandlerResult {
    let symptoms = state.admin.list_symptoms().await?;
    let title = if draft.heading_id == 0 {
        "New heading"
    } else {
        "Edit heading"
    };
    Ok(render_template_response(
        AdminHeadingTemplate {
            chrome: PageChrome::for_viewer(viewer).titled(title),
            heading_id: draft.heading_id,
            category_id: draft.category_id,
            text: draft.text,
            symptoms,
            error,
        },
        StatusCode::OK,
    ))
}

/// Heading 0 is a blank form for a new heading under `?category=`.
pub(super) async fn heading_form(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Path(raw_id): Path<String>,
    Query(query): Query<HeadingQuery>,
) -> HandlerResult {
    require_editor(&viewer, &uri)?;
    let Some(heading_id) = parse_id(&raw_id) else {
        return Ok(see_other(ADMIN_PATH));
    };

    let draft = if heading_id == 0 {
        HeadingDraft {
            heading_id,
            category_id: query.category.as_deref().and_then(parse_id).unwrap_or(0),
            text: String::new(),
        }
    } else {
        let Some(heading) = state.admin.find_heading(heading_id).await? else {
            return Ok(see_other(ADMIN_PATH));
        };
        HeadingDraft {
            heading_id,
            category_id: heading.category_id,
            text: heading.text,
        }
    };
    render_heading(&state, &viewer, draft, None).await
}

pub(super) async fn save_heading(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Path(raw_id): Path<String>,
    Form(form): Form<HeadingForm>,
) -> HandlerResult {
    require_editor(&viewer, &uri)?;
    let Some(heading_id) = parse_id(&raw_id) else {
        return Ok(see_other(ADMIN_PATH));
    };

    if form.delete.is_some() {
        return match state.admin.delete_heading(heading_id).await {
            Ok(category) => Ok(see_other(&symptom_page_path(&category))),
            Err(AdminContentError::Repo(err)) => Err(err.into()),
            Err(_) => Ok(see_other(ADMIN_PATH)),
        };
    }

    let Some(category_id) = parse_id(&form.category_id) else {
        return Ok(see_other(ADMIN_PATH));
    };
    match state
        .admin
        .save_heading(heading_id, category_id, &form.text)
        .await
    {
        Ok(category) => Ok(see_other(&symptom_page_path(&category))),
        Err(err) => {
            let message = edit_failure(err)?;
            let draft = HeadingDraft {
                heading_id,
                category_id,
                text: form.text,
            };
            render_heading(&state, &viewer, draft, Some(message)).await
        }
    }
}

struct SubHeadingDraft {
    heading_id: i64,
    sub_heading_id: i64,
    title: String,
    text: String,
    age_groups: Vec<AgeGroup>,
}

async fn render_sub_heading(
    state: &HttpState,
    viewer: &Viewer,
    draft: SubHeadingDraft,
    error: Option<String>,
) -> HandlerResult {
    let headings = state.admin.list_headings().await?;
    let title = if draft.sub_heading_id == 0 {
        "New sub-heading"
    } else {
        "Edit sub-heading"
    };
    Ok(render_template_response(
        AdminSubHeadingTemplate {
            chrome: PageChrome::for_viewer(viewer).titled(title),
            heading_id: draft.heading_id,
            sub_heading_id: draft.sub_heading_id,
            title: draft.title,
            text: draft.text,
            options: age_options(&draft.age_groups),
            headings,
            error,
        },
        StatusCode::OK,
    ))
}

/// Sub-heading 0 is a blank form under heading `heading_id`.
pub(super) async fn sub_heading_form(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Path((raw_heading_id, raw_id)): Path<(String, String)>,
) -> HandlerResult {
    require_editor(&viewer, &uri)?;
    let (Some(heading_id), Some(sub_heading_id)) = (parse_id(&raw_heading_id), parse_id(&raw_id))
    else {
        return Ok(see_other(ADMIN_PATH));
    };

    let draft = if sub_heading_id == 0 {
        if state.admin.find_heading(heading_id).await?.is_none() {
            return Ok(see_other(ADMIN_PATH));
        }
        SubHeadingDraft {
            heading_id,
            sub_heading_id,
            title: String::new(),
            text: String::new(),
            age_groups: Vec::new(),
        }
    } else {
        let Some(sub_heading) = state.admin.find_sub_heading(sub_heading_id).await? else {
            return Ok(see_other(ADMIN_PATH));
        };
        SubHeadingDraft {
            heading_id: sub_heading.heading_id,
            sub_heading_id,
            title: sub_heading.title,
            text: sub_heading.text,
            age_groups: sub_heading.age_groups,
        }
    };
    render_sub_heading(&state, &viewer, draft, None).await
}

pub(super) async fn save_sub_heading(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Path((raw_heading_id, raw_id)): Path<(String, String)>,
    MultiForm(form): MultiForm<SubHeadingForm>,
) -> HandlerResult {
    require_editor(&viewer, &uri)?;
    let Some(sub_heading_id) = parse_id(&raw_id) else {
        return Ok(see_other(ADMIN_PATH));
    };

    if form.delete.is_some() {
        return match state.admin.delete_sub_heading(sub_heading_id).await {
            Ok(category) => Ok(see_other(&symptom_page_path(&category))),
            Err(AdminContentError::Repo(err)) => Err(err.into()),
            Err(_) => Ok(see_other(ADMIN_PATH)),
        };
    }

    let Some(heading_id) = parse_id(&form.heading_id).or_else(|| parse_id(&raw_heading_id))
    else {
        return Ok(see_other(ADMIN_PATH));
    };
    // Unknown codes are dropped; an empty selection is rejected by the service.
    let age_groups: Vec<AgeGroup> = form
        .age_groups
        .iter()
        .filter_map(|raw| raw.parse::<AgeGroup>().ok())
        .collect();
    let input = SubHeadingInput {
        heading_id,
        title: form.title.clone(),
        text: form.text.clone(),
        age_groups: age_groups.clone(),
    };

    match state.admin.save_sub_heading(sub_heading_id, input).await {
        Ok(category) => Ok(see_other(&symptom_page_path(&category))),
        Err(err) => {
            let message = edit_failure(err)?;
            let draft = SubHeadingDraft {
                heading_id,
                sub_heading_id,
                title: form.title,
                text: form.text,
                age_groups,
            };
            render_sub_heading(&state, &viewer, draft, Some(message)).await
        }
    }
}

/// JSON symptom delete for the console's inline button.
pub(super) async fn delete_symptom(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Form(form): Form<IdForm>,
) -> HandlerResult {
    require(login_gate(&viewer, &requested(&uri)))?;
    require(editor_gate(&viewer))?;
    let Some(id) = parse_id(&form.id) else {
        return Ok(StatusBody::failed().into_response());
    };
    if state.admin.delete_symptom(id).await? {
        Ok(StatusBody::ok_with_id(id).into_response())
    } else {
        Ok(StatusBody::failed().into_response())
    }
}

/// Every public content URL, for linking between articles.
pub(super) async fn all_urls(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
) -> HandlerResult {
    require(login_gate(&viewer, &requested(&uri)))?;
    require(editor_gate(&viewer))?;
    let links = state.content.all_urls().await?;
    Ok(Json(links).into_response())
}
