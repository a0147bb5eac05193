//! Onboarding and the gated content pages.

use axum::{
    Form, Json,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    application::{
        content::SearchResponse,
        gate::{
            AGE_SELECTION_PATH, CHILD_PATH, DISCLAIMER_PATH, HOMEPAGE_PATH, content_gate,
            disclaimer_gate, with_next,
        },
        onboarding,
        viewer::{AgeResolution, ProfileResolution, Viewer, ViewerProfile},
    },
    domain::types::AgeGroup,
    presentation::views::{
        AgeSelectTemplate, BannerView, DisclaimerTemplate, HeadingTemplate, HomepageTemplate,
        IndexTemplate, LinkView, MapTemplate, PageChrome, SearchTemplate, SymptomTemplate,
        age_options, render_not_found_response, render_template_response,
    },
};

use super::{
    CurrentViewer, HandlerResult, HttpState, Rejection, SessionUpdate, parse_id, require,
    requested, see_other,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct AgeForm {
    age: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SearchForm {
    search: String,
}

/// The banner profile, sending signed-in viewers without an active child to
/// child management.
async fn require_profile(state: &HttpState, viewer: &Viewer) -> Result<ViewerProfile, Rejection> {
    match state.resolver.profile(viewer).await? {
        ProfileResolution::Ready(profile) => Ok(profile),
        ProfileResolution::NoActiveChild => Err(see_other(CHILD_PATH).into()),
        ProfileResolution::Unknown => Err(see_other(AGE_SELECTION_PATH).into()),
    }
}

pub(super) async fn index(
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<NextQuery>,
) -> Response {
    if viewer.is_authenticated() || viewer.session.age_range.is_some() {
        return see_other(HOMEPAGE_PATH);
    }
    render_template_response(
        IndexTemplate {
            chrome: PageChrome::for_viewer(&viewer),
            next: query.next.unwrap_or_default(),
            error: None,
        },
        StatusCode::OK,
    )
}

/// Showing the disclaimer withdraws any earlier acceptance and age choice.
pub(super) async fn disclaimer(
    CurrentViewer(mut viewer): CurrentViewer,
    Query(query): Query<NextQuery>,
) -> Response {
    onboarding::reset_for_disclaimer(&mut viewer.session);
    let page = render_template_response(
        DisclaimerTemplate {
            chrome: PageChrome::for_viewer(&viewer).titled("Disclaimer"),
            action: with_next(DISCLAIMER_PATH, query.next.as_deref().unwrap_or_default()),
        },
        StatusCode::OK,
    );
    SessionUpdate::save(viewer.session).attach(page)
}

pub(super) async fn accept_disclaimer(
    CurrentViewer(mut viewer): CurrentViewer,
    Query(query): Query<NextQuery>,
) -> Response {
    let target = onboarding::accept_disclaimer(&mut viewer, query.next.as_deref());
    SessionUpdate::save(viewer.session).attach(see_other(&target))
}

pub(super) async fn age_selection(
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Query(query): Query<NextQuery>,
) -> HandlerResult {
    require(disclaimer_gate(&viewer, &requested(&uri)))?;
    Ok(render_template_response(
        AgeSelectTemplate {
            chrome: PageChrome::for_viewer(&viewer).titled("Child's age"),
            action: with_next(AGE_SELECTION_PATH, query.next.as_deref().unwrap_or_default()),
            options: age_options(&[]),
        },
        StatusCode::OK,
    ))
}

pub(super) async fn select_age(
    CurrentViewer(mut viewer): CurrentViewer,
    uri: OriginalUri,
    Query(query): Query<NextQuery>,
    Form(form): Form<AgeForm>,
) -> HandlerResult {
    require(disclaimer_gate(&viewer, &requested(&uri)))?;
    let target =
        onboarding::select_age(&mut viewer.session, form.age.as_deref(), query.next.as_deref());
    Ok(SessionUpdate::save(viewer.session).attach(see_other(&target)))
}

pub(super) async fn homepage(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
) -> HandlerResult {
    require(content_gate(&viewer, &requested(&uri)))?;
    let profile = require_profile(&state, &viewer).await?;
    let symptoms = state.content.list_symptoms().await?;

    Ok(render_template_response(
        HomepageTemplate {
            chrome: PageChrome::for_viewer(&viewer).titled("Symptoms"),
            banner: BannerView::from(&profile),
            symptoms: symptoms.iter().map(LinkView::from).collect(),
        },
        StatusCode::OK,
    ))
}

pub(super) async fn symptom(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Path(name): Path<String>,
) -> HandlerResult {
    require(content_gate(&viewer, &requested(&uri)))?;
    let profile = require_profile(&state, &viewer).await?;
    let view = state.content.symptom(&name).await?;

    Ok(render_template_response(
        SymptomTemplate {
            chrome: PageChrome::for_viewer(&viewer).titled(view.label.clone()),
            banner: BannerView::from(&profile),
            label: view.label,
            description: view.description,
            headings: view.headings,
        },
        StatusCode::OK,
    ))
}

pub(super) async fn heading(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Path(raw_id): Path<String>,
) -> HandlerResult {
    require(content_gate(&viewer, &requested(&uri)))?;
    let profile = require_profile(&state, &viewer).await?;

    let Some(heading_id) = parse_id(&raw_id) else {
        return Ok(see_other(HOMEPAGE_PATH));
    };
    let Some(view) = state.content.heading(heading_id, profile.age_group).await? else {
        return Ok(see_other(HOMEPAGE_PATH));
    };

    Ok(render_template_response(
        HeadingTemplate {
            chrome: PageChrome::for_viewer(&viewer).titled(view.heading.text.clone()),
            banner: BannerView::from(&profile),
            heading: view.heading,
            sub_headings: view.sub_headings,
        },
        StatusCode::OK,
    ))
}

pub(super) async fn search_page(
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
) -> HandlerResult {
    require(content_gate(&viewer, &requested(&uri)))?;
    Ok(render_template_response(
        SearchTemplate {
            chrome: PageChrome::for_viewer(&viewer).titled("Search"),
        },
        StatusCode::OK,
    ))
}

/// JSON search; signed-in viewers without an active child search group 0.
pub(super) async fn search(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
    Form(form): Form<SearchForm>,
) -> HandlerResult {
    require(content_gate(&viewer, &requested(&uri)))?;
    let age_group = match state.resolver.resolve_age_group(&viewer).await? {
        AgeResolution::Group(group) => group,
        AgeResolution::NoActiveChild | AgeResolution::Unknown => AgeGroup::UnderOneMonth,
    };
    let outcome = state.content.search(&form.search, age_group).await?;
    Ok(Json(SearchResponse::from(outcome)).into_response())
}

pub(super) async fn map(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: OriginalUri,
) -> HandlerResult {
    require(content_gate(&viewer, &requested(&uri)))?;
    Ok(render_template_response(
        MapTemplate {
            chrome: PageChrome::for_viewer(&viewer).titled("Nearby help"),
            api_key: state.maps_api_key.clone(),
        },
        StatusCode::OK,
    ))
}

pub(super) async fn not_found(CurrentViewer(viewer): CurrentViewer) -> Response {
    render_not_found_response(PageChrome::for_viewer(&viewer))
}
