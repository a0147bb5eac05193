use crate::{
    application::{
        children::ChildSummary,
        error::{ErrorReport, HttpError},
        viewer::{Viewer, ViewerProfile},
    },
    domain::{
        entities::{CategoryRecord, ChildRecord, DiaryLogRecord, HeadingRecord, SubHeadingRecord},
        types::AgeGroup,
    },
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{format_description::BorrowedFormatItem, macros::format_description};

const LOG_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: PageChrome) -> Response {
    let mut response = render_template_response(
        NotFoundTemplate {
            chrome: chrome.titled("Page not found"),
        },
        StatusCode::NOT_FOUND,
    );
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Shared page frame: title and navigation state.
#[derive(Clone, Debug)]
pub struct PageChrome {
    pub title: String,
    pub username: Option<String>,
    pub is_editor: bool,
    /// Content links are only useful once the visitor has passed the gates.
    pub show_content_nav: bool,
}

impl PageChrome {
    pub fn for_viewer(viewer: &Viewer) -> Self {
        Self {
            title: "AskSniff".to_string(),
            username: viewer.user.as_ref().map(|user| user.username.clone()),
            is_editor: viewer.is_editor(),
            show_content_nav: viewer.session.disclaimer
                && (viewer.is_authenticated() || viewer.session.age_range.is_some()),
        }
    }

    pub fn titled(self, title: impl Into<String>) -> Self {
        Self {
            title: format!("{} | AskSniff", title.into()),
            ..self
        }
    }
}

/// The line above content telling who it is filtered for.
#[derive(Clone, Debug, Default)]
pub struct BannerView {
    pub child_name: Option<String>,
    pub child_age: Option<String>,
    pub selected_age: Option<String>,
}

impl From<&ViewerProfile> for BannerView {
    fn from(profile: &ViewerProfile) -> Self {
        Self {
            child_name: profile.child_name.clone(),
            child_age: profile.child_age.clone(),
            selected_age: profile.selected_age.map(str::to_string),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LinkView {
    pub label: String,
    pub href: String,
}

impl From<&CategoryRecord> for LinkView {
    fn from(category: &CategoryRecord) -> Self {
        Self {
            label: category.label(),
            href: category.url(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AgeOptionView {
    pub code: i16,
    pub label: &'static str,
    pub checked: bool,
}

pub fn age_options(selected: &[AgeGroup]) -> Vec<AgeOptionView> {
    AgeGroup::ALL
        .iter()
        .map(|group| AgeOptionView {
            code: group.code(),
            label: group.label(),
            checked: selected.contains(group),
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct ChildView {
    pub id: i64,
    pub name: String,
    pub dob: String,
    pub age: String,
    pub active: bool,
}

impl From<ChildSummary> for ChildView {
    fn from(summary: ChildSummary) -> Self {
        Self {
            id: summary.child.id,
            name: summary.child.name,
            dob: summary.child.dob.to_string(),
            age: summary.age,
            active: summary.child.active,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DiaryLogView {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    pub created_on: String,
}

impl From<DiaryLogRecord> for DiaryLogView {
    fn from(log: DiaryLogRecord) -> Self {
        Self {
            created_on: log
                .created_on
                .format(LOG_TIMESTAMP)
                .unwrap_or_else(|_| log.created_on.date().to_string()),
            id: log.id,
            title: log.title,
            text: log.text,
            image: log.image,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SubHeadingView {
    pub id: i64,
    pub heading_id: i64,
    pub title: String,
    pub text: String,
    pub age_labels: String,
}

impl From<SubHeadingRecord> for SubHeadingView {
    fn from(sub: SubHeadingRecord) -> Self {
        Self {
            age_labels: sub.age_labels(),
            id: sub.id,
            heading_id: sub.heading_id,
            title: sub.title,
            text: sub.text,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AdminHeadingView {
    pub heading: HeadingRecord,
    pub sub_headings: Vec<SubHeadingView>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub chrome: PageChrome,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub chrome: PageChrome,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "disclaimer.html")]
pub struct DisclaimerTemplate {
    pub chrome: PageChrome,
    pub action: String,
}

#[derive(Template)]
#[template(path = "age_select.html")]
pub struct AgeSelectTemplate {
    pub chrome: PageChrome,
    pub action: String,
    pub options: Vec<AgeOptionView>,
}

#[derive(Template)]
#[template(path = "homepage.html")]
pub struct HomepageTemplate {
    pub chrome: PageChrome,
    pub banner: BannerView,
    pub symptoms: Vec<LinkView>,
}

#[derive(Template)]
#[template(path = "symptom.html")]
pub struct SymptomTemplate {
    pub chrome: PageChrome,
    pub banner: BannerView,
    pub label: String,
    pub description: Option<String>,
    pub headings: Vec<HeadingRecord>,
}

#[derive(Template)]
#[template(path = "heading.html")]
pub struct HeadingTemplate {
    pub chrome: PageChrome,
    pub banner: BannerView,
    pub heading: HeadingRecord,
    pub sub_headings: Vec<SubHeadingRecord>,
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub chrome: PageChrome,
}

#[derive(Template)]
#[template(path = "map.html")]
pub struct MapTemplate {
    pub chrome: PageChrome,
    pub api_key: Option<String>,
}

#[derive(Template)]
#[template(path = "my_child.html")]
pub struct MyChildTemplate {
    pub chrome: PageChrome,
    pub children: Vec<ChildView>,
    pub error: Option<String>,
    pub today: String,
}

#[derive(Template)]
#[template(path = "child_manage.html")]
pub struct ChildManageTemplate {
    pub chrome: PageChrome,
    pub children: Vec<ChildView>,
    pub error: Option<String>,
    pub today: String,
}

#[derive(Template)]
#[template(path = "diary.html")]
pub struct DiaryTemplate {
    pub chrome: PageChrome,
    pub children: Vec<ChildRecord>,
}

#[derive(Template)]
#[template(path = "diary_logs.html")]
pub struct DiaryLogsTemplate {
    pub chrome: PageChrome,
    pub child: ChildRecord,
    pub logs: Vec<DiaryLogView>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub chrome: PageChrome,
    pub symptoms: Vec<CategoryRecord>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin_symptom.html")]
pub struct AdminSymptomTemplate {
    pub chrome: PageChrome,
    pub category: CategoryRecord,
    pub headings: Vec<AdminHeadingView>,
}

#[derive(Template)]
#[template(path = "admin_heading.html")]
pub struct AdminHeadingTemplate {
    pub chrome: PageChrome,
    pub heading_id: i64,
    pub category_id: i64,
    pub text: String,
    pub symptoms: Vec<CategoryRecord>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin_subheading.html")]
pub struct AdminSubHeadingTemplate {
    pub chrome: PageChrome,
    pub heading_id: i64,
    pub sub_heading_id: i64,
    pub title: String,
    pub text: String,
    pub options: Vec<AgeOptionView>,
    pub headings: Vec<HeadingRecord>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub chrome: PageChrome,
}
