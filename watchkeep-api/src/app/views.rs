//! View models and askama templates for the HTML pages.

use askama::Template;
use axum::http::StatusCode;
use axum::response::Html;
use chrono::{DateTime, Utc};
use watchkeep_core::runtime::format_uptime;
use watchkeep_core::status::status_tone;
use watchkeep_core::{describe_status, EventTable, RunInfo, Service, VERSION};

use super::ApiError;

/// Header and footer data shared by every page.
pub struct Shell {
    pub title: String,
    pub host: String,
    pub uptime: String,
    pub signature: bool,
    pub version: &'static str,
}

impl Shell {
    pub fn new(run: &RunInfo, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            host: run.hostname.clone(),
            uptime: format_uptime(run.uptime_secs(), " "),
            signature: run.signature,
            version: VERSION,
        }
    }
}

/// Text with an optional colour class.
pub struct Span {
    pub text: String,
    pub class: &'static str,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: "",
        }
    }

    pub fn toned(text: impl Into<String>, class: &'static str) -> Self {
        Self {
            text: text.into(),
            class,
        }
    }
}

pub struct Link {
    pub href: String,
    pub text: String,
}

impl Link {
    /// Link to a service's detail page.
    pub fn service(name: &str) -> Self {
        Self {
            href: format!("/{}", link_name(name)),
            text: name.to_string(),
        }
    }
}

pub enum Value {
    Text(String),
    Status(Span),
    Links(Vec<Link>),
}

pub struct Row {
    pub key: String,
    pub value: Value,
}

/// Builder for a two-column parameter table.
#[derive(Default)]
pub struct Params {
    rows: Vec<Row>,
}

impl Params {
    fn push(&mut self, key: &str, value: Value) -> &mut Self {
        self.rows.push(Row {
            key: key.to_string(),
            value,
        });
        self
    }

    pub fn text(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.push(key, Value::Text(value.into()))
    }

    pub fn status(&mut self, key: &str, span: Span) -> &mut Self {
        self.push(key, Value::Status(span))
    }

    pub fn links(&mut self, key: &str, links: Vec<Link>) -> &mut Self {
        self.push(key, Value::Links(links))
    }

    pub fn finish(self) -> Vec<Row> {
        self.rows
    }
}

/// A single-button form posting `action` to `target`.
pub struct Button {
    pub target: String,
    pub action: &'static str,
    pub label: &'static str,
}

impl Button {
    pub fn new(target: &str, action: &'static str, label: &'static str) -> Self {
        Self {
            target: target.to_string(),
            action,
            label,
        }
    }
}

/// One dashboard table: all services of a type.
pub struct Section {
    pub columns: &'static [&'static str],
    pub rows: Vec<DashboardRow>,
}

pub struct DashboardRow {
    pub link: Link,
    pub status: Span,
    pub cells: Vec<Vec<Span>>,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub shell: Shell,
    pub sections: Vec<Section>,
}

#[derive(Template)]
#[template(path = "service.html")]
pub struct ServicePage {
    pub shell: Shell,
    pub heading: String,
    pub rows: Vec<Row>,
    pub buttons: Vec<Button>,
}

#[derive(Template)]
#[template(path = "runtime.html")]
pub struct RuntimePage {
    pub shell: Shell,
    pub rows: Vec<Row>,
    pub buttons: Vec<Button>,
    pub view_log: bool,
}

#[derive(Template)]
#[template(path = "viewlog.html")]
pub struct ViewLogPage {
    pub shell: Shell,
    pub heading: String,
    pub contents: Option<String>,
    pub note: Option<String>,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutPage {
    pub shell: Shell,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage<'a> {
    pub code: u16,
    pub reason: &'a str,
    pub message: &'a str,
}

/// Renders a page, turning template failures into a 500.
pub fn render<T: Template>(page: &T) -> Result<Html<String>, ApiError> {
    page.render().map(Html).map_err(|e| {
        tracing::error!(error = %e, "page render failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Cannot render page")
    })
}

/// Percent-encodes a service name for use as a path segment.
pub fn link_name(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

pub fn time_or_dash(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%a, %d %b %Y %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Status label in its colour class.
pub fn status_span(service: &Service, table: &EventTable) -> Span {
    Span::toned(
        describe_status(service, table),
        status_tone(service).css_class(),
    )
}
