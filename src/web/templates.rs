use crate::error::AppResult;
use crate::panel::{KeyDetail, KeyListItem, PanelView};
use askama::Template;
use axum::response::Html;

/// `<option>` entry for a select box.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn list<I, S>(values: I, current: &str) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values
            .into_iter()
            .map(|v| {
                let value = v.into();
                let selected = value.eq_ignore_ascii_case(current.trim());
                Self { value, selected }
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub panel: PanelView,
    pub items: Vec<KeyListItem>,
    pub q: String,
    pub types: Vec<SelectOption>,
    pub statuses: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "detail.html")]
pub struct DetailTemplate {
    pub panel: PanelView,
    pub item: Option<KeyDetail>,
    pub error: String,
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub panel: PanelView,
    pub admin_path: String,
    pub login_mode: bool,
    pub error: String,
    pub keys: Vec<KeyListItem>,
    pub origin: String,
    pub key_types: Vec<SelectOption>,
    pub default_gb_limit: i64,
    pub default_expire_date: String,
    pub announce_md: String,
    pub announce_enabled: bool,
}

/// Render a template into an HTML response body.
pub fn render<T: Template>(template: &T) -> AppResult<Html<String>> {
    Ok(Html(template.render()?))
}
