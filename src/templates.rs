use axum::response::Html;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tera::{Context, Tera};

use crate::{error::SiteResult, listing::format_date};

/// Every page template, embedded in the binary.
const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("macros.html", include_str!("../templates/macros.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("about.html", include_str!("../templates/about.html")),
    ("work.html", include_str!("../templates/work.html")),
    ("centers.html", include_str!("../templates/centers.html")),
    ("ecosystem.html", include_str!("../templates/ecosystem.html")),
    ("publications.html", include_str!("../templates/publications.html")),
    ("post_detail.html", include_str!("../templates/post_detail.html")),
    ("gallery.html", include_str!("../templates/gallery.html")),
    ("videos.html", include_str!("../templates/videos.html")),
    ("contact.html", include_str!("../templates/contact.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
    ("editor.html", include_str!("../templates/editor.html")),
    ("admin.html", include_str!("../templates/admin.html")),
    ("not_found.html", include_str!("../templates/not_found.html")),
];

/// Templates
///
/// Shared, immutable tera instance. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct Templates {
    tera: Arc<Tera>,
}

impl Templates {
    /// new
    ///
    /// Parses the embedded templates and registers the site's filters.
    /// Fails at startup rather than on first render when a template is broken.
    pub fn new() -> SiteResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        tera.register_filter("short_date", date_filter(false));
        tera.register_filter("long_date", date_filter(true));
        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    pub fn render(&self, template: &str, ctx: &Context) -> SiteResult<Html<String>> {
        let html = self.tera.render(template, ctx).inspect_err(|e| {
            tracing::error!(template, error = ?e, "template rendering failed");
        })?;
        Ok(Html(html))
    }
}

/// `{{ post.published_at | short_date }}` -> "Jan 5, 2024", or "N/A" for null.
fn date_filter(
    long: bool,
) -> impl Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync {
    move |value, _args| Ok(Value::String(format_date(value.as_str(), long)))
}
