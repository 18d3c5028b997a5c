//! Render Unit
//!
//! The template-facing half of the crate: turns one [`RenderRequest`] into a
//! placeholder element holding the server-rendered markup, followed by the
//! inline script that hydrates it in the browser.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};

lazy_static! {
    static ref TAG_NAME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").unwrap();
}

pub const DEFAULT_TAG: &str = "div";

/// Where the unit gets its markup from.
pub trait MarkupSource: Send + Sync {
    /// Whether markup should be rendered on the server at all.
    fn prerender(&self) -> bool;

    fn render_markup(&self, component: &str, properties: &Map<String, Value>) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub component: String,
    pub tag: String,
    pub id: Option<String>,
    pub css_class: Option<String>,
    pub properties: Map<String, Value>,
}

impl RenderRequest {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            tag: DEFAULT_TAG.to_string(),
            id: None,
            css_class: None,
            properties: Map::new(),
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn css_class(mut self, css_class: impl Into<String>) -> Self {
        self.css_class = Some(css_class.into());
        self
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn props(mut self, properties: Map<String, Value>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Merges the fields of any serializable struct or map into the properties.
    pub fn props_from<T: Serialize>(self, properties: &T) -> Result<Self> {
        match serde_json::to_value(properties) {
            Ok(Value::Object(map)) => Ok(self.props(map)),
            Ok(other) => Err(Error::Render(format!(
                "properties for '{}' must be an object, got {}",
                self.component, other
            ))),
            Err(e) => Err(Error::Render(format!(
                "properties for '{}' are not JSON-serializable: {}",
                self.component, e
            ))),
        }
    }

    /// Component name with `.` turned into `-`, plus the caller's class.
    pub fn class_attribute(&self) -> String {
        let mut class = self.component.replace('.', "-");
        if let Some(extra) = &self.css_class {
            class.push(' ');
            class.push_str(extra);
        }
        class
    }
}

/// Template-insertable unit, registered with the host under [`JsxModule::NAME`].
#[derive(Clone)]
pub struct JsxModule {
    source: Arc<dyn MarkupSource>,
}

impl std::fmt::Debug for JsxModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsxModule")
            .field("prerender", &self.source.prerender())
            .finish()
    }
}

impl JsxModule {
    pub const NAME: &'static str = "JSX";

    pub fn new(source: Arc<dyn MarkupSource>) -> Self {
        Self { source }
    }

    /// `render(component, tag="div", id=None, css_class=None, **properties)`
    pub fn render_with(&self, component: &str, properties: Map<String, Value>) -> Result<String> {
        self.render(RenderRequest::new(component).props(properties))
    }

    pub fn render(&self, request: RenderRequest) -> Result<String> {
        if !TAG_NAME_RE.is_match(&request.tag) {
            return Err(Error::Render(format!("invalid element tag '{}'", request.tag)));
        }

        let element_id = request
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let props_json = serde_json::to_string(&request.properties)
            .map_err(|e| Error::Render(format!("failed to encode properties: {}", e)))?;
        let class = request.class_attribute();

        let prerender = self.source.prerender();
        let markup = if prerender {
            self.source
                .render_markup(&request.component, &request.properties)?
        } else {
            String::new()
        };

        Ok(format!(
            "<{tag} id=\"{id}\" class=\"{class}\">{markup}</{tag}>{script}",
            tag = request.tag,
            id = escape_html(&element_id),
            class = escape_html(&class),
            markup = markup,
            script = hydration_script(&request.component, &element_id, &props_json, prerender),
        ))
    }
}

/// Inline script mounting the live component into the element with `element_id`.
///
/// Server markup is hydrated in place; an empty element gets a fresh client root.
pub fn hydration_script(component: &str, element_id: &str, props_json: &str, hydrate: bool) -> String {
    let element = format!(
        "require(\"react\").createElement(require({}), {})",
        js_string(component),
        props_json
    );
    let target = format!("document.getElementById({})", js_string(element_id));
    let code = if hydrate {
        format!("require(\"react-dom/client\").hydrateRoot({}, {});", target, element)
    } else {
        format!("require(\"react-dom/client\").createRoot({}).render({});", target, element)
    };
    format!("<script>{}</script>", escape_script(&code))
}

fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Keeps `</script>` and `<!--` inside string data from ending the script block.
fn escape_script(code: &str) -> String {
    code.replace("</", "<\\/").replace("<!--", "<\\!--")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\"', "&quot;")
        .replace('\'', "&#39;")
}
