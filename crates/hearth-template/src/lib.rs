//! Template collaborator contract for Hearth
//!
//! The template engine itself lives elsewhere; the tracking layer treats
//! it as opaque. What it needs from an engine is captured here: given a
//! template and variables, produce either a rendered string or a
//! [`TemplateError`], together with an [`EntityFilter`] describing which
//! entities that render depended on.

mod error;
mod filter;

pub use error::{TemplateError, TemplateResult};
pub use filter::EntityFilter;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Variables passed to a template render
pub type TemplateVars = HashMap<String, serde_json::Value>;

/// Opaque handle to a template expression
///
/// Serializes as the bare source string, so templates embed directly in
/// automation and trigger configuration payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template {
    source: String,
}

impl Template {
    /// Create a template from its source text
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The source text of the template
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// The outcome of one template render
///
/// The filter is produced even when the render fails: "what this
/// template currently depends on" is independent of whether the last
/// render succeeded.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// The rendered string, or the error the render raised
    pub result: TemplateResult<String>,
    /// The entities the render referenced
    pub filter: EntityFilter,
}

/// The contract the tracking layer consumes from a template engine
pub trait TemplateEngine: Send + Sync {
    /// Render `template` with `variables`, collecting referenced entities
    fn render_with_collect(&self, template: &Template, variables: &TemplateVars) -> RenderOutcome;
}

/// Convert a rendered template result to a boolean
///
/// "1", "true", "yes", "on" and "enable" are truthy; "0", "false",
/// "no", "off" and "disable" are falsy; any other numeric string is
/// truthy when non-zero. Everything else is false.
pub fn result_as_boolean(result: &str) -> bool {
    match result.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enable" => true,
        "0" | "false" | "no" | "off" | "disable" => false,
        other => other.parse::<f64>().map(|n| n != 0.0).unwrap_or(false),
    }
}
