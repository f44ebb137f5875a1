// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Template evaluation.
//!
//! Mappings deployed by copy can carry a set of template variables. Both the
//! variable values themselves, and the contents of the source file are
//! rendered through [`Template`]. Templates are parsed once, and can be
//! rendered as many times as needed against different [`TemplateVars`].
//!
//! # Missing Variables
//!
//! Referencing a variable that is not defined is never an error. Instead the
//! literal [`NO_VALUE`] placeholder is rendered in its place, so a typo in a
//! manifest shows up in the deployed file rather than aborting the whole
//! deployment.
//!
//! # Syntax
//!
//! Templates use Jinja syntax, e.g., `{{ Os }}` renders the name of the
//! current operating system.

use indexmap::IndexMap;
use minijinja::{escape_formatter, Environment, ErrorKind, UndefinedBehavior, Value};

/// Placeholder rendered for undefined variables.
pub const NO_VALUE: &str = "<no value>";

const TEMPLATE_NAME: &str = "template";

/// Variables available to a template during rendering.
pub type TemplateVars = IndexMap<String, String>;

/// Parsed template ready for rendering.
#[derive(Debug)]
pub struct Template {
    env: Environment<'static>,
}

impl Template {
    /// Parse template source.
    ///
    /// # Errors
    ///
    /// - Return [`TemplateError::Parse`] if template syntax is invalid.
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_formatter(|out, state, value| {
            if value.is_undefined() {
                return out.write_str(NO_VALUE).map_err(|_| {
                    minijinja::Error::new(ErrorKind::WriteFailure, "cannot write placeholder")
                });
            }

            escape_formatter(out, state, value)
        });
        env.add_template_owned(TEMPLATE_NAME, source.into())
            .map_err(TemplateError::Parse)?;

        Ok(Self { env })
    }

    /// Render template with given variables.
    ///
    /// # Errors
    ///
    /// - Return [`TemplateError::Render`] if rendering fails, e.g., calling a
    ///   filter with bad arguments.
    pub fn render(&self, vars: &TemplateVars) -> Result<String> {
        self.env
            .get_template(TEMPLATE_NAME)
            .and_then(|template| template.render(Value::from_serialize(vars)))
            .map_err(TemplateError::Render)
    }
}

/// Parse and render template source in one shot.
///
/// # Errors
///
/// - Return [`TemplateError`] if parsing or rendering fails.
pub fn render_str(source: impl Into<String>, vars: &TemplateVars) -> Result<String> {
    Template::parse(source)?.render(vars)
}

/// Template error types.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Template source cannot be parsed.
    #[error("failed to parse template")]
    Parse(#[source] minijinja::Error),

    /// Template cannot be rendered.
    #[error("failed to render template")]
    Render(#[source] minijinja::Error),
}

/// Friendly result alias :3
pub type Result<T, E = TemplateError> = std::result::Result<T, E>;
