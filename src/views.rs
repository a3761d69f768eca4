//! HTML pages rendered with Handlebars. Interpolated values are HTML-escaped
//! by the registry's default escape function.

use handlebars::Handlebars;
use serde::Serialize;

use crate::{flash::Flash, users::model::Colour};

const FORM: &str = "form";
const RESULT: &str = "result";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Template registration failed: {source}")]
    Template {
        #[source]
        source: Box<handlebars::TemplateError>,
    },
    #[error("Template rendering failed: {source}")]
    Render {
        #[source]
        source: handlebars::RenderError,
    },
}

#[derive(Serialize)]
struct FormContext {
    colours: Vec<String>,
}

#[derive(Serialize)]
struct ResultContext<'a> {
    flash: Option<&'a Flash>,
}

/// Registry holding the `form` and `result` page templates.
pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self, Error> {
        let mut registry = Handlebars::new();
        for (name, source) in [
            (FORM, include_str!("../templates/form.hbs")),
            (RESULT, include_str!("../templates/result.hbs")),
        ] {
            registry
                .register_template_string(name, source)
                .map_err(|e| Error::Template {
                    source: Box::new(e),
                })?;
        }
        Ok(Self { registry })
    }

    pub fn form_page(&self) -> Result<String, Error> {
        let context = FormContext {
            colours: Colour::ALL.iter().map(Colour::to_string).collect(),
        };
        self.render(FORM, &context)
    }

    pub fn result_page(&self, flash: Option<&Flash>) -> Result<String, Error> {
        self.render(RESULT, &ResultContext { flash })
    }

    fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String, Error> {
        self.registry
            .render(name, context)
            .map_err(|e| Error::Render { source: e })
    }
}
