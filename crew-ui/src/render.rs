//! HTML page rendering.

use anyhow::{Context, Result};
use crew::core::types::{Badge, MAX_ITERATIONS, MIN_ITERATIONS, PipelineResult};
use minijinja::{Environment, context};
use serde::Serialize;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// One line of the "Test Case Results" list.
#[derive(Debug, Serialize)]
struct TestLine<'a> {
    badge: &'static str,
    text: &'a str,
}

/// What the page shows below the form.
#[derive(Debug, Default)]
pub enum PageBody<'a> {
    #[default]
    Empty,
    Warning(&'a str),
    Result(&'a PipelineResult),
    Error(&'a str),
}

/// Compiled page templates. `.html` names get HTML auto-escaping.
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)
            .context("compile index template")?;
        Ok(Self { env })
    }

    /// Render the form, pre-filled with the submitted values, plus `body`.
    pub fn index(
        &self,
        language: &str,
        requirement: &str,
        max_iterations: u32,
        body: PageBody<'_>,
    ) -> Result<String> {
        let (warning, error, result) = match body {
            PageBody::Empty => (None, None, None),
            PageBody::Warning(text) => (Some(text), None, None),
            PageBody::Error(text) => (None, Some(text), None),
            PageBody::Result(result) => (None, None, Some(result)),
        };
        let test_lines: Vec<TestLine<'_>> = result
            .map(|result| {
                result
                    .test_summary
                    .iter()
                    .map(|line| TestLine {
                        badge: Badge::for_line(line).as_str(),
                        text: line,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let template = self.env.get_template("index.html")?;
        template
            .render(context! {
                language,
                requirement,
                max_iterations,
                min_iterations => MIN_ITERATIONS,
                max_iterations_limit => MAX_ITERATIONS,
                warning,
                error,
                result,
                test_lines,
            })
            .context("render index page")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> PipelineResult {
        PipelineResult {
            final_code: "print('<ok>')".to_string(),
            transcript: "## Code Reviewer\n\nAPPROVED".to_string(),
            test_summary: vec![
                "Test Case 1: PASS".to_string(),
                "Test Case 2: FAIL".to_string(),
                "Test results parsing failed: No JSON found in output".to_string(),
            ],
            iterations_run: 1,
            approved: true,
        }
    }

    #[test]
    fn empty_page_has_form_defaults() {
        let pages = Pages::new().expect("pages");
        let html = pages
            .index("Python", "", 1, PageBody::Empty)
            .expect("render");

        assert!(html.contains(r#"min="1" max="5""#));
        assert!(html.contains(r#"value="1""#));
        assert!(html.contains("Run Pipeline"));
        assert!(!html.contains("Final Code"));
    }

    #[test]
    fn result_page_badges_each_line() {
        let pages = Pages::new().expect("pages");
        let result = result();
        let html = pages
            .index("Python", "reverse", 2, PageBody::Result(&result))
            .expect("render");

        assert!(html.contains(r#"<div class="badge success">Test Case 1: PASS</div>"#));
        assert!(html.contains(r#"<div class="badge error">Test Case 2: FAIL</div>"#));
        assert!(html.contains(r#"<div class="badge warning">Test results parsing failed"#));
        assert!(html.contains("Full Pipeline Output"));
        assert!(html.contains(r#"value="2""#));
    }

    #[test]
    fn agent_output_is_escaped() {
        let pages = Pages::new().expect("pages");
        let result = result();
        let html = pages
            .index("Python", "", 1, PageBody::Result(&result))
            .expect("render");

        assert!(html.contains("print(&#x27;&lt;ok&gt;&#x27;)"));
        assert!(!html.contains("<ok>"));
    }

    #[test]
    fn warning_is_shown() {
        let pages = Pages::new().expect("pages");
        let html = pages
            .index("Python", "", 1, PageBody::Warning("Please enter a programming task!"))
            .expect("render");

        assert!(html.contains("Please enter a programming task!"));
    }
}
