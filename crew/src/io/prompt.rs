//! Prompt pack builder for agent tasks.
//!
//! Each task prompt is rendered from a minijinja template into marked
//! sections. When the rendered prompt exceeds the byte budget, context from
//! earlier stages is dropped oldest-first before anything required is cut.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::agents::Agent;
use crate::agents::tasks::Task;

const PERSONA_TEMPLATE: &str = include_str!("prompts/persona.md");
const TASK_TEMPLATE: &str = include_str!("prompts/task.md");

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->")
        .expect("section marker regex should be valid")
});

/// Output of an earlier stage, shown to later agents.
#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
    pub role: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
struct TaskContext<'a> {
    description: &'a str,
    expected_output: &'a str,
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("persona", PERSONA_TEMPLATE)
            .context("load persona template")?;
        env.add_template("task", TASK_TEMPLATE)
            .context("load task template")?;
        Ok(Self { env })
    }

    fn render_persona(&self, agent: &Agent) -> Result<String> {
        let template = self.env.get_template("persona")?;
        let rendered = template.render(context! { agent => agent })?;
        Ok(rendered.trim().to_string())
    }

    fn render_task(&self, task: &Task, prior: &[ContextEntry]) -> Result<String> {
        let template = self.env.get_template("task")?;
        let context: Vec<ContextEntry> = prior
            .iter()
            .filter(|entry| !entry.output.trim().is_empty())
            .map(|entry| ContextEntry {
                role: entry.role.clone(),
                output: entry.output.trim().to_string(),
            })
            .collect();
        let rendered = template.render(context! {
            task => TaskContext {
                description: task.description.trim(),
                expected_output: task.expected_output.trim(),
            },
            context => context,
        })?;
        Ok(rendered)
    }
}

/// A parsed section from rendered template output.
#[derive(Debug, Clone)]
struct ParsedSection {
    /// Section identifier (e.g., "task", "context_1").
    key: String,
    /// Whether this section is required (cannot be dropped).
    required: bool,
    /// Section content excluding the marker.
    content: String,
}

/// Parse sections from rendered template output using HTML comment markers.
///
/// Markers follow format: `<!-- section:KEY required|droppable -->`
fn parse_sections(rendered: &str) -> Vec<ParsedSection> {
    let markers: Vec<(usize, usize, String, bool)> = SECTION_RE
        .captures_iter(rendered)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps.get(1)?.as_str().to_string();
            let required = caps.get(2)?.as_str() == "required";
            Some((whole.start(), whole.end(), key, required))
        })
        .collect();

    let mut sections = Vec::new();
    for (i, (_, body_start, key, required)) in markers.iter().enumerate() {
        let end = markers
            .get(i + 1)
            .map(|(next_start, ..)| *next_start)
            .unwrap_or(rendered.len());
        let content = rendered[*body_start..end].trim().to_string();
        if !content.is_empty() || *required {
            sections.push(ParsedSection {
                key: key.clone(),
                required: *required,
                content,
            });
        }
    }

    sections
}

const SECTION_SEPARATOR: &str = "\n\n";
const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Length of the sections once joined by [`render_sections`].
fn total_len(sections: &[ParsedSection]) -> usize {
    let body: usize = sections.iter().map(|s| s.content.len()).sum();
    body + SECTION_SEPARATOR.len() * sections.len().saturating_sub(1)
}

/// Apply budget to parsed sections.
///
/// Droppable sections go first, in order of appearance. If the required
/// sections alone are still over budget, the largest one is cut down, and
/// then the next largest, until the joined prompt fits.
fn apply_budget_to_sections(sections: &mut Vec<ParsedSection>, budget: usize) {
    while total_len(sections) > budget {
        let Some(idx) = sections.iter().position(|s| !s.required) else {
            break;
        };
        let dropped = sections.remove(idx);
        debug!(
            section = %dropped.key,
            bytes_dropped = dropped.content.len(),
            "dropped section for budget"
        );
    }

    while total_len(sections) > budget {
        let excess = total_len(sections) - budget;
        let Some(largest) = sections
            .iter_mut()
            .filter(|s| !s.content.is_empty())
            .max_by_key(|s| s.content.len())
        else {
            break;
        };
        let before_len = largest.content.len();
        let allowed = before_len.saturating_sub(excess);
        if allowed > TRUNCATION_MARKER.len() {
            truncate_at_char_boundary(&mut largest.content, allowed - TRUNCATION_MARKER.len());
            largest.content.push_str(TRUNCATION_MARKER);
        } else {
            truncate_at_char_boundary(&mut largest.content, allowed);
        }
        debug!(
            section = %largest.key,
            before_len,
            after_len = largest.content.len(),
            "truncated section for budget"
        );
    }
}

fn truncate_at_char_boundary(text: &mut String, max_len: usize) {
    let mut cut = max_len.min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

/// Render sections back to a single string.
fn render_sections(sections: &[ParsedSection]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Builds task prompts within a byte budget.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_bytes: usize,
}

impl PromptBuilder {
    /// Create a builder with the given byte budget for the task prompt.
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    /// Build the prompt pack for `task`, given the outputs of earlier stages.
    pub fn build(&self, task: &Task, prior: &[ContextEntry]) -> Result<PromptPack> {
        let engine = PromptEngine::new()?;
        let system = engine
            .render_persona(task.agent)
            .context("render persona prompt")?;
        let rendered = engine
            .render_task(task, prior)
            .context("render task prompt")?;

        let mut sections = parse_sections(&rendered);
        apply_budget_to_sections(&mut sections, self.budget_bytes);

        Ok(PromptPack {
            system,
            content: render_sections(&sections),
        })
    }
}

/// A rendered prompt ready to send to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPack {
    /// Agent persona, sent as the system instruction where the backend supports one.
    pub system: String,
    /// Task instructions plus earlier-stage context.
    pub content: String,
}

impl PromptPack {
    /// Single-string form for backends without a separate system channel.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.content)
    }
}
