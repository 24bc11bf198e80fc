//! Prompt rendering for every oracle request.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::action::ActionKind;

const PLAN_TEMPLATE: &str = include_str!("prompts/plan.md");
const EVALUATE_TEMPLATE: &str = include_str!("prompts/evaluate.md");
const GAPS_TEMPLATE: &str = include_str!("prompts/gaps.md");
const NEW_CONTENT_TEMPLATE: &str = include_str!("prompts/new_content.md");
const FEATURE_INSIGHT_TEMPLATE: &str = include_str!("prompts/feature_insight.md");
const FILE_SUMMARY_TEMPLATE: &str = include_str!("prompts/file_summary.md");
const OVERALL_INSIGHT_TEMPLATE: &str = include_str!("prompts/overall_insight.md");
const FILE_OVERVIEW_TEMPLATE: &str = include_str!("prompts/file_overview.md");

/// Catalog entry as rendered into the plan prompt.
#[derive(Debug, Clone, Serialize)]
struct ActionContext {
    name: &'static str,
    description: &'static str,
    args: Vec<ArgContext>,
}

#[derive(Debug, Clone, Serialize)]
struct ArgContext {
    name: &'static str,
    hint: &'static str,
    required: bool,
}

fn catalog() -> Vec<ActionContext> {
    ActionKind::ALL
        .iter()
        .map(|kind| ActionContext {
            name: kind.as_str(),
            description: kind.description(),
            args: kind
                .args()
                .iter()
                .map(|spec| ArgContext {
                    name: spec.name,
                    hint: spec.hint,
                    required: spec.is_required(),
                })
                .collect(),
        })
        .collect()
}

/// File summary as rendered into the overall-insight prompt.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryInput<'a> {
    pub file: &'a str,
    pub summary: &'a str,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        for (name, source) in [
            ("plan", PLAN_TEMPLATE),
            ("evaluate", EVALUATE_TEMPLATE),
            ("gaps", GAPS_TEMPLATE),
            ("new_content", NEW_CONTENT_TEMPLATE),
            ("feature_insight", FEATURE_INSIGHT_TEMPLATE),
            ("file_summary", FILE_SUMMARY_TEMPLATE),
            ("overall_insight", OVERALL_INSIGHT_TEMPLATE),
            ("file_overview", FILE_OVERVIEW_TEMPLATE),
        ] {
            env.add_template(name, source)
                .expect("embedded prompt templates should be valid");
        }
        Self { env }
    }

    /// Plan-generation prompt: objective, dependencies, catalog and planning rules.
    pub fn render_plan(&self, objective: &str, dependencies: &[String]) -> Result<String> {
        let template = self.env.get_template("plan")?;
        Ok(template.render(context! {
            objective => objective.trim(),
            dependencies => dependencies,
            actions => catalog(),
        })?)
    }

    pub fn render_evaluate(&self, objective: &str) -> Result<String> {
        let template = self.env.get_template("evaluate")?;
        Ok(template.render(context! { objective => objective.trim() })?)
    }

    pub fn render_gaps(&self, file_name: &str, content: &str, areas: &[String]) -> Result<String> {
        let template = self.env.get_template("gaps")?;
        Ok(template.render(context! {
            file_name => file_name,
            content => content,
            areas => areas,
        })?)
    }

    pub fn render_new_content(&self, existing_content: &str, change_description: &str) -> Result<String> {
        let template = self.env.get_template("new_content")?;
        Ok(template.render(context! {
            existing_content => existing_content,
            change_description => change_description.trim(),
        })?)
    }

    pub fn render_feature_insight(&self, overview: &str, file: &str, feature: &str) -> Result<String> {
        let template = self.env.get_template("feature_insight")?;
        Ok(template.render(context! {
            overview => overview_or_unknown(overview),
            file => file,
            feature => feature,
        })?)
    }

    pub fn render_file_summary(&self, file: &str, features: &[String], insights: &[String]) -> Result<String> {
        let template = self.env.get_template("file_summary")?;
        Ok(template.render(context! {
            file => file,
            features => features,
            insights => insights,
        })?)
    }

    pub fn render_overall_insight(&self, overview: &str, summaries: &[SummaryInput<'_>]) -> Result<String> {
        let template = self.env.get_template("overall_insight")?;
        Ok(template.render(context! {
            overview => overview_or_unknown(overview),
            summaries => summaries,
        })?)
    }

    /// Header-comment overview for one file, from its analysis summary.
    pub fn render_file_overview(&self, file: &str, summary: &str) -> Result<String> {
        let template = self.env.get_template("file_overview")?;
        Ok(template.render(context! {
            file => file,
            summary => summary.trim(),
        })?)
    }
}

fn overview_or_unknown(overview: &str) -> &str {
    let trimmed = overview.trim();
    if trimmed.is_empty() {
        "(no overview available)"
    } else {
        trimmed
    }
}
