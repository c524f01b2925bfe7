//! Prompt assembly.

use std::fmt::Write as _;
use std::path::Path;

use ollm_core::conversation::{Mode, Tier};
use ollm_core::tokens::{CountTokens, SurrogateCounter};
use ollm_tools::ToolDescriptor;

use crate::skills::{Skill, render_skills_section};
use crate::templates::{CORE_MANDATES, SANITY_CHECKS, tier_mode_template};

/// Everything the builder needs. All borrowed; building never mutates.
#[derive(Clone, Debug)]
pub struct PromptInputs<'a> {
    /// Operational mode.
    pub mode: Mode,
    /// Session tier.
    pub tier: Tier,
    /// Mode-filtered tool descriptors, already ordered.
    pub tools: &'a [ToolDescriptor],
    /// Whether the model supports tool calling at all. When false the tool
    /// section is omitted entirely.
    pub supports_tool_calling: bool,
    /// Active skills, in activation order.
    pub skills: &'a [Skill],
    /// Paths the UI has pinned.
    pub focused_files: &'a [String],
    /// Content of `<workspace>/.ollm/ollm.md`, if present.
    pub project_rules: Option<&'a str>,
}

/// The assembled prompt and its token cost.
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltPrompt {
    /// Canonical prompt text.
    pub text: String,
    /// Token cost under the surrogate counter.
    pub token_count: u32,
}

/// Assemble the system prompt.
///
/// Pure: identical inputs produce byte-identical output. Sections are
/// joined in the fixed order template, mandates, tools, skills, sanity
/// checks (tiers 1 and 2 only), project rules, focused files.
#[must_use]
pub fn build(inputs: &PromptInputs<'_>) -> BuiltPrompt {
    let mut sections: Vec<String> = Vec::with_capacity(7);

    sections.push(tier_mode_template(inputs.mode, inputs.tier));
    sections.push(CORE_MANDATES.to_owned());

    if inputs.supports_tool_calling && !inputs.tools.is_empty() {
        sections.push(render_tools_section(inputs.tools));
    }

    let skills = render_skills_section(inputs.skills);
    if !skills.is_empty() {
        sections.push(skills);
    }

    if matches!(inputs.tier, Tier::Minimal | Tier::Basic) {
        sections.push(SANITY_CHECKS.to_owned());
    }

    if let Some(rules) = inputs.project_rules {
        if !rules.trim().is_empty() {
            sections.push(format!("# Project rules\n{}", rules.trim_end()));
        }
    }

    if !inputs.focused_files.is_empty() {
        sections.push(render_focused_files(inputs.focused_files));
    }

    let text = sections.join("\n\n");
    let token_count = SurrogateCounter.count(&text);
    BuiltPrompt { text, token_count }
}

fn render_tools_section(tools: &[ToolDescriptor]) -> String {
    let mut out = String::from(
        "# Tools\nCall a tool by emitting a tool call with its id and JSON arguments.",
    );
    for tool in tools {
        let _ = write!(out, "\n\n## {}\n{}", tool.id, tool.description);
        if !tool.parameters.is_null() {
            let _ = write!(out, "\nArguments schema: {}", tool.parameters);
        }
    }
    out
}

fn render_focused_files(paths: &[String]) -> String {
    let mut out = String::from(
        "# Focused files\nThe user has pinned these files as directly relevant to the \
         current task. Prefer them when resolving ambiguous references:",
    );
    for path in paths {
        out.push_str("\n- ");
        out.push_str(path);
    }
    out
}

/// Read `<workspace>/.ollm/ollm.md` if it exists.
#[must_use]
pub fn load_project_rules(workspace_dir: &Path) -> Option<String> {
    let path = workspace_dir.join(".ollm").join("ollm.md");
    std::fs::read_to_string(path).ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
