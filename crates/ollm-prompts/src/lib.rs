//! # ollm-prompts
//!
//! The system prompt orchestrator.
//!
//! [`builder::build`] assembles the canonical system-prompt text from the
//! tier+mode template, core mandates, mode-filtered tool descriptions,
//! active skills, tier sanity checks, project rules, and focused files,
//! in that fixed order, and reports its token cost. The function is pure:
//! byte-identical output for identical inputs, so the context manager can
//! cache the result until mode, tools, skills, or focused files change.

#![deny(unsafe_code)]

pub mod builder;
pub mod filter;
pub mod skills;
pub mod templates;

pub use builder::{BuiltPrompt, PromptInputs, build, load_project_rules};
pub use filter::allowed_tool_ids;
pub use skills::{Skill, SkillRegistry};
