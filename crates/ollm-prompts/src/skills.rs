//! Skills: named knowledge templates.
//!
//! Skills are not executable. An active skill's content is rendered
//! verbatim as a prompt section so the model carries the knowledge for the
//! rest of the session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One knowledge template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    /// Addressable name.
    pub name: String,
    /// One-line description for pickers.
    pub description: String,
    /// The template body injected into the prompt.
    pub content: String,
}

/// Name-keyed skill collection.
#[derive(Clone, Debug, Default)]
pub struct SkillRegistry {
    skills: BTreeMap<String, Skill>,
}

impl SkillRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a skill; re-registering a name replaces it.
    pub fn register(&mut self, skill: Skill) {
        let _ = self.skills.insert(skill.name.clone(), skill);
    }

    /// Look up one skill.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.get(name)
    }

    /// Resolve many names, partitioning into found skills and missing names.
    #[must_use]
    pub fn get_many<'a>(&self, names: &[&'a str]) -> (Vec<&Skill>, Vec<&'a str>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for &name in names {
            match self.skills.get(name) {
                Some(skill) => found.push(skill),
                None => missing.push(name),
            }
        }
        (found, missing)
    }

    /// Number of registered skills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Render active skills as a prompt section. Empty input renders nothing.
#[must_use]
pub fn render_skills_section(skills: &[Skill]) -> String {
    if skills.is_empty() {
        return String::new();
    }
    let mut out = String::from("# Active skills");
    for skill in skills {
        out.push_str("\n\n## ");
        out.push_str(&skill.name);
        out.push('\n');
        out.push_str(&skill.content);
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(name: &str) -> Skill {
        Skill {
            name: name.into(),
            description: format!("{name} skill"),
            content: format!("How to {name}."),
        }
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = SkillRegistry::new();
        registry.register(skill("git-flow"));
        registry.register(skill("review"));

        let (found, missing) = registry.get_many(&["review", "absent", "git-flow"]);
        assert_eq!(found.len(), 2);
        assert_eq!(missing, vec!["absent"]);
    }

    #[test]
    fn render_empty_is_empty() {
        assert!(render_skills_section(&[]).is_empty());
    }

    #[test]
    fn render_includes_each_skill_body() {
        let section = render_skills_section(&[skill("git-flow"), skill("review")]);
        assert!(section.starts_with("# Active skills"));
        assert!(section.contains("## git-flow"));
        assert!(section.contains("How to review."));
    }
}
