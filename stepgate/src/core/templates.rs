//! Step document templates selected by (tree kind, position).

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::step_ref::StepRef;
use crate::core::tree_doc::TreeKind;

const CHOOSE_STACK_TEMPLATE: &str = include_str!("templates/choose_stack.md");
const SCAFFOLD_LAYOUT_TEMPLATE: &str = include_str!("templates/scaffold_layout.md");
const GENERIC_TEMPLATE: &str = include_str!("templates/generic.md");

const GENERIC: &str = "generic";

/// One row of the strategy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateRule {
    pub kind: TreeKind,
    pub position: u32,
    pub template: &'static str,
}

/// Bespoke templates. Anything not listed renders [`GENERIC`].
pub const TEMPLATE_RULES: &[TemplateRule] = &[
    TemplateRule {
        kind: TreeKind::NewInitiative,
        position: 1,
        template: "choose_stack",
    },
    TemplateRule {
        kind: TreeKind::NewInitiative,
        position: 2,
        template: "scaffold_layout",
    },
];

pub fn template_for(kind: TreeKind, position: u32) -> &'static str {
    TEMPLATE_RULES
        .iter()
        .find(|rule| rule.kind == kind && rule.position == position)
        .map_or(GENERIC, |rule| rule.template)
}

pub struct StepTemplates {
    env: Environment<'static>,
}

impl StepTemplates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        for (name, source) in [
            ("choose_stack", CHOOSE_STACK_TEMPLATE),
            ("scaffold_layout", SCAFFOLD_LAYOUT_TEMPLATE),
            (GENERIC, GENERIC_TEMPLATE),
        ] {
            env.add_template(name, source)
                .with_context(|| format!("load step template {name}"))?;
        }
        Ok(Self { env })
    }

    /// Render the document for `step`, declared in a tree of `kind`.
    pub fn render(&self, kind: TreeKind, step: &StepRef) -> Result<String> {
        let name = template_for(kind, step.position());
        let template = self.env.get_template(name)?;
        let rendered = template.render(context! {
            number => step.number(),
            title => step.title(),
            parent => kind.file_name(),
        })?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::step_doc::{StepDocument, StepStatus};

    #[test]
    fn strategy_table_falls_back_to_generic() {
        assert_eq!(template_for(TreeKind::NewInitiative, 1), "choose_stack");
        assert_eq!(template_for(TreeKind::NewInitiative, 2), "scaffold_layout");
        assert_eq!(template_for(TreeKind::NewInitiative, 3), "generic");
        assert_eq!(template_for(TreeKind::Maintenance, 1), "generic");
    }

    #[test]
    fn rendered_documents_start_open() {
        let templates = StepTemplates::new().expect("templates");
        let step = StepRef::parse("STEP_02__Lay_out_the_repo.md").expect("ref");
        for kind in TreeKind::ALL {
            let text = templates.render(kind, &step).expect("render");
            assert!(text.starts_with("# STEP 02: Lay out the repo\n"));
            assert!(text.contains(kind.file_name()));
            assert!(text.ends_with('\n'));
            let doc = StepDocument::parse(&text);
            assert_eq!(doc.status, Some(StepStatus::Open));
            assert!(!doc.items.is_empty());
            assert!(!doc.all_items_checked());
            assert!(!doc.has_open_questions);
        }
    }
}
