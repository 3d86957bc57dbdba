//! Checkbox line scanner shared by the tree and step document parsers.

/// A line starting with `- [ ]` / `- [x]`, with the rest as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkbox<'a> {
    pub checked: bool,
    pub text: &'a str,
}

/// Parse a checkbox line. Only a lowercase `x` counts as checked.
pub fn parse_checkbox(line: &str) -> Option<Checkbox<'_>> {
    let rest = line.trim().strip_prefix("- [")?;
    let (checked, rest) = if let Some(rest) = rest.strip_prefix(" ]") {
        (false, rest)
    } else if let Some(rest) = rest.strip_prefix("x]") {
        (true, rest)
    } else {
        return None;
    };
    Some(Checkbox {
        checked,
        text: rest.trim(),
    })
}

/// Rewrite an open checkbox line as checked, keeping indentation and text.
pub fn check_line(line: &str) -> Option<String> {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, body) = line.split_at(indent_len);
    let rest = body.strip_prefix("- [ ]")?;
    Some(format!("{indent}- [x]{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_open_and_checked() {
        let open = parse_checkbox("  - [ ] write code").expect("open");
        assert!(!open.checked);
        assert_eq!(open.text, "write code");

        let done = parse_checkbox("- [x] STEP_01__A.md").expect("done");
        assert!(done.checked);
        assert_eq!(done.text, "STEP_01__A.md");
    }

    #[test]
    fn rejects_uppercase_and_malformed_boxes() {
        assert_eq!(parse_checkbox("- [X] shouting"), None);
        assert_eq!(parse_checkbox("- [] empty"), None);
        assert_eq!(parse_checkbox("* [ ] bullet"), None);
    }

    #[test]
    fn text_may_follow_the_box_directly() {
        let glued = parse_checkbox("- [ ]TODO write tests").expect("glued");
        assert!(!glued.checked);
        assert_eq!(glued.text, "TODO write tests");

        let bare = parse_checkbox("  - [x]").expect("bare");
        assert!(bare.checked);
        assert_eq!(bare.text, "");
        assert_eq!(check_line("- [ ]TODO").as_deref(), Some("- [x]TODO"));
    }

    #[test]
    fn check_line_keeps_indentation() {
        assert_eq!(
            check_line("    - [ ] STEP_02__B.md").as_deref(),
            Some("    - [x] STEP_02__B.md")
        );
        assert_eq!(check_line("- [x] done"), None);
    }
}
