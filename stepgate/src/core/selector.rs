//! Deterministic selection of the active step.

use crate::core::tree_doc::{TreeDocument, TreeEntry};

/// First open entry in tree order.
///
/// Returns `None` if every entry is checked (tree complete).
pub fn first_open_entry(tree: &TreeDocument) -> Option<&TreeEntry> {
    tree.entries.iter().find(|entry| !entry.checked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(flags: &[bool]) -> TreeDocument {
        TreeDocument {
            entries: flags
                .iter()
                .enumerate()
                .map(|(i, checked)| TreeEntry {
                    checked: *checked,
                    reference: format!("STEP_{:02}__S.md", i + 1),
                    line: i,
                })
                .collect(),
        }
    }

    #[test]
    fn selects_lowest_open_index() {
        for flags in [
            vec![false, false, false],
            vec![true, false, false],
            vec![true, false, true],
            vec![true, true, false],
        ] {
            let expected = flags.iter().position(|checked| !checked);
            let found = first_open_entry(&tree(&flags)).map(|e| e.line);
            assert_eq!(found, expected, "{flags:?}");
        }
    }

    #[test]
    fn complete_tree_has_no_active_entry() {
        assert_eq!(first_open_entry(&tree(&[true, true])), None);
        assert_eq!(first_open_entry(&tree(&[])), None);
    }
}
