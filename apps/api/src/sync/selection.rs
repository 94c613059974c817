use std::collections::BTreeSet;

use serde::Deserialize;

/// How a selection update combines with the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Set,
    Add,
    Remove,
    Toggle,
}

/// Body of a selection update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionUpdate {
    #[serde(default)]
    pub mode: SelectionMode,
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Ids marked for bulk actions. Lives independently of the working set: a
/// snapshot never clears it, only a successful bulk action does.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    ids: BTreeSet<String>,
}

impl SelectionSet {
    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn update(&mut self, mode: SelectionMode, ids: impl IntoIterator<Item = String>) {
        match mode {
            SelectionMode::Set => self.ids = ids.into_iter().collect(),
            SelectionMode::Add => self.ids.extend(ids),
            SelectionMode::Remove => {
                for id in ids {
                    self.ids.remove(&id);
                }
            }
            SelectionMode::Toggle => {
                for id in ids {
                    if !self.ids.remove(&id) {
                        self.ids.insert(id);
                    }
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn remove_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a String>) {
        for id in ids {
            self.ids.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_modes() {
        let mut sel = SelectionSet::default();
        sel.update(SelectionMode::Set, owned(&["a", "b"]));
        sel.update(SelectionMode::Add, owned(&["c"]));
        sel.update(SelectionMode::Remove, owned(&["a"]));
        assert_eq!(sel.ids(), owned(&["b", "c"]));

        sel.update(SelectionMode::Toggle, owned(&["b", "d"]));
        assert_eq!(sel.ids(), owned(&["c", "d"]));
    }

    #[test]
    fn test_remove_all_keeps_rest() {
        let mut sel = SelectionSet::default();
        sel.update(SelectionMode::Set, owned(&["a", "b", "c"]));
        sel.remove_all(&owned(&["a", "c"]));
        assert_eq!(sel.ids(), owned(&["b"]));
        assert_eq!(sel.len(), 1);
    }
}
