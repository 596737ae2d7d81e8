//! Tag autocomplete for a comma-delimited input.
//!
//! Everything before the last comma is committed; the trimmed text after it
//! is the active prefix that suggestions are looked up for. Only one
//! suggestion panel exists across the whole client, held in a [`PanelSlot`].

use crate::tag_cache::TagIndexCache;
use serde::Serialize;

/// Identifies an input field that has autocomplete attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EditorId(pub u32);

/// The gallery search field
pub const SEARCH_EDITOR: EditorId = EditorId(0);

/// One entry of the panel. `matched` is the part shown in bold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Full tag, inserted when the entry is chosen
    pub tag: String,
    /// Committed text shown before the match, verbatim
    pub committed: String,
    pub matched: String,
    pub rest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionPanel {
    pub owner: EditorId,
    pub items: Vec<Suggestion>,
    pub highlighted: Option<usize>,
}

impl SuggestionPanel {
    fn move_down(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(i) => (i + 1) % len,
            None => 0,
        });
    }

    fn move_up(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        });
    }

    fn highlighted_tag(&self) -> Option<&str> {
        self.highlighted
            .and_then(|i| self.items.get(i))
            .map(|s| s.tag.as_str())
    }
}

/// The single panel slot shared by every editor
#[derive(Debug, Default)]
pub struct PanelSlot {
    open: Option<SuggestionPanel>,
}

/// Where a click landed, as far as autocomplete cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Input(EditorId),
    Panel(EditorId),
    Elsewhere,
}

impl PanelSlot {
    pub fn panel(&self) -> Option<&SuggestionPanel> {
        self.open.as_ref()
    }

    fn panel_for(&mut self, owner: EditorId) -> Option<&mut SuggestionPanel> {
        self.open.as_mut().filter(|p| p.owner == owner)
    }

    fn open(&mut self, panel: SuggestionPanel) {
        self.open = Some(panel);
    }

    /// Close whatever is open. Returns true if something was.
    pub fn close_all(&mut self) -> bool {
        self.open.take().is_some()
    }

    /// Clicks on the owning input or on the panel itself leave it open;
    /// anything else closes it. Returns true if the panel was closed.
    pub fn handle_click(&mut self, target: ClickTarget) -> bool {
        let keep = match (&self.open, target) {
            (Some(panel), ClickTarget::Input(id)) | (Some(panel), ClickTarget::Panel(id)) => {
                panel.owner == id
            }
            _ => false,
        };
        !keep && self.close_all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInput<'a> {
    pub committed: Vec<&'a str>,
    pub active: &'a str,
}

pub fn parse_input(text: &str) -> ParsedInput<'_> {
    let mut segments: Vec<&str> = text.split(',').collect();
    let active = segments.pop().unwrap_or("").trim();
    ParsedInput {
        committed: segments,
        active,
    }
}

/// Committed segments exactly as typed, rejoined the way a selection writes them
fn committed_prefix(committed: &[&str]) -> String {
    if committed.is_empty() {
        String::new()
    } else {
        format!("{}, ", committed.join(", "))
    }
}

/// Replace the active segment with `tag` and leave the field ready for the
/// next one. Committed segments are kept as they were typed.
pub fn apply_selection(text: &str, tag: &str) -> String {
    let parsed = parse_input(text);
    format!("{}{}, ", committed_prefix(&parsed.committed), tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Tab,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    /// Suppress the browser default (form submit, focus change)
    pub prevent_default: bool,
    /// Tag that was just inserted, if the key chose one
    pub selected: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AutocompleteEditor {
    id: EditorId,
    value: String,
}

impl AutocompleteEditor {
    pub fn new(id: EditorId) -> Self {
        Self {
            id,
            value: String::new(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// A keystroke changed the text. Closes any open panel, then opens a new
    /// one for this editor if the active prefix has matches.
    pub fn input(&mut self, text: &str, cache: &TagIndexCache, slot: &mut PanelSlot) -> bool {
        self.value = text.to_string();
        slot.close_all();

        let parsed = parse_input(text);
        if parsed.active.is_empty() {
            return false;
        }

        let committed = committed_prefix(&parsed.committed);
        let width = parsed.active.chars().count();

        let items: Vec<Suggestion> = cache
            .suggestions_for(parsed.active)
            .into_iter()
            .map(|tag| Suggestion {
                tag: tag.to_string(),
                committed: committed.clone(),
                matched: tag.chars().take(width).collect(),
                rest: tag.chars().skip(width).collect(),
            })
            .collect();

        if items.is_empty() {
            return false;
        }
        slot.open(SuggestionPanel {
            owner: self.id,
            items,
            highlighted: None,
        });
        true
    }

    pub fn handle_key(&mut self, key: Key, slot: &mut PanelSlot) -> KeyOutcome {
        match key {
            Key::Down => {
                if let Some(panel) = slot.panel_for(self.id) {
                    panel.move_down();
                }
                KeyOutcome::default()
            }
            Key::Up => {
                if let Some(panel) = slot.panel_for(self.id) {
                    panel.move_up();
                }
                KeyOutcome::default()
            }
            Key::Enter => {
                let tag = slot
                    .panel_for(self.id)
                    .and_then(|p| p.highlighted_tag())
                    .map(str::to_string);
                KeyOutcome {
                    prevent_default: true,
                    selected: tag.map(|t| self.select(&t, slot)),
                }
            }
            Key::Tab => {
                let first = slot
                    .panel_for(self.id)
                    .and_then(|p| p.items.first())
                    .map(|s| s.tag.clone());
                match first {
                    Some(tag) => KeyOutcome {
                        prevent_default: true,
                        selected: Some(self.select(&tag, slot)),
                    },
                    None => KeyOutcome::default(),
                }
            }
            Key::Other => KeyOutcome::default(),
        }
    }

    /// Click on entry `index` of this editor's panel
    pub fn click_suggestion(&mut self, index: usize, slot: &mut PanelSlot) -> Option<String> {
        let tag = slot
            .panel_for(self.id)
            .and_then(|p| p.items.get(index))
            .map(|s| s.tag.clone())?;
        Some(self.select(&tag, slot))
    }

    fn select(&mut self, tag: &str, slot: &mut PanelSlot) -> String {
        self.value = apply_selection(&self.value, tag);
        slot.close_all();
        tag.to_string()
    }
}
