use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::block::{BlockKind, ContentBlock, option_label};

pub const DEFAULT_SCREEN_ID: &str = "First_Screen";
pub const DEFAULT_SCREEN_TITLE: &str = "First Screen";

const SCREEN_ID_PREFIX: &str = "screen_";
const SCREEN_ID_SUFFIX_LEN: usize = 5;
const BLOCK_ID_PREFIX: &str = "content_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Screen {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

impl Screen {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn block(&self, block_id: &str) -> Option<&ContentBlock> {
        self.blocks.iter().find(|block| block.id == block_id)
    }

    fn block_mut(&mut self, block_id: &str) -> Option<&mut ContentBlock> {
        self.blocks.iter_mut().find(|block| block.id == block_id)
    }

    /// `content_<n+1>` for the current block count; when that id is already
    /// taken (after a delete) the counter moves forward to the next free one.
    fn next_block_id(&self) -> String {
        let mut n = self.blocks.len() + 1;
        loop {
            let candidate = format!("{BLOCK_ID_PREFIX}{n}");
            if self.block(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Authoring state of a multi-screen flow.
///
/// Every mutation that names an unknown screen or block leaves the document
/// untouched.
///
/// ```
/// use waflow_core::flow::{BlockKind, FlowDocument};
///
/// let mut doc = FlowDocument::new();
/// let first = doc.selected_screen_id().unwrap().to_string();
/// let block = doc.add_block(&first, BlockKind::ShortAnswer).unwrap();
/// doc.update_block_label(&first, &block, "Your name");
/// assert_eq!(doc.screens()[0].blocks[0].label, "Your name");
///
/// doc.update_block_label("missing", &block, "ignored");
/// assert_eq!(doc.screens()[0].blocks[0].label, "Your name");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowDocument {
    screens: Vec<Screen>,
    #[serde(skip)]
    selected: Option<String>,
}

impl Default for FlowDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowDocument {
    /// A document with the single default screen, selected.
    pub fn new() -> Self {
        Self {
            screens: vec![Screen::new(DEFAULT_SCREEN_ID, DEFAULT_SCREEN_TITLE)],
            selected: Some(DEFAULT_SCREEN_ID.to_string()),
        }
    }

    /// Wraps existing screens; nothing is selected.
    pub fn from_screens(screens: Vec<Screen>) -> Self {
        Self {
            screens,
            selected: None,
        }
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn screen(&self, screen_id: &str) -> Option<&Screen> {
        self.screens.iter().find(|screen| screen.id == screen_id)
    }

    fn screen_mut(&mut self, screen_id: &str) -> Option<&mut Screen> {
        self.screens.iter_mut().find(|screen| screen.id == screen_id)
    }

    pub fn block(&self, screen_id: &str, block_id: &str) -> Option<&ContentBlock> {
        self.screen(screen_id)?.block(block_id)
    }

    fn block_mut(&mut self, screen_id: &str, block_id: &str) -> Option<&mut ContentBlock> {
        self.screen_mut(screen_id)?.block_mut(block_id)
    }

    pub fn selected_screen_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_screen(&self) -> Option<&Screen> {
        self.selected.as_deref().and_then(|id| self.screen(id))
    }

    /// Moves the editing cursor; returns `false` (and keeps the old cursor)
    /// when the screen does not exist.
    pub fn select_screen(&mut self, screen_id: &str) -> bool {
        if self.screen(screen_id).is_none() {
            return false;
        }
        self.selected = Some(screen_id.to_string());
        true
    }

    /// Appends a screen with a random `screen_xxxxx` id and selects it.
    pub fn add_screen(&mut self) -> String {
        let mut rng = rand::rng();
        self.add_screen_with(|| random_screen_id(&mut rng))
    }

    /// Same as [`FlowDocument::add_screen`] with a caller-supplied id source;
    /// candidates that collide with an existing screen are discarded.
    pub fn add_screen_with<F>(&mut self, mut next_id: F) -> String
    where
        F: FnMut() -> String,
    {
        let id = loop {
            let candidate = next_id();
            if self.screen(&candidate).is_none() {
                break candidate;
            }
            debug!(screen_id = %candidate, "screen id collision; regenerating");
        };
        let title = format!("Screen {}", self.screens.len() + 1);
        self.screens.push(Screen::new(id.clone(), title));
        self.selected = Some(id.clone());
        id
    }

    pub fn update_screen_title(&mut self, screen_id: &str, title: impl Into<String>) {
        if let Some(screen) = self.screen_mut(screen_id) {
            screen.title = title.into();
        }
    }

    /// Removes the screen. Removing the selected screen clears the selection.
    pub fn delete_screen(&mut self, screen_id: &str) {
        let before = self.screens.len();
        self.screens.retain(|screen| screen.id != screen_id);
        if self.screens.len() != before && self.selected.as_deref() == Some(screen_id) {
            self.selected = None;
        }
    }

    /// Appends a block of `kind`; returns its id, or `None` for an unknown screen.
    pub fn add_block(&mut self, screen_id: &str, kind: BlockKind) -> Option<String> {
        let screen = self.screen_mut(screen_id)?;
        let id = screen.next_block_id();
        screen.blocks.push(ContentBlock::new(id.clone(), kind));
        Some(id)
    }

    pub fn update_block_label(&mut self, screen_id: &str, block_id: &str, label: impl Into<String>) {
        if let Some(block) = self.block_mut(screen_id, block_id) {
            block.label = label.into();
        }
    }

    pub fn update_block_value(&mut self, screen_id: &str, block_id: &str, value: impl Into<String>) {
        if let Some(block) = self.block_mut(screen_id, block_id) {
            block.value = value.into();
        }
    }

    pub fn update_block_required(&mut self, screen_id: &str, block_id: &str, required: bool) {
        if let Some(block) = self.block_mut(screen_id, block_id) {
            block.required = required;
        }
    }

    pub fn delete_block(&mut self, screen_id: &str, block_id: &str) {
        if let Some(screen) = self.screen_mut(screen_id) {
            screen.blocks.retain(|block| block.id != block_id);
        }
    }

    /// Appends `Option <k+1>` to a choice or dropdown block.
    pub fn add_option(&mut self, screen_id: &str, block_id: &str) {
        if let Some(block) = self.block_mut(screen_id, block_id) {
            if block.kind.has_options() {
                let label = option_label(block.options.len());
                block.options.push(label);
            }
        }
    }

    pub fn update_option(
        &mut self,
        screen_id: &str,
        block_id: &str,
        index: usize,
        value: impl Into<String>,
    ) {
        if let Some(option) = self
            .block_mut(screen_id, block_id)
            .and_then(|block| block.options.get_mut(index))
        {
            *option = value.into();
        }
    }

    /// Removes the option at `index`; the list is allowed to become empty.
    pub fn delete_option(&mut self, screen_id: &str, block_id: &str, index: usize) {
        if let Some(block) = self.block_mut(screen_id, block_id) {
            if index < block.options.len() {
                block.options.remove(index);
            }
        }
    }
}

fn random_screen_id(rng: &mut impl Rng) -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let suffix: String = (0..SCREEN_ID_SUFFIX_LEN)
        .map(|_| LETTERS[rng.random_range(0..LETTERS.len())] as char)
        .collect();
    format!("{SCREEN_ID_PREFIX}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(doc: &FlowDocument) -> String {
        doc.screens()[0].id.clone()
    }

    #[test]
    fn new_document_has_one_selected_screen() {
        let doc = FlowDocument::new();
        assert_eq!(doc.screens().len(), 1);
        assert_eq!(doc.screens()[0].id, DEFAULT_SCREEN_ID);
        assert_eq!(doc.screens()[0].title, DEFAULT_SCREEN_TITLE);
        assert_eq!(doc.selected_screen_id(), Some(DEFAULT_SCREEN_ID));
    }

    #[test]
    fn add_screen_appends_titles_and_selects() {
        let mut doc = FlowDocument::new();
        let id = doc.add_screen();
        assert!(id.starts_with("screen_"));
        assert_eq!(id.len(), "screen_".len() + 5);
        assert!(id.chars().all(|c| c.is_ascii_alphabetic() || c == '_'));
        assert_eq!(doc.screens()[1].title, "Screen 2");
        assert_eq!(doc.selected_screen_id(), Some(id.as_str()));
    }

    #[test]
    fn add_screen_regenerates_on_collision() {
        let mut doc = FlowDocument::new();
        let mut candidates = vec!["screen_abcde", DEFAULT_SCREEN_ID].into_iter().rev();
        let id = doc.add_screen_with(|| candidates.next().unwrap().to_string());
        assert_eq!(id, "screen_abcde");
        assert_eq!(doc.screens().len(), 2);
    }

    #[test]
    fn add_block_assigns_sequential_ids_and_defaults() {
        let mut doc = FlowDocument::new();
        let screen = first(&doc);
        assert_eq!(doc.add_block(&screen, BlockKind::Body).as_deref(), Some("content_1"));
        assert_eq!(
            doc.add_block(&screen, BlockKind::Dropdown).as_deref(),
            Some("content_2")
        );
        let dropdown = doc.block(&screen, "content_2").unwrap();
        assert_eq!(dropdown.options, vec!["Option 1"]);
        assert_eq!(dropdown.label, "");
        assert!(doc.add_block("nope", BlockKind::Body).is_none());
    }

    #[test]
    fn block_ids_skip_past_taken_ids_after_delete() {
        let mut doc = FlowDocument::new();
        let screen = first(&doc);
        doc.add_block(&screen, BlockKind::Body);
        doc.add_block(&screen, BlockKind::Body);
        doc.delete_block(&screen, "content_1");
        let id = doc.add_block(&screen, BlockKind::Caption).unwrap();
        assert_eq!(id, "content_3");
        let ids: Vec<_> = doc.screens()[0].blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["content_2", "content_3"]);
    }

    #[test]
    fn field_updates_target_one_block() {
        let mut doc = FlowDocument::new();
        let screen = first(&doc);
        let a = doc.add_block(&screen, BlockKind::ShortAnswer).unwrap();
        let b = doc.add_block(&screen, BlockKind::Image).unwrap();
        doc.update_block_label(&screen, &a, "Name");
        doc.update_block_required(&screen, &a, true);
        doc.update_block_value(&screen, &b, "https://example.com/a.png");
        let a = doc.block(&screen, &a).unwrap();
        assert_eq!(a.label, "Name");
        assert!(a.required);
        assert_eq!(a.value, "");
        let b = doc.block(&screen, &b).unwrap();
        assert_eq!(b.value, "https://example.com/a.png");
        assert_eq!(b.label, "");
    }

    #[test]
    fn option_operations_are_bounds_checked() {
        let mut doc = FlowDocument::new();
        let screen = first(&doc);
        let block = doc.add_block(&screen, BlockKind::SingleChoice).unwrap();
        doc.add_option(&screen, &block);
        doc.add_option(&screen, &block);
        assert_eq!(
            doc.block(&screen, &block).unwrap().options,
            vec!["Option 1", "Option 2", "Option 3"]
        );

        doc.update_option(&screen, &block, 1, "Blue");
        doc.update_option(&screen, &block, 9, "ignored");
        doc.delete_option(&screen, &block, 0);
        doc.delete_option(&screen, &block, 42);
        assert_eq!(doc.block(&screen, &block).unwrap().options, vec!["Blue", "Option 3"]);

        doc.delete_option(&screen, &block, 0);
        doc.delete_option(&screen, &block, 0);
        doc.delete_option(&screen, &block, 0);
        assert!(doc.block(&screen, &block).unwrap().options.is_empty());
    }

    #[test]
    fn add_option_ignores_non_choice_blocks() {
        let mut doc = FlowDocument::new();
        let screen = first(&doc);
        let block = doc.add_block(&screen, BlockKind::Paragraph).unwrap();
        doc.add_option(&screen, &block);
        assert!(doc.block(&screen, &block).unwrap().options.is_empty());
    }

    #[test]
    fn deleting_selected_screen_clears_selection_and_stale_ids_are_ignored() {
        let mut doc = FlowDocument::new();
        let second = doc.add_screen();
        doc.delete_screen(&second);
        assert_eq!(doc.selected_screen_id(), None);
        assert!(doc.selected_screen().is_none());

        let before = doc.clone();
        assert!(doc.add_block(&second, BlockKind::ShortAnswer).is_none());
        doc.update_screen_title(&second, "ghost");
        assert_eq!(doc, before);
    }

    #[test]
    fn deleting_another_screen_keeps_selection() {
        let mut doc = FlowDocument::new();
        let second = doc.add_screen();
        doc.delete_screen(DEFAULT_SCREEN_ID);
        assert_eq!(doc.selected_screen_id(), Some(second.as_str()));
        assert!(!doc.select_screen(DEFAULT_SCREEN_ID));
        assert_eq!(doc.selected_screen_id(), Some(second.as_str()));
    }

    #[test]
    fn selection_is_not_serialized() {
        let doc = FlowDocument::new();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("selected").is_none());
        let back: FlowDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back.selected_screen_id(), None);
        assert_eq!(back.screens(), doc.screens());
    }
}
