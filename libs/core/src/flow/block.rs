use serde::{Deserialize, Serialize};

/// Closed set of content blocks a screen can hold.
///
/// ```
/// use waflow_core::flow::BlockKind;
///
/// assert!(BlockKind::Dropdown.has_options());
/// assert!(BlockKind::OptIn.is_input());
/// assert!(!BlockKind::Caption.is_input());
/// assert_eq!(BlockKind::ShortAnswer.as_str(), "short-answer");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    LargeHeading,
    SmallHeading,
    Body,
    Caption,
    Image,
    ShortAnswer,
    Paragraph,
    DatePicker,
    SingleChoice,
    MultipleChoice,
    Dropdown,
    OptIn,
}

impl BlockKind {
    pub const ALL: [BlockKind; 12] = [
        BlockKind::LargeHeading,
        BlockKind::SmallHeading,
        BlockKind::Body,
        BlockKind::Caption,
        BlockKind::Image,
        BlockKind::ShortAnswer,
        BlockKind::Paragraph,
        BlockKind::DatePicker,
        BlockKind::SingleChoice,
        BlockKind::MultipleChoice,
        BlockKind::Dropdown,
        BlockKind::OptIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::LargeHeading => "large-heading",
            BlockKind::SmallHeading => "small-heading",
            BlockKind::Body => "body",
            BlockKind::Caption => "caption",
            BlockKind::Image => "image",
            BlockKind::ShortAnswer => "short-answer",
            BlockKind::Paragraph => "paragraph",
            BlockKind::DatePicker => "date-picker",
            BlockKind::SingleChoice => "single-choice",
            BlockKind::MultipleChoice => "multiple-choice",
            BlockKind::Dropdown => "dropdown",
            BlockKind::OptIn => "opt-in",
        }
    }

    /// Choice and dropdown kinds carry an option list.
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            BlockKind::SingleChoice | BlockKind::MultipleChoice | BlockKind::Dropdown
        )
    }

    /// Kinds that produce a form value and honour `required`.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            BlockKind::ShortAnswer
                | BlockKind::Paragraph
                | BlockKind::DatePicker
                | BlockKind::SingleChoice
                | BlockKind::MultipleChoice
                | BlockKind::Dropdown
                | BlockKind::OptIn
        )
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown block kind `{s}`"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentBlock {
    pub id: String,
    pub kind: BlockKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

impl ContentBlock {
    /// Fresh block as the builder creates it: empty texts, not required,
    /// and a single `Option 1` for kinds that carry options.
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        let options = if kind.has_options() {
            vec![option_label(0)]
        } else {
            Vec::new()
        };
        Self {
            id: id.into(),
            kind,
            label: String::new(),
            value: String::new(),
            options,
            required: false,
        }
    }

    /// Static text shown by heading, body and caption blocks.
    pub fn display_text(&self) -> &str {
        if self.value.is_empty() {
            &self.label
        } else {
            &self.value
        }
    }
}

/// Default label for the option at `index`.
pub(crate) fn option_label(index: usize) -> String {
    format!("Option {}", index + 1)
}

/// Provider-facing id of a choice option: the zero-based index, an underscore,
/// and the option text reduced to ASCII letters and underscores.
///
/// ```
/// use waflow_core::flow::option_id;
///
/// assert_eq!(option_id(0, "A"), "0_A");
/// assert_eq!(option_id(2, "Option 3!"), "2_Option");
/// assert_eq!(option_id(1, "snake_case 42"), "1_snake_case");
/// ```
pub fn option_id(index: usize, option: &str) -> String {
    let sanitized: String = option
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '_')
        .collect();
    format!("{index}_{sanitized}")
}
