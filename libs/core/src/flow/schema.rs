//! Typed model of the WhatsApp Flow JSON emitted by the serializer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const FLOW_JSON_VERSION: &str = "6.0";
pub const FORM_NAME: &str = "flow_path";
pub const CONTINUE_LABEL: &str = "Continue";
pub const DONE_LABEL: &str = "Done";

/// Footer payload: `screen_<index>_<blockId>` to a `${form..}` or `${data..}` reference.
pub type ActionPayload = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowJson {
    pub version: String,
    pub screens: Vec<FlowScreen>,
}

impl FlowJson {
    pub fn terminal_screen(&self) -> Option<&FlowScreen> {
        self.screens.iter().find(|screen| screen.is_terminal())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowScreen {
    pub id: String,
    pub title: String,
    pub layout: Layout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<bool>,
}

impl FlowScreen {
    pub fn is_terminal(&self) -> bool {
        self.terminal == Some(true)
    }

    /// The single form wrapping this screen's components.
    pub fn form(&self) -> Option<&Form> {
        self.layout.children.first()
    }

    pub fn footer(&self) -> Option<(&str, &FooterAction)> {
        self.form()?.children.iter().find_map(|component| match component {
            Component::Footer {
                label,
                on_click_action,
            } => Some((label.as_str(), on_click_action)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LayoutType {
    SingleColumnLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    #[serde(rename = "type")]
    pub kind: LayoutType,
    pub children: Vec<Form>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FormType {
    Form,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Form {
    #[serde(rename = "type")]
    pub kind: FormType,
    pub name: String,
    pub children: Vec<Component>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataSourceItem {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Component {
    TextHeading {
        text: String,
    },
    TextSubheading {
        text: String,
    },
    TextBody {
        text: String,
    },
    TextCaption {
        text: String,
    },
    Image {
        src: String,
        #[serde(rename = "alt-text")]
        alt_text: String,
    },
    TextInput {
        label: String,
        name: String,
        required: bool,
    },
    TextArea {
        label: String,
        name: String,
        required: bool,
    },
    DatePicker {
        label: String,
        name: String,
        required: bool,
    },
    RadioButtonsGroup {
        label: String,
        name: String,
        #[serde(rename = "data-source")]
        data_source: Vec<DataSourceItem>,
        required: bool,
    },
    CheckboxGroup {
        label: String,
        name: String,
        #[serde(rename = "data-source")]
        data_source: Vec<DataSourceItem>,
        required: bool,
    },
    Dropdown {
        label: String,
        name: String,
        #[serde(rename = "data-source")]
        data_source: Vec<DataSourceItem>,
        required: bool,
    },
    OptIn {
        label: String,
        name: String,
        required: bool,
    },
    Footer {
        label: String,
        #[serde(rename = "on-click-action")]
        on_click_action: FooterAction,
    },
}

impl Component {
    /// Form field name for input components.
    pub fn name(&self) -> Option<&str> {
        match self {
            Component::TextInput { name, .. }
            | Component::TextArea { name, .. }
            | Component::DatePicker { name, .. }
            | Component::RadioButtonsGroup { name, .. }
            | Component::CheckboxGroup { name, .. }
            | Component::Dropdown { name, .. }
            | Component::OptIn { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn data_source(&self) -> Option<&[DataSourceItem]> {
        match self {
            Component::RadioButtonsGroup { data_source, .. }
            | Component::CheckboxGroup { data_source, .. }
            | Component::Dropdown { data_source, .. } => Some(data_source.as_slice()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NextType {
    Screen,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NextScreen {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NextType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum FooterAction {
    Navigate {
        next: NextScreen,
        payload: ActionPayload,
    },
    Complete {
        payload: ActionPayload,
    },
}

impl FooterAction {
    pub fn payload(&self) -> &ActionPayload {
        match self {
            FooterAction::Navigate { payload, .. } | FooterAction::Complete { payload } => payload,
        }
    }
}

/// `${form.<field>}`: the value typed on the current screen.
pub fn form_ref(field: &str) -> String {
    format!("${{form.{field}}}")
}

/// `${data.<key>}`: a value carried forward from an earlier screen.
pub fn data_ref(key: &str) -> String {
    format!("${{data.{key}}}")
}

/// Payload key for a block: `screen_<index>_<blockId>`.
pub fn payload_key(screen_index: usize, block_id: &str) -> String {
    format!("screen_{screen_index}_{block_id}")
}
