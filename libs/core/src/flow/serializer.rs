use tracing::debug;

use super::block::{BlockKind, ContentBlock, option_id};
use super::document::{FlowDocument, Screen};
use super::schema::{
    ActionPayload, CONTINUE_LABEL, Component, DONE_LABEL, DataSourceItem, FLOW_JSON_VERSION,
    FORM_NAME, FlowJson, FlowScreen, FooterAction, Form, FormType, Layout, LayoutType,
    NextScreen, NextType, data_ref, form_ref, payload_key,
};
use crate::error::FlowError;

/// Turns a [`FlowDocument`] into WhatsApp Flow JSON.
///
/// Every screen but the last navigates to its successor and forwards its own
/// answers; the last screen completes the flow and re-threads every answer of
/// every screen, since the flow runtime does not merge payloads across hops.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlowSerializer;

impl FlowSerializer {
    pub fn serialize(&self, document: &FlowDocument) -> Result<FlowJson, FlowError> {
        serialize(document)
    }
}

/// See [`FlowSerializer`].
///
/// ```
/// use waflow_core::flow::{BlockKind, FlowDocument, serialize};
///
/// let mut doc = FlowDocument::new();
/// let screen = doc.screens()[0].id.clone();
/// doc.add_block(&screen, BlockKind::ShortAnswer);
/// let json = serialize(&doc).unwrap();
/// assert_eq!(json.version, "6.0");
/// assert!(json.screens[0].is_terminal());
/// ```
pub fn serialize(document: &FlowDocument) -> Result<FlowJson, FlowError> {
    let screens = document.screens();
    if screens.is_empty() {
        return Err(FlowError::EmptyDocument);
    }

    let last = screens.len() - 1;
    let out = screens
        .iter()
        .enumerate()
        .map(|(index, screen)| {
            let footer = if index < last {
                navigate_footer(index, screen, &screens[index + 1])
            } else {
                complete_footer(index, screens)
            };
            let mut children: Vec<Component> = screen.blocks.iter().map(component_for).collect();
            children.push(footer);

            FlowScreen {
                id: screen.id.clone(),
                title: screen.title.clone(),
                layout: Layout {
                    kind: LayoutType::SingleColumnLayout,
                    children: vec![Form {
                        kind: FormType::Form,
                        name: FORM_NAME.to_string(),
                        children,
                    }],
                },
                terminal: (index == last).then_some(true),
            }
        })
        .collect();

    debug!(screens = screens.len(), "serialized flow document");
    Ok(FlowJson {
        version: FLOW_JSON_VERSION.to_string(),
        screens: out,
    })
}

fn component_for(block: &ContentBlock) -> Component {
    let label = block.label.clone();
    let name = block.id.clone();
    let required = block.required;
    match block.kind {
        BlockKind::LargeHeading => Component::TextHeading {
            text: block.display_text().to_string(),
        },
        BlockKind::SmallHeading => Component::TextSubheading {
            text: block.display_text().to_string(),
        },
        BlockKind::Body => Component::TextBody {
            text: block.display_text().to_string(),
        },
        BlockKind::Caption => Component::TextCaption {
            text: block.display_text().to_string(),
        },
        BlockKind::Image => Component::Image {
            src: block.value.clone(),
            alt_text: label,
        },
        BlockKind::ShortAnswer => Component::TextInput {
            label,
            name,
            required,
        },
        BlockKind::Paragraph => Component::TextArea {
            label,
            name,
            required,
        },
        BlockKind::DatePicker => Component::DatePicker {
            label,
            name,
            required,
        },
        BlockKind::SingleChoice => Component::RadioButtonsGroup {
            label,
            name,
            data_source: data_source(&block.options),
            required,
        },
        BlockKind::MultipleChoice => Component::CheckboxGroup {
            label,
            name,
            data_source: data_source(&block.options),
            required,
        },
        BlockKind::Dropdown => Component::Dropdown {
            label,
            name,
            data_source: data_source(&block.options),
            required,
        },
        BlockKind::OptIn => Component::OptIn {
            label,
            name,
            required,
        },
    }
}

fn data_source(options: &[String]) -> Vec<DataSourceItem> {
    options
        .iter()
        .enumerate()
        .map(|(index, option)| DataSourceItem {
            id: option_id(index, option),
            title: option.clone(),
        })
        .collect()
}

fn navigate_footer(index: usize, screen: &Screen, next: &Screen) -> Component {
    let payload: ActionPayload = screen
        .blocks
        .iter()
        .map(|block| (payload_key(index, &block.id), form_ref(&block.id)))
        .collect();
    Component::Footer {
        label: CONTINUE_LABEL.to_string(),
        on_click_action: FooterAction::Navigate {
            next: NextScreen {
                name: next.id.clone(),
                kind: NextType::Screen,
            },
            payload,
        },
    }
}

fn complete_footer(current: usize, screens: &[Screen]) -> Component {
    let mut payload = ActionPayload::new();
    for (source, screen) in screens.iter().enumerate() {
        for block in &screen.blocks {
            let key = payload_key(source, &block.id);
            let reference = if source == current {
                form_ref(&block.id)
            } else {
                data_ref(&key)
            };
            payload.insert(key, reference);
        }
    }
    Component::Footer {
        label: DONE_LABEL.to_string(),
        on_click_action: FooterAction::Complete { payload },
    }
}
