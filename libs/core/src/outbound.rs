//! Outbound message shapes and their Graph `messages` request bodies.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
    Sticker,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
            MediaKind::Sticker => "sticker",
        }
    }

    /// Maps an uploaded file's MIME type to the message type WhatsApp expects.
    ///
    /// ```
    /// use waflow_core::outbound::MediaKind;
    ///
    /// assert_eq!(MediaKind::from_mime("image/png"), Some(MediaKind::Image));
    /// assert_eq!(MediaKind::from_mime("text/csv"), Some(MediaKind::Document));
    /// assert_eq!(MediaKind::from_mime("application/zip"), None);
    /// ```
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else if mime.starts_with("audio/") {
            Some(MediaKind::Audio)
        } else if matches!(
            mime.as_str(),
            "application/pdf"
                | "text/csv"
                | "application/vnd.ms-excel"
                | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        ) {
            Some(MediaKind::Document)
        } else {
            None
        }
    }

    /// Whether Graph accepts a caption on this media type.
    pub fn accepts_caption(&self) -> bool {
        matches!(self, MediaKind::Image | MediaKind::Video | MediaKind::Document)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    /// Public URL fetched by WhatsApp.
    Link(String),
    /// Id returned by a previous media upload.
    Id(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaMessage {
    pub kind: MediaKind,
    pub source: MediaSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl MediaMessage {
    pub fn link(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            source: MediaSource::Link(url.into()),
            caption: None,
            filename: None,
        }
    }

    pub fn uploaded(kind: MediaKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            source: MediaSource::Id(id.into()),
            caption: None,
            filename: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        let caption = caption.into();
        if !caption.is_empty() {
            self.caption = Some(caption);
        }
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    fn body(&self) -> Value {
        let mut body = serde_json::Map::new();
        match &self.source {
            MediaSource::Link(link) => body.insert("link".into(), json!(link)),
            MediaSource::Id(id) => body.insert("id".into(), json!(id)),
        };
        if self.kind.accepts_caption() {
            if let Some(caption) = &self.caption {
                body.insert("caption".into(), json!(caption));
            }
        }
        if self.kind == MediaKind::Document {
            if let Some(filename) = &self.filename {
                body.insert("filename".into(), json!(filename));
            }
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<ListRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InteractiveList {
    pub header: Option<String>,
    pub body: String,
    pub footer: Option<String>,
    pub button: String,
    pub sections: Vec<ListSection>,
}

impl InteractiveList {
    /// The storefront menu sent from the operator console.
    pub fn main_menu() -> Self {
        let row = |id: &str, title: &str, description: &str| ListRow {
            id: id.into(),
            title: title.into(),
            description: Some(description.into()),
        };
        Self {
            header: Some("Square Group".into()),
            body: "Please select an option from the list:".into(),
            footer: Some("Click on product for more information".into()),
            button: "Main Menu".into(),
            sections: vec![ListSection {
                title: "Our Products".into(),
                rows: vec![
                    row("inventory_row", "📦 Available Inventory", "Check the latest stock."),
                    row("shipping_row", "📦 Shipping Status", "Track your orders."),
                    row(
                        "notifications_row",
                        "🚚 Notifications Opt-In",
                        "Stay updated on new arrivals",
                    ),
                ],
            }],
        }
    }

    fn body(&self) -> Value {
        let mut interactive = json!({
            "type": "list",
            "body": { "text": self.body },
            "action": {
                "button": self.button,
                "sections": self.sections,
            }
        });
        if let Some(header) = &self.header {
            interactive["header"] = json!({ "type": "text", "text": header });
        }
        if let Some(footer) = &self.footer {
            interactive["footer"] = json!({ "text": footer });
        }
        interactive
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateMessage {
    pub name: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_image_id: Option<String>,
    /// Index of a flow button to attach, if the template has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_button: Option<u32>,
}

impl TemplateMessage {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            header_image_id: None,
            flow_button: None,
        }
    }

    /// The `form` template that opens the published flow from its first button.
    pub fn flow_form() -> Self {
        Self {
            name: "form".into(),
            language: "en_US".into(),
            header_image_id: Some("28418804584401992".into()),
            flow_button: Some(0),
        }
    }

    fn body(&self) -> Value {
        let mut components = Vec::new();
        if let Some(id) = &self.header_image_id {
            components.push(json!({
                "type": "header",
                "parameters": [{ "type": "image", "image": { "id": id } }]
            }));
        }
        if let Some(index) = self.flow_button {
            components.push(json!({
                "type": "button",
                "sub_type": "flow",
                "index": index.to_string(),
            }));
        }
        json!({
            "name": self.name,
            "language": { "code": self.language },
            "components": components,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text { body: String },
    Media(MediaMessage),
    Location { latitude: f64, longitude: f64 },
    Contacts { vcard: String },
    Interactive(InteractiveList),
    Template(TemplateMessage),
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        OutboundMessage::Text { body: body.into() }
    }

    /// Graph message type, also used as the metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Text { .. } => "text",
            OutboundMessage::Media(media) => media.kind.as_str(),
            OutboundMessage::Location { .. } => "location",
            OutboundMessage::Contacts { .. } => "contacts",
            OutboundMessage::Interactive(_) => "interactive",
            OutboundMessage::Template(_) => "template",
        }
    }

    /// Human readable line for the conversation log.
    pub fn summary(&self) -> String {
        match self {
            OutboundMessage::Text { body } => body.clone(),
            OutboundMessage::Media(media) => media
                .caption
                .clone()
                .unwrap_or_else(|| format!("[{}]", media.kind.as_str())),
            OutboundMessage::Location {
                latitude,
                longitude,
            } => format!("[location {latitude},{longitude}]"),
            OutboundMessage::Contacts { .. } => "[contact]".into(),
            OutboundMessage::Interactive(list) => list.body.clone(),
            OutboundMessage::Template(template) => format!("[template {}]", template.name),
        }
    }

    /// Request body for `POST /{phone_number_id}/messages`.
    pub fn to_payload(&self, to: &str) -> Value {
        let mut payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": self.kind(),
        });
        let (key, body) = match self {
            OutboundMessage::Text { body } => ("text", json!({ "body": body })),
            OutboundMessage::Media(media) => (media.kind.as_str(), media.body()),
            OutboundMessage::Location {
                latitude,
                longitude,
            } => (
                "location",
                json!({ "latitude": latitude, "longitude": longitude }),
            ),
            OutboundMessage::Contacts { vcard } => ("contacts", json!([{ "vcard": vcard }])),
            OutboundMessage::Interactive(list) => {
                payload["recipient_type"] = json!("individual");
                ("interactive", list.body())
            }
            OutboundMessage::Template(template) => ("template", template.body()),
        };
        payload[key] = body;
        payload
    }
}

/// Parses `"<lat>,<lng>"` as typed into the location form.
pub fn parse_coordinates(raw: &str) -> Option<(f64, f64)> {
    let (lat, lng) = raw.split_once(',')?;
    let latitude: f64 = lat.trim().parse().ok()?;
    let longitude: f64 = lng.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude))
        .then_some((latitude, longitude))
}
