use crate::{model::Id, serializer::fields::type_name};
use serde::Deserialize;
use serde_json::Value;

/// How relations between records are rendered.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationStyle {
    /// Relations are the related record's id.
    #[default]
    PrimaryKey,
    /// Relations are absolute links to the related record, and every
    /// representation carries a `url` field.
    Hyperlink,
}

/// A relation read from input.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Reference<Marker> {
    pub id: Id<Marker>,
    pub via_link: bool,
}

impl<Marker> Reference<Marker> {
    /// Message for a reference to a record that does not exist.
    #[must_use]
    pub fn missing_message(&self) -> String {
        if self.via_link {
            "Invalid hyperlink - Object does not exist.".to_owned()
        } else {
            format!("Invalid pk \"{}\" - object does not exist.", self.id)
        }
    }
}

/// Renders and parses relations for one deployment.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Links {
    style: RelationStyle,
    base_url: String,
}

impl Links {
    #[must_use]
    pub fn new(style: RelationStyle, base_url: &str) -> Self {
        Self {
            style,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    #[must_use]
    pub fn style(&self) -> RelationStyle {
        self.style
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn is_hyperlinked(&self) -> bool {
        self.style == RelationStyle::Hyperlink
    }

    /// Absolute link for `path`, which must not start with a slash.
    #[must_use]
    pub fn absolute(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    #[must_use]
    pub fn collection(&self, resource: &str) -> String {
        self.absolute(resource)
    }

    #[must_use]
    pub fn item<Marker>(&self, resource: &str, id: Id<Marker>) -> String {
        format!("{}/{resource}/{id}", self.base_url)
    }

    #[must_use]
    pub fn reference<Marker>(&self, resource: &str, id: Id<Marker>) -> Value {
        match self.style {
            RelationStyle::PrimaryKey => Value::from(id.get()),
            RelationStyle::Hyperlink => Value::String(self.item(resource, id)),
        }
    }

    /// Reads an id, a numeric string or a link to `resource`. Links are
    /// accepted in either style, absolute or as a path.
    pub fn parse_reference<Marker>(
        &self,
        resource: &str,
        value: &Value,
    ) -> Result<Reference<Marker>, String> {
        match value {
            Value::Number(number) => number
                .as_u64()
                .map(|id| Reference {
                    id: id.into(),
                    via_link: false,
                })
                .ok_or_else(|| incorrect_type(value)),
            Value::String(text) => {
                if let Ok(id) = text.trim().parse::<u64>() {
                    return Ok(Reference {
                        id: id.into(),
                        via_link: false,
                    });
                }
                if !looks_like_link(text) {
                    return Err(incorrect_type(value));
                }
                self.parse_link(resource, text)
                    .map(|id| Reference {
                        id: id.into(),
                        via_link: true,
                    })
                    .ok_or_else(|| "Invalid hyperlink - No URL match.".to_owned())
            }
            _ => Err(incorrect_type(value)),
        }
    }

    fn parse_link(&self, resource: &str, link: &str) -> Option<u64> {
        let path = link.strip_prefix(&self.base_url).unwrap_or(link);
        let rest = path
            .strip_prefix('/')?
            .strip_prefix(resource)?
            .strip_prefix('/')?;

        rest.strip_suffix('/').unwrap_or(rest).parse().ok()
    }
}

fn looks_like_link(text: &str) -> bool {
    text.starts_with('/') || text.starts_with("http://") || text.starts_with("https://")
}

fn incorrect_type(value: &Value) -> String {
    format!(
        "Incorrect type. Expected pk value, received {}.",
        type_name(value)
    )
}
