//! Conversion between records and their JSON representation.
//!
//! A serializer renders an instance into a JSON object and validates JSON
//! input into the values needed to create or change an instance. Relations
//! are rendered as references or, up to a depth, as nested representations
//! of the related record. Serializers never touch storage: everything they
//! need besides the instance comes from [`RelatedRecords`].

mod comment;
mod errors;
mod fields;
mod links;
mod post;
mod related;
mod user;

pub use comment::{COMMENTS, CommentSerializer};
pub use errors::{NON_FIELD_ERRORS, ValidationErrors};
pub use fields::FieldSelection;
pub use links::{Links, Reference, RelationStyle};
pub use post::{POSTS, PostSerializer};
pub use related::RelatedRecords;
pub use user::{USERS, UserSerializer};

use crate::model::{Id, user::UserMarker};
use fields::ALL_FIELDS;
use serde_json::{Map, Value};
use time::{OffsetDateTime, UtcDateTime, format_description::well_known::Rfc3339};

pub type Representation = Map<String, Value>;

pub trait Serializer {
    type Instance;

    fn to_representation(&self, instance: &Self::Instance) -> Representation;

    fn to_value(&self, instance: &Self::Instance) -> Value {
        Value::Object(self.to_representation(instance))
    }

    fn to_values<'i, I>(&self, instances: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'i Self::Instance>,
        Self::Instance: 'i,
    {
        instances
            .into_iter()
            .map(|instance| self.to_value(instance))
            .collect()
    }
}

pub trait WritableSerializer: Serializer {
    type Create;
    type Update;

    fn validate_create(&self, data: &Value) -> Result<Self::Create, ValidationErrors>;

    /// Validates a replacement of an instance. With `partial`, only the fields
    /// present in `data` are validated and changed.
    fn validate_update(&self, data: &Value, partial: bool)
    -> Result<Self::Update, ValidationErrors>;
}

/// Everything a serializer needs besides the instance itself.
#[derive(Copy, Clone, Debug)]
pub struct SerializerContext<'a> {
    related: &'a RelatedRecords,
    links: &'a Links,
    fields: &'a FieldSelection,
    depth: u8,
    user: Option<Id<UserMarker>>,
}

impl<'a> SerializerContext<'a> {
    #[must_use]
    pub fn new(related: &'a RelatedRecords, links: &'a Links) -> Self {
        Self {
            related,
            links,
            fields: &ALL_FIELDS,
            depth: 0,
            user: None,
        }
    }

    /// How many levels of relations are rendered as nested representations.
    #[must_use]
    pub fn with_depth(self, depth: u8) -> Self {
        Self { depth, ..self }
    }

    /// Applies to the top level only; nested representations are complete.
    #[must_use]
    pub fn with_fields(self, fields: &'a FieldSelection) -> Self {
        Self { fields, ..self }
    }

    /// The user on whose behalf input is validated.
    #[must_use]
    pub fn with_user(self, user: Option<Id<UserMarker>>) -> Self {
        Self { user, ..self }
    }

    /// Context for rendering a related record one level down.
    #[must_use]
    pub fn nested(self) -> Self {
        Self {
            fields: &ALL_FIELDS,
            depth: self.depth.saturating_sub(1),
            ..self
        }
    }

    #[must_use]
    pub fn related(&self) -> &'a RelatedRecords {
        self.related
    }

    #[must_use]
    pub fn links(&self) -> &'a Links {
        self.links
    }

    #[must_use]
    pub fn fields(&self) -> &'a FieldSelection {
        self.fields
    }

    #[must_use]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    #[must_use]
    pub fn user(&self) -> Option<Id<UserMarker>> {
        self.user
    }
}

fn timestamp(time: UtcDateTime) -> Value {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .map_or(Value::Null, Value::String)
}
