use crate::serializer::{
    Representation,
    errors::{NON_FIELD_ERRORS, ValidationErrors},
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const NOT_NULL: &str = "This field may not be null.";
pub(crate) const NOT_A_STRING: &str = "Not a valid string.";
pub(crate) const BLANK: &str = "This field may not be blank.";

pub(crate) static ALL_FIELDS: FieldSelection = FieldSelection {
    include: None,
    exclude: BTreeSet::new(),
};

/// Which fields of a representation to render.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct FieldSelection {
    include: Option<BTreeSet<String>>,
    exclude: BTreeSet<String>,
}

impl FieldSelection {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: Some(fields.into_iter().map(Into::into).collect()),
            exclude: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn without<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Parses comma separated lists such as `?fields=id,title` and `?omit=text`.
    #[must_use]
    pub fn parse(fields: Option<&str>, omit: Option<&str>) -> Self {
        Self {
            include: fields.map(split_list).filter(|fields| !fields.is_empty()),
            exclude: omit.map(split_list).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn allows(&self, field: &str) -> bool {
        self.include
            .as_ref()
            .is_none_or(|include| include.contains(field))
            && !self.exclude.contains(field)
    }
}

fn split_list(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Builds a representation, skipping fields the selection leaves out without
/// computing them.
pub(crate) struct RepresentationBuilder<'a> {
    selection: &'a FieldSelection,
    representation: Representation,
}

impl<'a> RepresentationBuilder<'a> {
    pub(crate) fn new(selection: &'a FieldSelection) -> Self {
        Self {
            selection,
            representation: Map::new(),
        }
    }

    pub(crate) fn field(mut self, name: &str, value: impl FnOnce() -> Value) -> Self {
        if self.selection.allows(name) {
            self.representation.insert(name.to_owned(), value());
        }
        self
    }

    pub(crate) fn field_if(self, condition: bool, name: &str, value: impl FnOnce() -> Value) -> Self {
        if condition { self.field(name, value) } else { self }
    }

    pub(crate) fn build(self) -> Representation {
        self.representation
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

pub(crate) fn input_object(data: &Value) -> Result<&Map<String, Value>, ValidationErrors> {
    data.as_object().ok_or_else(|| {
        ValidationErrors::single(
            NON_FIELD_ERRORS,
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                type_name(data)
            ),
        )
    })
}

/// The non-null value of `field`, if any. Reports missing required fields
/// and nulls.
pub(crate) fn present<'v>(
    object: &'v Map<String, Value>,
    field: &str,
    required: bool,
    errors: &mut ValidationErrors,
) -> Option<&'v Value> {
    match object.get(field) {
        None => {
            if required {
                errors.add(field, REQUIRED);
            }
            None
        }
        Some(Value::Null) => {
            errors.add(field, NOT_NULL);
            None
        }
        Some(value) => Some(value),
    }
}

/// A trimmed, non-blank string field. Numbers are accepted in their textual
/// form.
pub(crate) fn text(
    object: &Map<String, Value>,
    field: &str,
    required: bool,
    max_len: Option<usize>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let text = match present(object, field, required, errors)? {
        Value::String(text) => text.trim().to_owned(),
        Value::Number(number) => number.to_string(),
        _ => {
            errors.add(field, NOT_A_STRING);
            return None;
        }
    };

    if text.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if let Some(max_len) = max_len
        && text.chars().count() > max_len
    {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        );
        return None;
    }

    Some(text)
}
