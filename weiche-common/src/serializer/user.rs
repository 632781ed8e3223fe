use crate::{
    model::user::{CreateUser, USER_HANDLE_MAX_LEN, User, UserHandle},
    serializer::{
        Representation, SerializerContext, Serializer, ValidationErrors,
        fields::{self, RepresentationBuilder},
    },
};
use serde_json::Value;

pub const USERS: &str = "users";

#[derive(Copy, Clone, Debug)]
pub struct UserSerializer<'a> {
    context: SerializerContext<'a>,
}

impl<'a> UserSerializer<'a> {
    #[must_use]
    pub fn new(context: SerializerContext<'a>) -> Self {
        Self { context }
    }

    pub fn validate_registration(&self, data: &Value) -> Result<CreateUser, ValidationErrors> {
        let object = fields::input_object(data)?;
        let mut errors = ValidationErrors::new();

        let handle = fields::text(
            object,
            "handle",
            true,
            Some(USER_HANDLE_MAX_LEN),
            &mut errors,
        )
        .and_then(|handle| {
            UserHandle::new(handle)
                .map_err(|err| errors.add("handle", err.to_string()))
                .ok()
        });

        match handle {
            Some(handle) if errors.is_empty() => Ok(CreateUser { handle }),
            _ => Err(errors),
        }
    }
}

impl Serializer for UserSerializer<'_> {
    type Instance = User;

    fn to_representation(&self, user: &User) -> Representation {
        let links = self.context.links();

        RepresentationBuilder::new(self.context.fields())
            .field("id", || Value::from(user.id.get()))
            .field_if(links.is_hyperlinked(), "url", || {
                Value::String(links.item(USERS, user.id))
            })
            .field("handle", || Value::from(user.handle.get()))
            .build()
    }
}
