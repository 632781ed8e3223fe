use crate::{
    model::{
        Id,
        comment::{Comment, CommentChanges, NewComment},
        post::PostMarker,
        user::UserMarker,
    },
    serializer::{
        Links, POSTS, PostSerializer, Representation, SerializerContext, Serializer, USERS,
        UserSerializer, ValidationErrors, WritableSerializer,
        fields::{self, RepresentationBuilder},
    },
};
use serde_json::{Map, Value};

pub const COMMENTS: &str = "comments";

#[derive(Copy, Clone, Debug)]
pub struct CommentSerializer<'a> {
    context: SerializerContext<'a>,
}

impl<'a> CommentSerializer<'a> {
    #[must_use]
    pub fn new(context: SerializerContext<'a>) -> Self {
        Self { context }
    }

    /// The post `data` refers to, if it names one at all. Lets callers load
    /// the post before validating.
    #[must_use]
    pub fn referenced_post(links: &Links, data: &Value) -> Option<Id<PostMarker>> {
        let value = data.get("post")?;
        links
            .parse_reference::<PostMarker>(POSTS, value)
            .ok()
            .map(|reference| reference.id)
    }

    fn post(&self, comment: &Comment) -> Value {
        let links = self.context.links();
        match self.context.related().post(comment.post) {
            Some(post) if self.context.depth() > 0 => {
                PostSerializer::new(self.context.nested()).to_value(post)
            }
            _ => links.reference(POSTS, comment.post),
        }
    }

    fn user(&self, comment: &Comment) -> Value {
        let links = self.context.links();
        match self.context.related().user(comment.user) {
            Some(user) if self.context.depth() > 0 => {
                UserSerializer::new(self.context.nested()).to_value(user)
            }
            _ => links.reference(USERS, comment.user),
        }
    }

    fn post_field(
        &self,
        object: &Map<String, Value>,
        required: bool,
        errors: &mut ValidationErrors,
    ) -> Option<Id<PostMarker>> {
        let value = fields::present(object, "post", required, errors)?;
        let reference = self
            .context
            .links()
            .parse_reference::<PostMarker>(POSTS, value)
            .map_err(|message| errors.add("post", message))
            .ok()?;

        if self.context.related().has_post(reference.id) {
            Some(reference.id)
        } else {
            errors.add("post", reference.missing_message());
            None
        }
    }

    fn acting_user(&self, errors: &mut ValidationErrors) -> Option<Id<UserMarker>> {
        match self.context.user() {
            Some(user) if self.context.related().has_user(user) => Some(user),
            Some(user) => {
                errors.add(
                    "user",
                    format!("Invalid pk \"{user}\" - object does not exist."),
                );
                None
            }
            None => {
                errors.add("user", fields::REQUIRED);
                None
            }
        }
    }

    fn validate(
        &self,
        data: &Value,
        required: bool,
    ) -> Result<(CommentChanges, ValidationErrors), ValidationErrors> {
        let object = fields::input_object(data)?;
        let mut errors = ValidationErrors::new();

        let post = self.post_field(object, required, &mut errors);
        let text = fields::text(object, "text", required, None, &mut errors);

        Ok((CommentChanges { post, text }, errors))
    }
}

impl Serializer for CommentSerializer<'_> {
    type Instance = Comment;

    fn to_representation(&self, comment: &Comment) -> Representation {
        let links = self.context.links();

        RepresentationBuilder::new(self.context.fields())
            .field("id", || Value::from(comment.id.get()))
            .field_if(links.is_hyperlinked(), "url", || {
                Value::String(links.item(COMMENTS, comment.id))
            })
            .field("post", || self.post(comment))
            .field("user", || self.user(comment))
            .field("text", || Value::from(comment.text.as_str()))
            .build()
    }
}

impl WritableSerializer for CommentSerializer<'_> {
    type Create = NewComment;
    type Update = CommentChanges;

    /// The comment's user is the acting user of the context, never input.
    fn validate_create(&self, data: &Value) -> Result<NewComment, ValidationErrors> {
        let (changes, mut errors) = self.validate(data, true)?;
        let user = self.acting_user(&mut errors);

        match (changes, user) {
            (
                CommentChanges {
                    post: Some(post),
                    text: Some(text),
                },
                Some(user),
            ) if errors.is_empty() => Ok(NewComment { post, user, text }),
            _ => Err(errors),
        }
    }

    fn validate_update(
        &self,
        data: &Value,
        partial: bool,
    ) -> Result<CommentChanges, ValidationErrors> {
        let (changes, errors) = self.validate(data, !partial)?;
        errors.into_result(changes)
    }
}
