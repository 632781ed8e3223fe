use crate::{
    model::post::{NewPost, POST_TITLE_MAX_LEN, Post, PostChanges, PostTitle},
    serializer::{
        COMMENTS, CommentSerializer, Representation, SerializerContext, Serializer,
        ValidationErrors, WritableSerializer,
        fields::{self, RepresentationBuilder},
        timestamp,
    },
};
use serde_json::Value;

pub const POSTS: &str = "posts";

#[derive(Copy, Clone, Debug)]
pub struct PostSerializer<'a> {
    context: SerializerContext<'a>,
}

impl<'a> PostSerializer<'a> {
    #[must_use]
    pub fn new(context: SerializerContext<'a>) -> Self {
        Self { context }
    }

    fn comments(&self, post: &Post) -> Value {
        let related = self.context.related();
        let links = self.context.links();
        let ids = related.comments_of(post.id).unwrap_or_default();

        if self.context.depth() == 0 {
            return ids
                .iter()
                .map(|id| links.reference(COMMENTS, *id))
                .collect();
        }

        let nested = CommentSerializer::new(self.context.nested());
        ids.iter()
            .map(|id| match related.comment(*id) {
                Some(comment) => nested.to_value(comment),
                None => links.reference(COMMENTS, *id),
            })
            .collect()
    }

    fn validate(&self, data: &Value, required: bool) -> Result<PostChanges, ValidationErrors> {
        let object = fields::input_object(data)?;
        let mut errors = ValidationErrors::new();

        let title = fields::text(
            object,
            "title",
            required,
            Some(POST_TITLE_MAX_LEN),
            &mut errors,
        )
        .and_then(|title| {
            PostTitle::new(title)
                .map_err(|err| errors.add("title", err.to_string()))
                .ok()
        });
        let text = fields::text(object, "text", required, None, &mut errors);

        errors.into_result(PostChanges { title, text })
    }
}

impl Serializer for PostSerializer<'_> {
    type Instance = Post;

    fn to_representation(&self, post: &Post) -> Representation {
        let links = self.context.links();

        RepresentationBuilder::new(self.context.fields())
            .field("id", || Value::from(post.id.get()))
            .field_if(links.is_hyperlinked(), "url", || {
                Value::String(links.item(POSTS, post.id))
            })
            .field("title", || Value::from(post.title.get()))
            .field("text", || Value::from(post.text.as_str()))
            .field("created", || timestamp(post.created))
            .field("comments", || self.comments(post))
            .build()
    }
}

impl WritableSerializer for PostSerializer<'_> {
    type Create = NewPost;
    type Update = PostChanges;

    fn validate_create(&self, data: &Value) -> Result<NewPost, ValidationErrors> {
        let changes = self.validate(data, true)?;

        match changes {
            PostChanges {
                title: Some(title),
                text: Some(text),
            } => Ok(NewPost { title, text }),
            _ => Err(ValidationErrors::new()),
        }
    }

    fn validate_update(&self, data: &Value, partial: bool) -> Result<PostChanges, ValidationErrors> {
        self.validate(data, !partial)
    }
}
