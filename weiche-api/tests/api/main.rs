mod comments;
mod helpers;
mod posts;
mod router;
mod users;
