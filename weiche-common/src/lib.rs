pub mod model;
pub mod pagination;
pub mod serializer;
pub mod snowflake;
pub mod util;
