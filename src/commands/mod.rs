pub mod declarative;
pub mod lookup;
pub mod schema;
