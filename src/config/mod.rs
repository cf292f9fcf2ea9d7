pub mod metrics_config;
pub mod models;
pub mod parser;
pub mod schema;
pub mod settings;
#[cfg(test)]
mod tests;

pub use parser::*;
pub use settings::{
    validate, DataSource, FieldSettings, HttpMethod, PollSource, Settings, SocketSource,
};
