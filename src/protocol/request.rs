use serde::{Deserialize, Serialize};

/// Fields shared by every command variant. Empty today; present on the wire so
/// that common request metadata can be added without touching each variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandBase {}

/// A single SQL statement forwarded verbatim to the executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SqlCommand {
    #[serde(default)]
    pub base: CommandBase,
    pub query: String,
}

impl SqlCommand {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            base: CommandBase::default(),
            query: query.into(),
        }
    }
}

/// Client to server message. The `type` field carries the variant tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "SqlCommand")]
    Sql(SqlCommand),
}

impl From<SqlCommand> for Request {
    fn from(value: SqlCommand) -> Self {
        Request::Sql(value)
    }
}

/// Top-level wrapper; requests always travel under the `command` key.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RequestEnvelope {
    pub command: Request,
}
