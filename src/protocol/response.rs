use std::fmt;

use serde::{Deserialize, Serialize};

/// Extra info carried by the rejection sent when the server is at capacity.
pub const MAX_CONNECTIONS_REACHED: &str = "Max connections reached";

/// Fields shared by every result variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultBase {
    pub need_disconnect: bool,
}

/// Outcome of a statement that produces no rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecuteResult {
    pub base: ResultBase,
    pub extra_info: String,
}

/// Outcome of a statement that produces rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryResult {
    pub base: ResultBase,
    pub results: Vec<Vec<String>>,
}

/// Server to client message. The `type` field carries the variant tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Response {
    #[serde(rename = "ExecuteResult")]
    Execute(ExecuteResult),
    #[serde(rename = "QueryResult")]
    Query(QueryResult),
}

impl Response {
    pub fn execute(extra_info: impl Into<String>, need_disconnect: bool) -> Self {
        Response::Execute(ExecuteResult {
            base: ResultBase { need_disconnect },
            extra_info: extra_info.into(),
        })
    }

    pub fn query(results: Vec<Vec<String>>, need_disconnect: bool) -> Self {
        Response::Query(QueryResult {
            base: ResultBase { need_disconnect },
            results,
        })
    }

    /// Response sent to a connection turned away by admission control.
    pub fn rejected() -> Self {
        Response::execute(MAX_CONNECTIONS_REACHED, true)
    }

    pub fn base(&self) -> &ResultBase {
        match self {
            Response::Execute(r) => &r.base,
            Response::Query(r) => &r.base,
        }
    }

    pub fn need_disconnect(&self) -> bool {
        self.base().need_disconnect
    }

    /// True for the capacity rejection; clients must not retry after it.
    pub fn is_rejection(&self) -> bool {
        match self {
            Response::Execute(r) => r.base.need_disconnect && r.extra_info == MAX_CONNECTIONS_REACHED,
            Response::Query(_) => false,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Execute(r) => write!(f, "{}", r.extra_info),
            Response::Query(r) => {
                let rows = r
                    .results
                    .iter()
                    .map(|row| row.join(" | "))
                    .collect::<Vec<String>>();
                write!(f, "{}", rows.join("\n"))
            }
        }
    }
}

/// Top-level wrapper; responses always travel under the `response` key.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ResponseEnvelope {
    pub response: Response,
}
