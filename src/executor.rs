//! Query execution boundary.
//!
//! The connection layer never interprets SQL itself. Every decoded
//! [`SqlCommand`] is handed to an [`Executor`], which turns it into a
//! [`Response`]. A real engine plugs in here; [`PlaceholderExecutor`] is the
//! stand-in used until one exists, and by the protocol tests.
use log::debug;

use crate::protocol::{Response, SqlCommand};

/// Maps one SQL command to its result.
///
/// Implementations are shared by every session thread and must not block
/// for longer than the statement itself takes.
pub trait Executor: Send + Sync {
    fn execute(&self, command: &SqlCommand) -> Response;
}

impl<F> Executor for F
where
    F: Fn(&SqlCommand) -> Response + Send + Sync,
{
    fn execute(&self, command: &SqlCommand) -> Response {
        self(command)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderExecutor;

impl Executor for PlaceholderExecutor {
    fn execute(&self, command: &SqlCommand) -> Response {
        debug!("executing '{}'", command.query);

        match command.query.as_str() {
            "execute" => Response::execute("Execution successful", false),
            "exit" => Response::execute("Exiting", true),
            _ => Response::query(
                vec![
                    vec!["Result1".to_string(), "Result2".to_string()],
                    vec!["Row2Col1".to_string(), "Row2Col2".to_string()],
                ],
                false,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_statement() {
        let resp = PlaceholderExecutor.execute(&SqlCommand::new("execute"));

        assert_eq!(resp, Response::execute("Execution successful", false));
    }

    #[test]
    fn exit_statement() {
        let resp = PlaceholderExecutor.execute(&SqlCommand::new("exit"));

        assert_eq!(resp, Response::execute("Exiting", true));
        assert!(resp.need_disconnect());
    }

    #[test]
    fn any_other_statement() {
        for query in ["select", "SELECT * FROM users", ""] {
            let resp = PlaceholderExecutor.execute(&SqlCommand::new(query));

            assert_eq!(
                resp,
                Response::query(
                    vec![
                        vec!["Result1".into(), "Result2".into()],
                        vec!["Row2Col1".into(), "Row2Col2".into()],
                    ],
                    false
                )
            );
        }
    }

    #[test]
    fn closure_executor() {
        let executor = |cmd: &SqlCommand| Response::execute(cmd.query.to_uppercase(), false);

        assert_eq!(
            executor.execute(&SqlCommand::new("abc")),
            Response::execute("ABC", false)
        );
    }
}
