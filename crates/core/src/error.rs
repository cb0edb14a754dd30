use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[derive(Debug, Error, Diagnostic)]
pub enum ScenarioError {
    #[error("invalid command prefix '{pattern}': {message}")]
    #[diagnostic(
        code("csv_scenario.invalid_prefix"),
        help("the prefix must be a regex with one capture group, e.g. ^#([a-zA-Z]+)")
    )]
    InvalidPrefix { pattern: String, message: String },
    #[error("unknown time unit '{0}'")]
    #[diagnostic(code("csv_scenario.invalid_time_unit"), help("expected ms, s, sec, 0 or 1"))]
    InvalidTimeUnit(String),
    #[error("no handler registered for default command '{0}'")]
    #[diagnostic(code("csv_scenario.missing_handler"))]
    MissingHandler(String),
    #[error("invalid arguments for '{command}': {message}")]
    #[diagnostic(code("csv_scenario.invalid_arguments"))]
    InvalidArguments { command: String, message: String },
    #[error("scope has no method '{0}'")]
    #[diagnostic(code("csv_scenario.unknown_method"))]
    UnknownMethod(String),
    #[error("no scope loaded to receive '{0}'")]
    #[diagnostic(code("csv_scenario.missing_scope"))]
    MissingScope(String),
    #[error("command '{command}' failed: {message}")]
    #[diagnostic(code("csv_scenario.command_failed"))]
    CommandFailed { command: String, message: String },
    #[error("handler state for '{command}' is malformed: {message}")]
    #[diagnostic(code("csv_scenario.handler_state"))]
    HandlerState { command: String, message: String },
    #[error("configuration error: {0}")]
    #[diagnostic(code("csv_scenario.config"))]
    Config(String),
    #[error("serialization error: {message}")]
    #[diagnostic(code("csv_scenario.serialization"))]
    Serialization {
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },
}

impl ScenarioError {
    pub(crate) fn invalid_arguments(command: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            command: command.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn from_json_error(input: &str, err: &serde_json::Error) -> Self {
        let (offset, length) = json_error_span(input, err);
        Self::Serialization {
            message: err.to_string(),
            src: input.to_string(),
            span: (offset, length).into(),
        }
    }
}

fn json_error_span(input: &str, error: &serde_json::Error) -> (usize, usize) {
    let line = error.line();
    let column = error.column();
    if line == 0 || column == 0 {
        return (0, 1);
    }
    let mut current_line = 1usize;
    let mut offset = 0usize;
    for chunk in input.split_inclusive('\n') {
        if current_line == line {
            let column_index = column.saturating_sub(1);
            let byte_index = chunk
                .char_indices()
                .nth(column_index)
                .map(|(idx, _)| idx)
                .unwrap_or(chunk.len().saturating_sub(1));
            offset += byte_index;
            return (offset, 1);
        }
        offset += chunk.len();
        current_line += 1;
    }
    (input.len().saturating_sub(1), 1)
}
