use thiserror::Error;

use crate::{CategoryKind, CommandPayload, InterventionId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid category '{0}'")]
    InvalidCategory(String),
    #[error("unexpected argument '{value}' for {verb}")]
    UnexpectedArgument { verb: &'static str, value: String },
}

/// Parses one line of the host command grammar.
///
/// Verbs are case-insensitive. Intervention identifiers are passed through
/// verbatim since catalog ids such as `7,8-DHF` are case sensitive.
pub fn parse_command_line(input: &str) -> Result<CommandPayload, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(CommandParseError::Empty)?;

    let payload = match verb.as_str() {
        "activate" | "use" | "add" => {
            let category_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("category"))?;
            let intervention_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("intervention"))?;
            let category = parse_category(category_str)?;
            CommandPayload::Activate {
                category,
                intervention: InterventionId::new(intervention_str),
            }
        }
        "run" | "simulate" => CommandPayload::Run,
        "reset" => CommandPayload::Reset,
        "image" | "frame" => CommandPayload::Image,
        "drain" => CommandPayload::Drain,
        "status" => CommandPayload::Status,
        "catalog" | "toolbox" => CommandPayload::Catalog,
        other => return Err(CommandParseError::UnknownCommand(other.to_string())),
    };

    if let Some(extra) = parts.next() {
        return Err(CommandParseError::UnexpectedArgument {
            verb: payload.verb(),
            value: extra.to_string(),
        });
    }

    Ok(payload)
}

fn parse_category(token: &str) -> Result<CategoryKind, CommandParseError> {
    CategoryKind::from_token(token)
        .ok_or_else(|| CommandParseError::InvalidCategory(token.to_string()))
}
