use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One parsed serial line.
///
/// Axis variants carry the operator's numeric argument; it is accepted for
/// compatibility with existing senders and has no effect on the outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "arg", rename_all = "snake_case")]
pub enum Command {
    StepX(i32),
    DirX(i32),
    StepY(i32),
    DirY(i32),
    StepZ(i32),
    DirZ(i32),
    SpindleOn(u8),
    SpindleOff,
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("line contains non-ASCII bytes")]
    NotAscii,
    #[error("unknown command token")]
    UnknownToken,
    #[error("`{token}` needs a numeric argument")]
    MissingArgument { token: &'static str },
    #[error("`{token}` argument is not a decimal number")]
    InvalidArgument { token: &'static str },
    #[error("`{token}` argument {value} is outside 0..=255")]
    ArgumentOutOfRange { token: &'static str, value: i64 },
    #[error("`{token}` takes no argument")]
    UnexpectedArgument { token: &'static str },
    #[error("trailing input after `{token}` command")]
    TrailingInput { token: &'static str },
}

impl Command {
    /// Parses a line, mapping every rejection to [`Command::Unrecognized`].
    pub fn parse(line: &[u8]) -> Command {
        Self::try_parse(line).unwrap_or(Command::Unrecognized)
    }

    pub fn try_parse(line: &[u8]) -> Result<Command, ParseError> {
        if !line.is_ascii() {
            return Err(ParseError::NotAscii);
        }
        let text = std::str::from_utf8(line).map_err(|_| ParseError::NotAscii)?;
        let mut tokens = text.split_ascii_whitespace();
        let token = tokens.next().ok_or(ParseError::Empty)?;

        let command = match token {
            "a" => Command::StepX(axis_arg("a", tokens.next())?),
            "d" => Command::DirX(axis_arg("d", tokens.next())?),
            "w" => Command::StepY(axis_arg("w", tokens.next())?),
            "s" => Command::DirY(axis_arg("s", tokens.next())?),
            "z" => Command::StepZ(axis_arg("z", tokens.next())?),
            "x" => Command::DirZ(axis_arg("x", tokens.next())?),
            "on" => Command::SpindleOn(level_arg(tokens.next())?),
            "off" => {
                if tokens.next().is_some() {
                    return Err(ParseError::UnexpectedArgument { token: "off" });
                }
                Command::SpindleOff
            }
            _ => return Err(ParseError::UnknownToken),
        };

        if tokens.next().is_some() {
            return Err(ParseError::TrailingInput {
                token: command.token(),
            });
        }
        Ok(command)
    }

    /// The wire token that selects this command.
    pub fn token(&self) -> &'static str {
        match self {
            Command::StepX(_) => "a",
            Command::DirX(_) => "d",
            Command::StepY(_) => "w",
            Command::DirY(_) => "s",
            Command::StepZ(_) => "z",
            Command::DirZ(_) => "x",
            Command::SpindleOn(_) => "on",
            Command::SpindleOff => "off",
            Command::Unrecognized => "",
        }
    }

    /// Stable name for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::StepX(_) => "step_x",
            Command::DirX(_) => "dir_x",
            Command::StepY(_) => "step_y",
            Command::DirY(_) => "dir_y",
            Command::StepZ(_) => "step_z",
            Command::DirZ(_) => "dir_z",
            Command::SpindleOn(_) => "spindle_on",
            Command::SpindleOff => "spindle_off",
            Command::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::StepX(n)
            | Command::DirX(n)
            | Command::StepY(n)
            | Command::DirY(n)
            | Command::StepZ(n)
            | Command::DirZ(n) => write!(f, "{} {}", self.token(), n),
            Command::SpindleOn(level) => write!(f, "on {}", level),
            Command::SpindleOff => f.write_str("off"),
            Command::Unrecognized => f.write_str("<unrecognized>"),
        }
    }
}

fn axis_arg(token: &'static str, arg: Option<&str>) -> Result<i32, ParseError> {
    let arg = arg.ok_or(ParseError::MissingArgument { token })?;
    arg.parse::<i32>()
        .map_err(|_| ParseError::InvalidArgument { token })
}

fn level_arg(arg: Option<&str>) -> Result<u8, ParseError> {
    const TOKEN: &str = "on";
    let arg = arg.ok_or(ParseError::MissingArgument { token: TOKEN })?;
    let value = arg
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidArgument { token: TOKEN })?;
    u8::try_from(value).map_err(|_| ParseError::ArgumentOutOfRange {
        token: TOKEN,
        value,
    })
}
