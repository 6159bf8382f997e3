use std::fmt;

/// A single wire command, e.g. `setPlayerCmd:vol:42`
///
/// Built from a verb and zero or more parameters joined with `:`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    pub fn new(verb: impl Into<String>) -> Self {
        Self(verb.into())
    }

    /// Append a `:`-separated parameter
    pub fn arg(mut self, param: impl fmt::Display) -> Self {
        self.0.push(':');
        self.0.push_str(&param.to_string());
        self
    }

    /// Build a command from text typed by a user, sent verbatim
    pub fn raw(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
