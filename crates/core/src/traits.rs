use crate::command::Command;
use crate::error::Result;
use async_trait::async_trait;

/// Raw answer to a command: HTTP status and body text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Carries commands to a single device (HTTP in production, scripted in tests)
#[async_trait]
pub trait Transport: Send {
    /// Address (hostname or IP) of the device this transport talks to
    fn address(&self) -> &str;

    /// Send one command and return whatever the device answered
    ///
    /// Fails only with `Error::Connection`; non-200 statuses are returned as-is.
    async fn send(&mut self, command: &Command) -> Result<Response>;

    /// Open an independent transport of the same kind to another device
    fn open(&self, address: &str) -> Result<Self>
    where
        Self: Sized;
}
