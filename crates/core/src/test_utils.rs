//! Scripted transport for exercising clients without a device

use crate::command::Command;
use crate::error::{Error, Result};
use crate::traits::{Response, Transport};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// What the mock answers to one command
#[derive(Clone, Debug)]
pub enum MockReply {
    Respond(Response),
    Unreachable,
}

#[derive(Debug, Default)]
struct MockState {
    replies: HashMap<(String, String), VecDeque<MockReply>>,
    sent: Vec<(String, String)>,
}

/// Transport that answers from a script and records every command it sees
///
/// Replies are queued per (address, command). The last queued reply repeats
/// once the queue drains; unscripted commands answer `200 OK`. Transports
/// created with [`Transport::open`] share the script and the log.
#[derive(Clone, Debug)]
pub struct MockTransport {
    address: String,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock transport state poisoned")
    }

    fn push(&self, address: &str, command: &str, reply: MockReply) -> &Self {
        self.state()
            .replies
            .entry((address.to_string(), command.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue a `200` reply with the given body
    pub fn reply(&self, command: &str, body: &str) -> &Self {
        self.push(&self.address, command, MockReply::Respond(Response::new(200, body)))
    }

    /// Queue a reply with an explicit status
    pub fn reply_status(&self, command: &str, status: u16, body: &str) -> &Self {
        self.push(&self.address, command, MockReply::Respond(Response::new(status, body)))
    }

    /// Queue a reply for the same command sent to a different device
    pub fn reply_for(&self, address: &str, command: &str, body: &str) -> &Self {
        self.push(address, command, MockReply::Respond(Response::new(200, body)))
    }

    /// Queue a connection failure
    pub fn unreachable(&self, command: &str) -> &Self {
        self.push(&self.address, command, MockReply::Unreachable)
    }

    /// Commands sent to this transport's address, in order
    pub fn sent(&self) -> Vec<String> {
        self.sent_to(&self.address)
    }

    /// Commands sent to any transport sharing this script, for one address
    pub fn sent_to(&self, address: &str) -> Vec<String> {
        self.state()
            .sent
            .iter()
            .filter(|(addr, _)| addr == address)
            .map(|(_, cmd)| cmd.clone())
            .collect()
    }

    /// How many times a command was sent to this address
    pub fn count(&self, command: &str) -> usize {
        self.sent().iter().filter(|cmd| cmd.as_str() == command).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send(&mut self, command: &Command) -> Result<Response> {
        let mut state = self.state();
        state
            .sent
            .push((self.address.clone(), command.as_str().to_string()));

        let key = (self.address.clone(), command.as_str().to_string());
        let reply = match state.replies.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match reply {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Unreachable) => Err(Error::connection(format!(
                "Could not connect to '{}': connection refused",
                self.address
            ))),
            None => Ok(Response::new(200, "OK")),
        }
    }

    fn open(&self, address: &str) -> Result<Self> {
        Ok(Self {
            address: address.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_reply_repeats() {
        let mut mock = MockTransport::new("10.0.0.2");
        mock.reply("getStatus", "first").reply("getStatus", "second");

        let cmd = Command::new("getStatus");
        assert_eq!(mock.send(&cmd).await.unwrap().body, "first");
        assert_eq!(mock.send(&cmd).await.unwrap().body, "second");
        assert_eq!(mock.send(&cmd).await.unwrap().body, "second");
        assert_eq!(mock.count("getStatus"), 3);
    }

    #[tokio::test]
    async fn test_opened_transport_shares_log() {
        let mock = MockTransport::new("10.0.0.2");
        let mut other = mock.open("10.0.0.9").unwrap();
        other.send(&Command::new("multiroom:Ungroup")).await.unwrap();

        assert!(mock.sent().is_empty());
        assert_eq!(mock.sent_to("10.0.0.9"), vec!["multiroom:Ungroup"]);
    }

    #[tokio::test]
    async fn test_unreachable_is_connection_error() {
        let mut mock = MockTransport::new("10.0.0.2");
        mock.unreachable("getPlayerStatus");
        let err = mock.send(&Command::new("getPlayerStatus")).await.unwrap_err();
        assert!(err.is_connection());
    }
}
