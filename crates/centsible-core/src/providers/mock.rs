//! Scripted mock provider for testing
//!
//! Replies are queued ahead of time and popped in order, so a test can
//! script an exact multi-stage conversation without a server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::Provider;

/// Mock provider with a scripted reply queue
#[derive(Clone)]
pub struct MockProvider {
    healthy: bool,
    vision: bool,
    script: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a healthy, text-only mock with an empty script
    pub fn new() -> Self {
        Self {
            healthy: true,
            vision: false,
            script: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create a mock that accepts image input
    pub fn with_vision() -> Self {
        Self {
            vision: true,
            ..Self::new()
        }
    }

    /// Create a mock whose health check fails
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Queue a successful reply
    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(reply.into()));
        }
    }

    /// Queue a failure
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(message.into()));
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate(&self, _prompt: &str, image: Option<&[u8]>) -> Result<String> {
        if image.is_some() && !self.vision {
            return Err(Error::InvalidData(
                "Mock provider does not accept image input".into(),
            ));
        }
        let next = self
            .script
            .lock()
            .map_err(|_| Error::InvalidData("Mock script lock poisoned".into()))?
            .pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(Error::InvalidData(message)),
            None => Err(Error::InvalidData("Mock script exhausted".into())),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn supports_vision(&self) -> bool {
        self.vision
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
