//! Test doubles shared across unit tests.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;

use crate::callback::Button;
use crate::traits::Gateway;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Vec<Button>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub text: String,
    pub keyboard: Option<Vec<Button>>,
}

/// In-memory [`Gateway`] that records outbound traffic.
#[derive(Default)]
pub struct MockGateway {
    sent: Mutex<Vec<SentMessage>>,
    edited: Mutex<Vec<EditedMessage>>,
    next_message_id: AtomicI32,
    fail_sends: bool,
}

impl MockGateway {
    /// A gateway whose every send returns an error.
    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn edited(&self) -> Vec<EditedMessage> {
        self.edited.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&[Button]>,
    ) -> anyhow::Result<i32> {
        if self.fail_sends {
            bail!("mock gateway is configured to fail");
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.map(<[Button]>::to_vec),
        });
        Ok(self.next_message_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<&[Button]>,
    ) -> anyhow::Result<()> {
        if self.fail_sends {
            bail!("mock gateway is configured to fail");
        }
        self.edited.lock().unwrap().push(EditedMessage {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard: keyboard.map(<[Button]>::to_vec),
        });
        Ok(())
    }
}
