use tracing::{info, warn};

use crate::callback::{Button, CallbackAction, CallbackContext, CallbackData};
use crate::traits::BirthdayStore;

/// A callback press as received from the gateway. The token and the
/// original message are both optional on the wire.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    pub sender_chat: i64,
    pub message: Option<OriginalMessage>,
    pub data: Option<String>,
}

/// Chat and message the pressed button was attached to.
#[derive(Debug, Clone, Copy)]
pub struct OriginalMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

/// What the channel should do after the mandatory callback ack.
#[derive(Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Nothing beyond the ack.
    AckOnly,
    /// Replace the original message.
    Edit {
        chat_id: i64,
        message_id: i32,
        text: String,
        keyboard: Option<Vec<Button>>,
    },
}

impl CallbackOutcome {
    fn edit(message: OriginalMessage, text: &str, keyboard: Option<Vec<Button>>) -> Self {
        Self::Edit {
            chat_id: message.chat_id,
            message_id: message.message_id,
            text: text.to_string(),
            keyboard,
        }
    }
}

/// Drive the list → edit → delete/cancel flow from a decoded token.
/// All navigation state lives in the token; there is no session.
pub async fn handle_callback(
    store: &dyn BirthdayStore,
    event: &CallbackEvent,
) -> anyhow::Result<CallbackOutcome> {
    let Some(message) = event.message else {
        info!("No message in callback, skip");
        return Ok(CallbackOutcome::AckOnly);
    };
    let Some(data) = event.data.as_deref() else {
        info!("No data in callback, skip");
        return Ok(CallbackOutcome::AckOnly);
    };

    let token = match CallbackData::decode(data) {
        Ok(token) => token,
        Err(e) => {
            warn!("Failed to decode callback data: {}", e);
            return Ok(CallbackOutcome::AckOnly);
        }
    };

    if event.sender_chat != message.chat_id {
        warn!(
            sender_chat = event.sender_chat,
            chat_id = message.chat_id,
            "Callback from a foreign chat"
        );
        return Ok(CallbackOutcome::edit(message, "Unauthorized", None));
    }

    // Absence of a target is the codec's explicit cancel sentinel and
    // overrides whatever the action says.
    let Some(birthday_id) = token.birthday_id else {
        warn!("No birthday id in callback data");
        return Ok(CallbackOutcome::edit(message, "Canceled", None));
    };

    match token.action {
        CallbackAction::Edit => Ok(CallbackOutcome::edit(
            message,
            "Select option",
            Some(vec![
                Button::new(
                    "Delete",
                    CallbackData::new(
                        CallbackContext::Edit,
                        CallbackAction::Delete,
                        Some(birthday_id),
                    ),
                ),
                Button::new(
                    "Cancel",
                    CallbackData::new(
                        CallbackContext::Edit,
                        CallbackAction::Cancel,
                        Some(birthday_id),
                    ),
                ),
            ]),
        )),
        CallbackAction::Delete => delete_birthday(store, message, birthday_id).await,
        CallbackAction::Cancel => Ok(CallbackOutcome::edit(message, "Canceled", None)),
    }
}

async fn delete_birthday(
    store: &dyn BirthdayStore,
    message: OriginalMessage,
    birthday_id: i64,
) -> anyhow::Result<CallbackOutcome> {
    let Some(user) = store.find_user_by_chat(message.chat_id).await? else {
        warn!("Got button from an unregistered chat");
        return Ok(CallbackOutcome::edit(message, "Canceled", None));
    };
    if !store.is_birthday_owner(user.id, birthday_id).await? {
        warn!(birthday_id, "Tried to delete another user's data");
        return Ok(CallbackOutcome::edit(message, "Canceled", None));
    }

    store.delete_birthday(birthday_id).await?;
    Ok(CallbackOutcome::edit(message, "Deleted", None))
}
