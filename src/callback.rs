use base64::Engine;
use thiserror::Error;

/// Which screen the button was rendered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackContext {
    /// The `/next_birthdays` listing.
    List,
    /// The per-birthday edit menu.
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Edit,
    Delete,
    Cancel,
}

/// Navigation intent round-tripped through Telegram callback data.
///
/// There is no server-side session: everything needed to act on a
/// button press is packed into this record. `birthday_id: None` is a
/// meaningful state (handled as cancel), not an encoding error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackData {
    pub context: CallbackContext,
    pub action: CallbackAction,
    pub birthday_id: Option<i64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("callback data is not valid base64")]
    Base64,
    #[error("callback data has unexpected length {0}")]
    Length(usize),
    #[error("unknown context tag {0}")]
    Context(u8),
    #[error("unknown action tag {0}")]
    Action(u8),
}

const HAS_TARGET: u8 = 0b0000_0001;
const HEADER_LEN: usize = 3;
const FULL_LEN: usize = HEADER_LEN + 8;

impl CallbackData {
    pub fn new(
        context: CallbackContext,
        action: CallbackAction,
        birthday_id: Option<i64>,
    ) -> Self {
        Self {
            context,
            action,
            birthday_id,
        }
    }

    /// Pack into a fixed-layout record (flags, context, action, then an
    /// optional big-endian id) and base64 it. The result is at most 15
    /// characters, well under Telegram's 64-byte callback-data cap.
    pub fn encode(&self) -> String {
        let mut buf = Vec::with_capacity(FULL_LEN);
        buf.push(if self.birthday_id.is_some() {
            HAS_TARGET
        } else {
            0
        });
        buf.push(match self.context {
            CallbackContext::List => 0,
            CallbackContext::Edit => 1,
        });
        buf.push(match self.action {
            CallbackAction::Edit => 0,
            CallbackAction::Delete => 1,
            CallbackAction::Cancel => 2,
        });
        if let Some(id) = self.birthday_id {
            buf.extend_from_slice(&id.to_be_bytes());
        }
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
    }

    pub fn decode(data: &str) -> Result<Self, DecodeError> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(data)
            .map_err(|_| DecodeError::Base64)?;

        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::Length(bytes.len()));
        }

        let has_target = bytes[0] & HAS_TARGET != 0;
        let expected = if has_target { FULL_LEN } else { HEADER_LEN };
        if bytes.len() != expected {
            return Err(DecodeError::Length(bytes.len()));
        }

        let context = match bytes[1] {
            0 => CallbackContext::List,
            1 => CallbackContext::Edit,
            other => return Err(DecodeError::Context(other)),
        };
        let action = match bytes[2] {
            0 => CallbackAction::Edit,
            1 => CallbackAction::Delete,
            2 => CallbackAction::Cancel,
            other => return Err(DecodeError::Action(other)),
        };
        let birthday_id = if has_target {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[HEADER_LEN..]);
            Some(i64::from_be_bytes(raw))
        } else {
            None
        };

        Ok(Self {
            context,
            action,
            birthday_id,
        })
    }
}

/// A labeled inline button carrying a callback token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub title: String,
    pub data: CallbackData,
}

impl Button {
    pub fn new(title: impl Into<String>, data: CallbackData) -> Self {
        Self {
            title: title.into(),
            data,
        }
    }
}
