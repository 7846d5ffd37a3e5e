use chrono::NaiveDate;

use crate::callback::{Button, CallbackAction, CallbackContext, CallbackData};
use crate::dates::{self, DateError};
use crate::ranker;
use crate::traits::BirthdayStore;

const USAGE_ADD_BIRTHDAY: &str = "Usage: /add_birthday DD.MM[.YYYY] Person Name";
const MAX_PERSON_CHARS: usize = 128;

/// What to send back: text plus an optional single-column keyboard.
#[derive(Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Vec<Button>>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }
}

/// Split off the command word and strip an optional `@botname` suffix.
/// Matching stays case-sensitive, as Telegram commands are.
fn split_command(text: &str) -> (&str, &str) {
    let text = text.trim();
    let (word, rest) = match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    };
    let word = if word.starts_with('/') {
        word.split('@').next().unwrap_or(word)
    } else {
        word
    };
    (word, rest)
}

/// Dispatch one inbound text message to a reply.
pub async fn handle_command(
    store: &dyn BirthdayStore,
    upcoming_limit: usize,
    chat_id: i64,
    text: &str,
    today: NaiveDate,
) -> anyhow::Result<Reply> {
    let (command, arg) = split_command(text);
    match command {
        "/start" => Ok(Reply::text("Hi!")),
        "/chat_id" => Ok(Reply::text(format!("Your chat id is {}", chat_id))),
        "/register" => register(store, chat_id).await,
        "/unregister" => unregister(store, chat_id).await,
        "/add_birthday" => add_birthday(store, chat_id, arg).await,
        "/next_birthdays" => next_birthdays(store, upcoming_limit, chat_id, today).await,
        _ => Ok(Reply::text("Unknown command")),
    }
}

async fn register(store: &dyn BirthdayStore, chat_id: i64) -> anyhow::Result<Reply> {
    if store.find_user_by_chat(chat_id).await?.is_some() {
        return Ok(Reply::text("Already registered"));
    }
    store.register_user(chat_id).await?;
    Ok(Reply::text(
        "Done. Note that all your personal data will be stored in plain text. \
         I promise not to look :)",
    ))
}

async fn unregister(store: &dyn BirthdayStore, chat_id: i64) -> anyhow::Result<Reply> {
    let Some(user) = store.find_user_by_chat(chat_id).await? else {
        return Ok(Reply::text("You are not registered"));
    };
    store.delete_user(user.id).await?;
    Ok(Reply::text("Deleted all your birthdays and forgot about you"))
}

async fn add_birthday(store: &dyn BirthdayStore, chat_id: i64, arg: &str) -> anyhow::Result<Reply> {
    let Some(user) = store.find_user_by_chat(chat_id).await? else {
        return Ok(Reply::text("Not registered yet, try to /register"));
    };

    let Some((date_text, person)) = arg.split_once(char::is_whitespace) else {
        return Ok(Reply::text(USAGE_ADD_BIRTHDAY));
    };
    let person = person.trim();
    if person.is_empty() {
        return Ok(Reply::text(USAGE_ADD_BIRTHDAY));
    }

    let date = match dates::parse(date_text) {
        Ok(date) => date,
        Err(DateError::Syntax) => return Ok(Reply::text(USAGE_ADD_BIRTHDAY)),
        Err(DateError::Invalid) => return Ok(Reply::text("Invalid date")),
    };

    if person.chars().count() > MAX_PERSON_CHARS {
        return Ok(Reply::text(
            "Too long name, provide up to 128 characters please",
        ));
    }

    store.insert_birthday(user.id, person, &date).await?;
    Ok(Reply::text(format!(
        "Inserted the birthday of {} on {}",
        person,
        dates::format_day_month(date.day, date.month)
    )))
}

async fn next_birthdays(
    store: &dyn BirthdayStore,
    upcoming_limit: usize,
    chat_id: i64,
    today: NaiveDate,
) -> anyhow::Result<Reply> {
    let Some(user) = store.find_user_by_chat(chat_id).await? else {
        return Ok(Reply::text("You are not registered yet"));
    };

    let records = store.list_birthdays(user.id).await?;
    let upcoming = ranker::top_upcoming(&records, today, upcoming_limit);
    if upcoming.is_empty() {
        return Ok(Reply::text("There are no birthdays"));
    }

    let keyboard: Vec<Button> = upcoming
        .iter()
        .map(|b| {
            Button::new(
                format!(
                    "{} on {}",
                    b.person,
                    dates::format_day_month(b.day, b.month)
                ),
                CallbackData::new(CallbackContext::List, CallbackAction::Edit, Some(b.id)),
            )
        })
        .collect();

    Ok(Reply {
        text: format!("Next {} birthdays:", keyboard.len()),
        keyboard: Some(keyboard),
    })
}
