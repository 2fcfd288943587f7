use serde::{Deserialize, Serialize};

use crate::{
    domain::{ChatId, ItemRef, OrderId, UserId},
    error::{OrderingError, OrderingResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Help,
    Menu,
    Order,
    Comment,
}

/// Inbound update as delivered by the chat transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ChatUpdate {
    Command {
        chat_id: ChatId,
        user_id: UserId,
        #[serde(default)]
        display_name: String,
        command: Command,
    },
    Callback {
        chat_id: ChatId,
        user_id: UserId,
        #[serde(default)]
        display_name: String,
        data: String,
    },
    Text {
        chat_id: ChatId,
        user_id: UserId,
        text: String,
    },
}

impl ChatUpdate {
    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::Command { chat_id, .. } | Self::Callback { chat_id, .. } | Self::Text { chat_id, .. } => {
                *chat_id
            }
        }
    }
}

/// Upper bound chat platforms put on a button's callback data.
pub const MAX_CALLBACK_DATA_BYTES: usize = 64;

/// Button payloads. The string form has to fit in
/// [`MAX_CALLBACK_DATA_BYTES`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    OpenCategory(String),
    ToggleItem(ItemRef),
    CategoryDone(String),
    ConfirmOrder,
    ClearOrder,
    CompleteOrder(OrderId),
    CancelOrder(OrderId),
}

impl CallbackAction {
    pub fn parse(data: &str) -> OrderingResult<Self> {
        let malformed = || OrderingError::invalid_input(format!("malformed callback data {data:?}"));

        match data {
            "order_confirm" => return Ok(Self::ConfirmOrder),
            "order_clear" => return Ok(Self::ClearOrder),
            _ => {}
        }

        let (prefix, rest) = data.split_once('_').ok_or_else(malformed)?;
        if rest.is_empty() {
            return Err(malformed());
        }

        match prefix {
            "menu" => Ok(Self::OpenCategory(rest.to_string())),
            "done" => Ok(Self::CategoryDone(rest.to_string())),
            "toggle" => {
                let (category, index) = rest.rsplit_once('_').ok_or_else(malformed)?;
                if category.is_empty() {
                    return Err(malformed());
                }
                let index = index.parse::<usize>().map_err(|_| malformed())?;
                Ok(Self::ToggleItem(ItemRef::new(category, index)))
            }
            "complete" => Ok(Self::CompleteOrder(OrderId(rest.to_string()))),
            "cancel" => Ok(Self::CancelOrder(OrderId(rest.to_string()))),
            _ => Err(malformed()),
        }
    }

    pub fn to_data(&self) -> String {
        match self {
            Self::OpenCategory(category) => format!("menu_{}", category.to_lowercase()),
            Self::ToggleItem(item) => format!("toggle_{}_{}", item.category, item.index),
            Self::CategoryDone(category) => format!("done_{category}"),
            Self::ConfirmOrder => "order_confirm".to_string(),
            Self::ClearOrder => "order_clear".to_string(),
            Self::CompleteOrder(order_id) => format!("complete_{order_id}"),
            Self::CancelOrder(order_id) => format!("cancel_{order_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: &CallbackAction) -> Self {
        Self {
            label: label.into(),
            callback_data: action.to_data(),
        }
    }
}

/// One rendered message: text plus an optional inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyboard: Vec<Vec<Button>>,
}

impl ViewMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        self.keyboard.push(row);
        self
    }

    pub fn with_button(self, button: Button) -> Self {
        self.with_row(vec![button])
    }
}

/// Everything the acting chat should currently see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub messages: Vec<ViewMessage>,
}

impl View {
    pub fn single(message: ViewMessage) -> Self {
        Self {
            messages: vec![message],
        }
    }

    pub fn push(mut self, message: ViewMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// A message for some other chat, e.g. telling a customer that staff
/// canceled their order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forward {
    pub chat_id: ChatId,
    pub message: ViewMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub view: View,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forwards: Vec<Forward>,
}

impl Reply {
    pub fn message(message: ViewMessage) -> Self {
        Self {
            view: View::single(message),
            forwards: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::message(ViewMessage::text(text))
    }

    pub fn forward(mut self, chat_id: ChatId, message: ViewMessage) -> Self {
        self.forwards.push(Forward { chat_id, message });
        self
    }

    /// First line of text of the acting chat's view, handy in logs and tests.
    pub fn headline(&self) -> &str {
        self.view
            .messages
            .first()
            .and_then(|message| message.text.lines().next())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
