//! Seams to the plugin host: identity lookups, the message surface that shows
//! views, and the settings store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{HostError, SettingsError};
use crate::render::View;
use crate::settings::Settings;

pub type UserId = i64;
pub type ChatId = i64;

/// A resolved user taking part in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: UserId,
    pub name: String,
}

impl Participant {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// How a command refers to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(UserId),
    Handle(String),
}

/// A posted message that later edits target. `message_id` is transport
/// specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub chat: ChatId,
    pub message_id: String,
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, user: &UserRef) -> Result<Participant, HostError>;
}

/// Shows views to users. Edits may fail when the message was deleted; callers
/// treat that as harmless.
#[async_trait]
pub trait MessagingSurface: Send + Sync {
    async fn post(&self, chat: ChatId, view: &View) -> Result<MessageRef, HostError>;
    async fn edit(&self, message: &MessageRef, view: &View) -> Result<(), HostError>;
}

pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings, SettingsError>;
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}
