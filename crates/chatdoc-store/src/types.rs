use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Speaker label used when rendering a transcript.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp,
        }
    }

    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::User, text, timestamp)
    }

    pub fn assistant(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::Assistant, text, timestamp)
    }
}

mod secret_string_serde {
    use super::*;

    pub fn serialize<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        secret.expose_secret().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

mod option_secret_string_serde {
    use super::*;

    pub fn serialize<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match secret {
            Some(s) => serializer.serialize_some(s.expose_secret()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(|opt| opt.map(SecretString::from))
    }
}

/// Bring-your-own-keys bundle redirecting processing to the user's own services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialBundle {
    #[serde(rename = "mistral_api_key", with = "secret_string_serde")]
    pub api_key: SecretString,
    #[serde(rename = "zilliz_uri")]
    pub vector_store_uri: String,
    #[serde(rename = "zilliz_token", with = "secret_string_serde")]
    pub vector_store_token: SecretString,
    pub collection_name: String,
}

impl CredentialBundle {
    pub fn new(
        api_key: impl Into<String>,
        vector_store_uri: impl Into<String>,
        vector_store_token: impl Into<String>,
        collection_name: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            vector_store_uri: vector_store_uri.into(),
            vector_store_token: SecretString::from(vector_store_token.into()),
            collection_name: collection_name.into(),
        }
    }

    /// All four fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
            && !self.vector_store_uri.is_empty()
            && !self.vector_store_token.expose_secret().is_empty()
            && !self.collection_name.is_empty()
    }
}

impl PartialEq for CredentialBundle {
    fn eq(&self, other: &Self) -> bool {
        self.api_key.expose_secret() == other.api_key.expose_secret()
            && self.vector_store_uri == other.vector_store_uri
            && self.vector_store_token.expose_secret() == other.vector_store_token.expose_secret()
            && self.collection_name == other.collection_name
    }
}

/// Partial bundle captured on an entry and replayed on every later query or delete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialOverride {
    #[serde(
        rename = "mistral_api_key",
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_secret_string_serde"
    )]
    pub api_key: Option<SecretString>,
    #[serde(
        rename = "zilliz_uri",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vector_store_uri: Option<String>,
    #[serde(
        rename = "zilliz_token",
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_secret_string_serde"
    )]
    pub vector_store_token: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
}

impl CredentialOverride {
    pub fn is_complete(&self) -> bool {
        fn filled(value: Option<&str>) -> bool {
            value.is_some_and(|v| !v.is_empty())
        }

        filled(self.api_key.as_ref().map(|s| s.expose_secret()))
            && filled(self.vector_store_uri.as_deref())
            && filled(self.vector_store_token.as_ref().map(|s| s.expose_secret()))
            && filled(self.collection_name.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none()
            && self.vector_store_uri.is_none()
            && self.vector_store_token.is_none()
            && self.collection_name.is_none()
    }
}

impl From<&CredentialBundle> for CredentialOverride {
    fn from(bundle: &CredentialBundle) -> Self {
        Self {
            api_key: Some(bundle.api_key.clone()),
            vector_store_uri: Some(bundle.vector_store_uri.clone()),
            vector_store_token: Some(bundle.vector_store_token.clone()),
            collection_name: Some(bundle.collection_name.clone()),
        }
    }
}

impl PartialEq for CredentialOverride {
    fn eq(&self, other: &Self) -> bool {
        fn exposed(secret: &Option<SecretString>) -> Option<&str> {
            secret.as_ref().map(|s| s.expose_secret())
        }

        exposed(&self.api_key) == exposed(&other.api_key)
            && self.vector_store_uri == other.vector_store_uri
            && exposed(&self.vector_store_token) == exposed(&other.vector_store_token)
            && self.collection_name == other.collection_name
    }
}

/// One uploaded document and its conversation.
///
/// `id`, `created_at` and `protected` are fixed at creation; `turns` only grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    #[serde(rename = "upload_id")]
    id: String,
    #[serde(rename = "filename")]
    label: String,
    #[serde(rename = "upload_date")]
    created_at: DateTime<Utc>,
    #[serde(rename = "byok", default)]
    protected: bool,
    #[serde(rename = "overrides", default, skip_serializing_if = "Option::is_none")]
    credential_override: Option<CredentialOverride>,
    #[serde(rename = "chats", default)]
    turns: Vec<Message>,
}

impl ConversationEntry {
    /// Create a fresh entry. It is protected from expiry only when the
    /// captured override is complete.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        created_at: DateTime<Utc>,
        credential_override: Option<CredentialOverride>,
    ) -> Self {
        let protected = credential_override
            .as_ref()
            .is_some_and(CredentialOverride::is_complete);

        Self {
            id: id.into(),
            label: label.into(),
            created_at,
            protected,
            credential_override,
            turns: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn credential_override(&self) -> Option<&CredentialOverride> {
        self.credential_override.as_ref()
    }

    /// Messages, oldest first.
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    pub(crate) fn push_turn(&mut self, message: Message) {
        self.turns.push(message);
    }

    pub(crate) fn apply(&mut self, patch: EntryPatch) {
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(credential_override) = patch.credential_override {
            self.credential_override = credential_override;
        }
    }
}

/// Fields of an entry that may change after creation.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub label: Option<String>,
    /// `Some(None)` drops the captured override.
    pub credential_override: Option<Option<CredentialOverride>>,
}

impl EntryPatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }
}
