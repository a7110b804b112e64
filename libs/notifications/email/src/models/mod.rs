use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Character set used for every message part unless overridden.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// One or many recipient addresses.
///
/// Deserializes from either a single string or an array of strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    /// Normalize into a list; a single address becomes a one-element list.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(address) => vec![address.clone()],
            Self::Many(addresses) => addresses.clone(),
        }
    }
}

impl From<&str> for Recipients {
    fn from(address: &str) -> Self {
        Self::One(address.to_string())
    }
}

impl From<String> for Recipients {
    fn from(address: String) -> Self {
        Self::One(address)
    }
}

impl From<Vec<String>> for Recipients {
    fn from(addresses: Vec<String>) -> Self {
        Self::Many(addresses)
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(addresses: Vec<&str>) -> Self {
        Self::Many(addresses.into_iter().map(String::from).collect())
    }
}

/// Semantic content of one message, supplied by the caller per send.
///
/// The whole instance is exposed to templates under the `email` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailInstance {
    /// Free-text name or label (commonly the recipient's name)
    pub name: String,
    /// Subject line; rendered as an inline template
    pub subject: String,
    pub to_addresses: Recipients,
    #[serde(default)]
    pub cc_addresses: Option<Vec<String>>,
    #[serde(default)]
    pub bcc_addresses: Option<Vec<String>>,
}

impl EmailInstance {
    pub fn new(
        name: impl Into<String>,
        subject: impl Into<String>,
        to: impl Into<Recipients>,
    ) -> Self {
        Self {
            name: name.into(),
            subject: subject.into(),
            to_addresses: to.into(),
            cc_addresses: None,
            bcc_addresses: None,
        }
    }

    /// Set CC recipients
    pub fn with_cc(mut self, cc: Vec<String>) -> Self {
        self.cc_addresses = Some(cc);
        self
    }

    /// Set BCC recipients
    pub fn with_bcc(mut self, bcc: Vec<String>) -> Self {
        self.bcc_addresses = Some(bcc);
        self
    }

    /// Build the render context: `{ "email": self }` merged with `extra`.
    ///
    /// Multi-word fields are exposed in both snake_case and camelCase
    /// (`email.to_addresses` and `email.toAddresses`). Keys in `extra` take
    /// precedence, including a caller-supplied `email` key.
    pub fn render_context(&self, extra: Option<Map<String, Value>>) -> serde_json::Result<Value> {
        let mut email = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut email {
            let aliases: Vec<(String, Value)> = fields
                .iter()
                .filter(|(key, _)| key.contains('_'))
                .map(|(key, value)| (camel_case(key), value.clone()))
                .collect();
            for (alias, value) in aliases {
                fields.entry(alias).or_insert(value);
            }
        }

        let mut context = Map::new();
        context.insert("email".to_string(), email);

        if let Some(extra) = extra {
            context.extend(extra);
        }

        Ok(Value::Object(context))
    }
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Template flavour; part of the cache key (`name.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateType {
    Html,
    Txt,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination lists; absent cc/bcc are always represented as empty lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub to_addresses: Vec<String>,
    pub cc_addresses: Vec<String>,
    pub bcc_addresses: Vec<String>,
}

impl Destination {
    pub fn from_email(email: &EmailInstance) -> Self {
        Self {
            to_addresses: email.to_addresses.to_vec(),
            cc_addresses: email.cc_addresses.clone().unwrap_or_default(),
            bcc_addresses: email.bcc_addresses.clone().unwrap_or_default(),
        }
    }
}

/// Per-part character sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charsets {
    #[serde(default = "default_charset")]
    pub html: String,
    #[serde(default = "default_charset")]
    pub text: String,
    #[serde(default = "default_charset")]
    pub subject: String,
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

impl Default for Charsets {
    fn default() -> Self {
        Self {
            html: default_charset(),
            text: default_charset(),
            subject: default_charset(),
        }
    }
}

/// Fully rendered, backend-agnostic message handed to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMessage {
    pub html_body: String,
    pub text_body: String,
    pub subject: String,
    pub destination: Destination,
    pub sender_address: String,
    pub reply_to_address: String,
    pub charsets: Charsets,
}
