//! Localized widget labels
//!
//! Headers, placeholders and badges around the chat widget are looked up by key
//! for the selected display language. The assistant's own answers are not
//! translated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    Es,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "fr" | "french" | "français" => Ok(Language::Fr),
            "es" | "spanish" | "español" => Ok(Language::Es),
            other => Err(format!("Unsupported language: {other}")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Es => "es",
        };
        f.write_str(code)
    }
}

/// Key to display string lookup
pub trait TextProvider: Send + Sync {
    /// Returns the label for `key`; never fails
    fn label(&self, key: &str) -> String;
}

/// Label keys used by the widget
pub mod keys {
    pub const TITLE: &str = "chat.title";
    pub const PLACEHOLDER: &str = "chat.placeholder";
    pub const TYPING: &str = "chat.typing";
    pub const UNREAD: &str = "chat.unread";
    pub const SUGGESTIONS: &str = "chat.suggestions";
    pub const RESET: &str = "chat.reset";
    pub const CLOSED: &str = "chat.closed";
    pub const YOU: &str = "chat.you";
}

const BUILTIN_EN: &[(&str, &str)] = &[
    (keys::TITLE, "SkillMate Assistant"),
    (keys::PLACEHOLDER, "Type your question..."),
    (keys::TYPING, "SkillMate is typing..."),
    (keys::UNREAD, "New reply from SkillMate"),
    (keys::SUGGESTIONS, "Quick questions"),
    (keys::RESET, "Conversation restarted"),
    (keys::CLOSED, "Chat minimized. Type /open to show it."),
    (keys::YOU, "You"),
];

const BUILTIN_FR: &[(&str, &str)] = &[
    (keys::TITLE, "Assistant SkillMate"),
    (keys::PLACEHOLDER, "Posez votre question..."),
    (keys::TYPING, "SkillMate écrit..."),
    (keys::UNREAD, "Nouvelle réponse de SkillMate"),
    (keys::SUGGESTIONS, "Questions rapides"),
    (keys::RESET, "Conversation réinitialisée"),
    (keys::CLOSED, "Chat réduit. Tapez /open pour l'afficher."),
    (keys::YOU, "Vous"),
];

const BUILTIN_ES: &[(&str, &str)] = &[
    (keys::TITLE, "Asistente SkillMate"),
    (keys::PLACEHOLDER, "Escribe tu pregunta..."),
    (keys::TYPING, "SkillMate está escribiendo..."),
    (keys::UNREAD, "Nueva respuesta de SkillMate"),
    (keys::SUGGESTIONS, "Preguntas rápidas"),
    (keys::RESET, "Conversación reiniciada"),
    (keys::YOU, "Tú"),
];

/// Labels per language, with English as the fallback
#[derive(Debug, Clone)]
pub struct LabelCatalog {
    language: Language,
    tables: HashMap<Language, HashMap<String, String>>,
}

impl LabelCatalog {
    pub fn builtin(language: Language) -> Self {
        let mut tables = HashMap::new();
        for (lang, entries) in [
            (Language::En, BUILTIN_EN),
            (Language::Fr, BUILTIN_FR),
            (Language::Es, BUILTIN_ES),
        ] {
            let table = entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            tables.insert(lang, table);
        }
        Self { language, tables }
    }

    /// Merge overrides from a TOML file shaped as `[fr] "chat.title" = "..."`
    pub fn with_overrides_file(self, path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        self.with_overrides(&content)
    }

    pub fn with_overrides(mut self, content: &str) -> Result<Self, ConfigError> {
        let overrides: HashMap<String, HashMap<String, String>> = toml::from_str(content)?;
        for (lang, entries) in overrides {
            let lang: Language = lang.parse().map_err(ConfigError::Validation)?;
            self.tables.entry(lang).or_default().extend(entries);
        }
        Ok(self)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    fn lookup(&self, language: Language, key: &str) -> Option<&String> {
        self.tables.get(&language).and_then(|t| t.get(key))
    }
}

impl TextProvider for LabelCatalog {
    fn label(&self, key: &str) -> String {
        self.lookup(self.language, key)
            .or_else(|| self.lookup(Language::En, key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
