//! SkillMate - rule-based assistant for a skill-tracking platform
//!
//! Answers questions about accounts, skills, analyses, courses and certificates
//! from an ordered intent table, inside a chat widget with a typing indicator
//! and an unread badge.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod core;
mod i18n;
mod intent;
mod markup;
mod terminal;

use crate::config::Config;
use crate::core::ChatWidget;
use crate::i18n::LabelCatalog;
use crate::intent::{IntentMatcher, RuleBook};

// Every widget transition runs on this one thread
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillmate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;

    let table = config.rule_table()?;
    let matcher = IntentMatcher::new(RuleBook::compile(&table)?);
    if matcher.book().is_empty() {
        tracing::warn!("Rule table is empty; every question gets the fallback answer");
    }
    tracing::info!("📚 Loaded {} intent rule(s)", matcher.book().len());
    tracing::debug!(
        rules = ?matcher.book().rules().iter().map(|r| r.name()).collect::<Vec<_>>(),
        "Rule priority order"
    );

    let mut labels = LabelCatalog::builtin(config.language);
    if let Some(path) = &config.labels_path {
        labels = labels.with_overrides_file(path)?;
    }
    tracing::info!(language = %labels.language(), "🌍 Labels ready");

    let mut widget = ChatWidget::new(Arc::new(matcher), config.delay)
        .with_suggestions(config.suggestions.clone());
    if let Some(greeting) = &config.greeting {
        widget = widget.with_greeting(greeting.as_str());
    }

    terminal::run(widget, Arc::new(labels)).await
}
