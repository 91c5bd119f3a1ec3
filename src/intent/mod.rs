//! Intent matching over free text
//!
//! A [`RuleBook`] is an ordered list of rules compiled once from a
//! [`RuleTable`]. Classification is first-match-wins in declaration order with a
//! single fallback answer, so a broad rule declared early makes the narrow rules
//! after it unreachable. [`RuleBook::compile`] rejects such tables by checking
//! every rule's sample questions against the rules above it.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::config::{RuleSpec, RuleTable};

/// Errors found while compiling a rule table
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Fallback answer must not be empty")]
    EmptyFallback,

    #[error("Fallback answer duplicates the answer of rule '{0}'")]
    FallbackNotDistinct(String),

    #[error("Rule '{0}' has no triggers")]
    NoTriggers(String),

    #[error("Rule '{0}' has an empty answer")]
    EmptyAnswer(String),

    #[error("Duplicate rule name: {0}")]
    DuplicateName(String),

    #[error("Invalid trigger '{pattern}' in rule '{rule}': {reason}")]
    InvalidTrigger {
        rule: String,
        pattern: String,
        reason: String,
    },

    #[error("Example '{sample}' of rule '{rule}' matches none of its triggers")]
    ExampleNotMatched { rule: String, sample: String },

    #[error("Example '{sample}' of rule '{rule}' is captured by earlier rule '{by}'")]
    Shadowed {
        rule: String,
        sample: String,
        by: String,
    },

    #[error("Rule '{rule}' is unreachable: every trigger is captured by an earlier rule")]
    Unreachable { rule: String },
}

/// A compiled rule
#[derive(Debug)]
pub struct Rule {
    name: String,
    triggers: Vec<Regex>,
    answer: String,
    examples: Vec<String>,
}

impl Rule {
    fn compile(spec: &RuleSpec) -> Result<Self, RuleError> {
        if spec.triggers.is_empty() {
            return Err(RuleError::NoTriggers(spec.name.clone()));
        }
        if spec.answer.trim().is_empty() {
            return Err(RuleError::EmptyAnswer(spec.name.clone()));
        }

        let triggers = spec
            .triggers
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| RuleError::InvalidTrigger {
                        rule: spec.name.clone(),
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: spec.name.clone(),
            triggers,
            answer: spec.answer.clone(),
            examples: spec.examples.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Any trigger matching anywhere in the normalized input
    pub fn matches(&self, normalized: &str) -> bool {
        self.triggers.iter().any(|t| t.is_match(normalized))
    }

    /// Triggers without regex syntax, usable as their own sample questions
    fn literal_triggers(&self) -> impl Iterator<Item = &str> {
        self.triggers
            .iter()
            .map(Regex::as_str)
            .filter(|p| regex::escape(p) == *p)
    }
}

/// The ordered, immutable rule set plus its fallback answer
#[derive(Debug)]
pub struct RuleBook {
    rules: Vec<Rule>,
    fallback: String,
}

impl RuleBook {
    /// Compile and validate a rule table
    pub fn compile(table: &RuleTable) -> Result<Self, RuleError> {
        if table.fallback.trim().is_empty() {
            return Err(RuleError::EmptyFallback);
        }

        let mut rules: Vec<Rule> = Vec::with_capacity(table.rules.len());
        for spec in &table.rules {
            if rules.iter().any(|r| r.name == spec.name) {
                return Err(RuleError::DuplicateName(spec.name.clone()));
            }
            if spec.answer == table.fallback {
                return Err(RuleError::FallbackNotDistinct(spec.name.clone()));
            }
            rules.push(Rule::compile(spec)?);
        }

        let book = Self {
            rules,
            fallback: table.fallback.clone(),
        };
        book.check_reachability()?;
        Ok(book)
    }

    fn check_reachability(&self) -> Result<(), RuleError> {
        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.examples.is_empty() {
                for sample in &rule.examples {
                    match self.first_match(&normalize(sample)) {
                        Some(hit) if hit == index => {}
                        Some(hit) => {
                            return Err(RuleError::Shadowed {
                                rule: rule.name.clone(),
                                sample: sample.clone(),
                                by: self.rules[hit].name.clone(),
                            })
                        }
                        None => {
                            return Err(RuleError::ExampleNotMatched {
                                rule: rule.name.clone(),
                                sample: sample.clone(),
                            })
                        }
                    }
                }
                continue;
            }

            let mut literals = rule.literal_triggers().peekable();
            if literals.peek().is_none() {
                tracing::warn!(rule = %rule.name, "Rule has no examples; reachability not checked");
                continue;
            }
            let reachable = literals.any(|lit| self.first_match(&normalize(lit)) == Some(index));
            if !reachable {
                return Err(RuleError::Unreachable {
                    rule: rule.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn first_match(&self, normalized: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.matches(normalized))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Produces a reply for one user message
pub trait Responder: Send + Sync {
    fn respond(&self, input: &str) -> String;
}

/// Maps free text to a fixed answer using a [`RuleBook`]
#[derive(Debug)]
pub struct IntentMatcher {
    book: RuleBook,
}

impl IntentMatcher {
    pub fn new(book: RuleBook) -> Self {
        Self { book }
    }

    /// Answer of the first matching rule, or the fallback
    pub fn classify(&self, input: &str) -> &str {
        self.match_rule(input)
            .map(Rule::answer)
            .unwrap_or(self.book.fallback.as_str())
    }

    /// The rule that wins for `input`, if any
    pub fn match_rule(&self, input: &str) -> Option<&Rule> {
        let normalized = normalize(input);
        self.book.rules.iter().find(|r| r.matches(&normalized))
    }

    pub fn book(&self) -> &RuleBook {
        &self.book
    }
}

impl Responder for IntentMatcher {
    fn respond(&self, input: &str) -> String {
        self.classify(input).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::rules_builtin;

    fn table(rules: Vec<RuleSpec>) -> RuleTable {
        RuleTable {
            fallback: "Try asking about courses or skills.".to_string(),
            rules,
        }
    }

    fn builtin_matcher() -> IntentMatcher {
        IntentMatcher::new(RuleBook::compile(&RuleTable::builtin()).unwrap())
    }

    #[test]
    fn test_builtin_table_compiles() {
        let book = RuleBook::compile(&RuleTable::builtin()).unwrap();
        assert_eq!(book.len(), rules_builtin::rules().len());
    }

    #[test]
    fn test_login_question() {
        let matcher = builtin_matcher();
        let answer = matcher.classify("How do I log in?");

        assert_eq!(matcher.match_rule("How do I log in?").map(Rule::name), Some("login"));
        assert!(answer.contains("**Logging in**"));
        assert!(answer.contains("\n1. "));
        assert_eq!(answer, matcher.classify("How do I log in?"));
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let matcher = builtin_matcher();
        assert_eq!(
            matcher.classify("   HOW DO I LOG IN   "),
            matcher.classify("how do i log in")
        );
    }

    #[test]
    fn test_greeting_inside_sentence() {
        let matcher = builtin_matcher();
        let rule = matcher.match_rule("well hello, nice to meet you").map(Rule::name);
        assert_eq!(rule, Some("greeting"));
        assert_eq!(matcher.match_rule("this is it").map(Rule::name), None);
    }

    #[test]
    fn test_narrow_rule_wins_over_broad() {
        let matcher = builtin_matcher();
        let rule = |q: &str| matcher.match_rule(q).map(Rule::name).map(str::to_string);

        assert_eq!(rule("certificate for my course").as_deref(), Some("certificate"));
        assert_eq!(rule("hello, I forgot my password").as_deref(), Some("password"));
        assert_eq!(rule("add a new skill please").as_deref(), Some("add_skill"));
        assert_eq!(rule("what about skills").as_deref(), Some("skills"));
    }

    #[test]
    fn test_first_match_priority() {
        let narrow = RuleSpec::new("narrow", ["course"], "narrow answer");
        let broad = RuleSpec::new("broad", ["course|lesson"], "broad answer");
        let matcher = IntentMatcher::new(RuleBook::compile(&table(vec![narrow, broad])).unwrap());

        assert_eq!(matcher.classify("my course"), "narrow answer");
        assert_eq!(matcher.classify("my lesson"), "broad answer");
    }

    #[test]
    fn test_fallback_for_unknown_input() {
        let matcher = builtin_matcher();
        let answer = matcher.classify("zqxj vbnm plokij");

        assert_eq!(answer, rules_builtin::FALLBACK);
        assert!(answer.contains("You can ask me about"));
        assert!(matcher
            .book()
            .rules()
            .iter()
            .all(|r| r.answer() != answer));
    }

    #[test]
    fn test_total_over_odd_input() {
        let matcher = builtin_matcher();
        let long = "ß€😀 ".repeat(50_000);

        for input in ["", "   ", "\n\t", "日本語のテキスト", "İSTANBUL", long.as_str()] {
            assert!(!matcher.classify(input).is_empty());
        }
        assert_eq!(matcher.classify(""), rules_builtin::FALLBACK);
    }

    #[test]
    fn test_regex_metacharacters_in_input() {
        let matcher = builtin_matcher();
        assert_eq!(matcher.classify("(.*)[?+"), rules_builtin::FALLBACK);
    }

    #[test]
    fn test_responder_returns_owned_answer() {
        let matcher = builtin_matcher();
        let responder: &dyn Responder = &matcher;
        assert_eq!(responder.respond("thanks!"), matcher.classify("thanks!"));
    }

    #[test]
    fn test_shadowed_example_is_rejected() {
        let broad = RuleSpec::new("courses", ["course"], "courses answer");
        let narrow = RuleSpec::new("certificate", ["certificate"], "certificate answer")
            .with_examples(["certificate for my course"]);

        let err = RuleBook::compile(&table(vec![broad, narrow])).unwrap_err();
        assert_eq!(
            err,
            RuleError::Shadowed {
                rule: "certificate".to_string(),
                sample: "certificate for my course".to_string(),
                by: "courses".to_string(),
            }
        );
    }

    #[test]
    fn test_unreachable_literal_rule_is_rejected() {
        let broad = RuleSpec::new("skills", ["skill"], "skills answer");
        let narrow = RuleSpec::new("add_skill", ["add skill"], "add answer");

        let err = RuleBook::compile(&table(vec![broad, narrow])).unwrap_err();
        assert_eq!(
            err,
            RuleError::Unreachable {
                rule: "add_skill".to_string()
            }
        );
    }

    #[test]
    fn test_example_must_match_own_rule() {
        let rule = RuleSpec::new("login", ["log ?in"], "login answer")
            .with_examples(["how do I register"]);

        let err = RuleBook::compile(&table(vec![rule])).unwrap_err();
        assert!(matches!(err, RuleError::ExampleNotMatched { .. }));
    }

    #[test]
    fn test_invalid_tables_are_rejected() {
        let bad_regex = RuleSpec::new("bad", ["(unclosed"], "x");
        assert!(matches!(
            RuleBook::compile(&table(vec![bad_regex])),
            Err(RuleError::InvalidTrigger { .. })
        ));

        let no_triggers = RuleSpec::new("empty", Vec::<String>::new(), "x");
        assert_eq!(
            RuleBook::compile(&table(vec![no_triggers])).unwrap_err(),
            RuleError::NoTriggers("empty".to_string())
        );

        let dup = vec![
            RuleSpec::new("a", ["one"], "first"),
            RuleSpec::new("a", ["two"], "second"),
        ];
        assert_eq!(
            RuleBook::compile(&table(dup)).unwrap_err(),
            RuleError::DuplicateName("a".to_string())
        );

        let mut empty_fallback = table(vec![]);
        empty_fallback.fallback = "  ".to_string();
        assert_eq!(
            RuleBook::compile(&empty_fallback).unwrap_err(),
            RuleError::EmptyFallback
        );

        let same = RuleSpec::new("same", ["x"], "Try asking about courses or skills.");
        assert_eq!(
            RuleBook::compile(&table(vec![same])).unwrap_err(),
            RuleError::FallbackNotDistinct("same".to_string())
        );
    }

    #[test]
    fn test_every_builtin_example_reaches_its_rule() {
        let matcher = builtin_matcher();
        for spec in rules_builtin::rules() {
            for example in &spec.examples {
                assert_eq!(
                    matcher.match_rule(example).map(Rule::name),
                    Some(spec.name.as_str()),
                    "example {example:?}"
                );
            }
        }
    }
}
