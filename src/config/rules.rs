//! Intent rule tables
//!
//! The assistant answers from an ordered table of trigger patterns. A table can
//! come from the built-in set below or from a TOML file curated by an
//! administrator.
//!
//! # Example Rule File
//!
//! ```toml
//! fallback = "Sorry, I didn't catch that. Try asking about **courses**."
//!
//! [[rules]]
//! name = "login"
//! triggers = ["log ?in", "sign ?in"]
//! examples = ["How do I log in?"]
//! answer = """
//! **Logging in**
//! 1. Open the login page
//! """
//! ```
//!
//! Order matters: the first rule with a matching trigger wins, so narrow rules
//! must be declared before broad ones.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ConfigError;

/// One authored rule, before its triggers are compiled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Identifier used in diagnostics
    pub name: String,

    /// Case-insensitive regex patterns; a plain phrase is a valid pattern
    pub triggers: Vec<String>,

    /// Reply returned verbatim (supports `**bold**` and newlines)
    pub answer: String,

    /// Sample questions that must reach this rule
    #[serde(default)]
    pub examples: Vec<String>,
}

impl RuleSpec {
    pub fn new<I, S>(name: impl Into<String>, triggers: I, answer: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            triggers: triggers.into_iter().map(Into::into).collect(),
            answer: answer.into(),
            examples: Vec::new(),
        }
    }

    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }
}

/// An ordered rule table plus its fallback answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    pub fallback: String,

    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl RuleTable {
    /// Load a rule table from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a rule table from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let table: RuleTable = toml::from_str(content)?;
        Ok(table)
    }

    /// The table shipped with the platform
    pub fn builtin() -> Self {
        Self {
            fallback: builtin::FALLBACK.to_string(),
            rules: builtin::rules(),
        }
    }
}

/// Built-in answers for the skill-tracking platform
pub mod builtin {
    use super::RuleSpec;

    /// First message of every session
    pub const GREETING: &str = "Hi! 👋 I'm **SkillMate**, your learning assistant.\nAsk me anything about your skills, courses or certificates.";

    /// Quick replies offered while only the greeting is shown
    pub const SUGGESTIONS: &[&str] = &[
        "How do I add a skill?",
        "What is my alignment score?",
        "How do I get a certificate?",
        "What skills are trending?",
    ];

    pub const FALLBACK: &str = "I'm not sure I understood that. 🤔\n\nYou can ask me about:\n• **Logging in** or **signing up**\n• **Adding skills** and your **gap analysis**\n• Your **alignment score**\n• **Courses**, **certificates** and **roadmaps**\n• **Trending skills** and **domains**\n\nTry: \"How do I add a skill?\"";

    const PASSWORD: &str = "**Password trouble?** 🔑\n1. On the login page, click **Forgot password**\n2. Enter the email you registered with\n3. Choose a new password of at least 8 characters\n\nYour account data stays on this device, so use the same browser you signed up with.";

    const REGISTER: &str = "**Creating an account** ✨\n1. Click **Sign up** in the top bar\n2. Enter your name, email and a password\n3. Pick your main **domain** of interest\n4. Press **Create account**, and you're in!";

    const LOGIN: &str = "**Logging in** 🔐\n1. Click **Log in** in the top bar\n2. Enter your email and password\n3. Press **Log in** to open your dashboard\n\nNo account yet? Ask me how to sign up.";

    const PROFILE: &str = "**Your profile** 👤\nOpen the menu and choose **Profile**. There you can update your name, email and photo, and set your **target role**, which drives your alignment score.";

    const CERTIFICATE: &str = "**Certificates** 🎓\nFinish every module of a course and pass its final assessment. Your certificate then appears under **My certificates**, where you can view or download it.";

    const ASSESSMENT: &str = "**Assessments** 📝\nEach course ends with a short quiz. You need **70%** to pass, and you can retake it as many times as you like. Your best attempt is kept.";

    const GAP_ANALYSIS: &str = "**Gap analysis** 📊\nCompares your recorded skills with the skills your target role needs.\n• **Green**: skills you already have\n• **Orange**: skills to improve\n• **Red**: missing skills\nOpen **Analysis → Gap analysis** from your dashboard.";

    const ALIGNMENT: &str = "**Alignment score** 🎯\nA percentage showing how closely your skills match your target role. It goes up as you add skills, raise your levels and complete courses. Find it at the top of your dashboard.";

    const ROADMAP: &str = "**Roadmaps** 🗺️\nEach domain has a step-by-step roadmap from beginner to expert. Open **Roadmaps**, pick your domain, and follow the steps in order. Completed steps are ticked automatically.";

    const TRENDING: &str = "**Trending skills** 📈\nThe **Trending** page lists the skills most in demand right now, per domain. Add one to your profile to see how it changes your alignment score.";

    const DOMAINS: &str = "**Domains** 🧭\nSkills are grouped into domains such as Web Development, Data Science or Cybersecurity. Choose your main domain in your profile; it tailors your roadmap and course suggestions.";

    const COURSES: &str = "**Courses** 📚\n1. Open **Courses** from the menu\n2. Filter by domain or level\n3. Click **Start** to begin\n\nYour progress is saved after every lesson.";

    const ADD_SKILL: &str = "**Adding a skill** ➕\n1. Go to **My skills**\n2. Click **Add skill**\n3. Pick the skill and your level (Beginner, Intermediate, Advanced)\n4. Save\n\nYour gap analysis and alignment score update right away.";

    const SKILLS: &str = "**Skills** 💡\nYour skills are the heart of SkillMate. Record them under **My skills**, then check your **gap analysis** to see what to learn next.";

    const ADMIN: &str = "**Administration** 🛠️\nAdministrators manage domains, trending skills, roadmaps, assessment questions and courses from the **Admin** panel. Admin access is granted by an existing administrator.";

    const LANGUAGE: &str = "**Language** 🌍\nUse the language selector in the top bar to switch the interface between English, French and Spanish. My answers are in English for now.";

    const THANKS: &str = "You're welcome! 😊 Anything else I can help with?";

    const HELP: &str = "**I can help with** 🤝\n• Account: signing up, logging in, your profile\n• Skills: adding skills, gap analysis, alignment score\n• Learning: courses, assessments, certificates, roadmaps\n\nJust ask your question!";

    const GREETING_REPLY: &str = "Hello! 👋 How can I help you with your learning today?";

    /// Declaration order is match priority: narrow rules first, greeting last
    pub fn rules() -> Vec<RuleSpec> {
        vec![
            RuleSpec::new("password", ["password", "forgot", "reset (my )?access"], PASSWORD)
                .with_examples(["I forgot my password", "How can I change my password?"]),
            RuleSpec::new(
                "register",
                ["sign ?up", "register", "create (an? |my )?account", "new account"],
                REGISTER,
            )
            .with_examples(["How do I sign up?", "I want to create an account", "register"]),
            RuleSpec::new("login", ["log ?in", "sign ?in", "can'?t access"], LOGIN)
                .with_examples(["How do I log in?", "where is the sign in page"]),
            RuleSpec::new(
                "profile",
                ["profile", "my account", "(edit|change|update) my (name|email|photo)"],
                PROFILE,
            )
            .with_examples(["How do I edit my profile?", "change my email"]),
            RuleSpec::new("certificate", ["certificat", "diploma", "credential"], CERTIFICATE)
                .with_examples([
                    "How do I get a certificate?",
                    "where can I download my certificates",
                ]),
            RuleSpec::new(
                "assessment",
                ["assessment", "quiz", r"\btests?\b", "evaluat", r"exam\b"],
                ASSESSMENT,
            )
            .with_examples(["How does the assessment work?", "can I retake the quiz"]),
            RuleSpec::new("gap_analysis", ["gap", "missing", r"\black"], GAP_ANALYSIS)
                .with_examples(["Show me my gap analysis", "which skills am I missing"]),
            RuleSpec::new(
                "alignment",
                ["align", "score", "how (well )?do i (match|fit)"],
                ALIGNMENT,
            )
            .with_examples(["What is my alignment score?", "how well do I match my target role"]),
            RuleSpec::new(
                "roadmap",
                ["roadmap", "learning path", "career path", "next steps?", "what should i learn"],
                ROADMAP,
            )
            .with_examples(["Show me the roadmap for data science", "what should I learn next"]),
            RuleSpec::new("trending", ["trend", "in demand", "popular", "hot skills"], TRENDING)
                .with_examples(["What skills are trending?", "which skills are in demand"]),
            RuleSpec::new("domains", ["domains?", "field", "industr(y|ies)", "sector"], DOMAINS)
                .with_examples(["What domains are available?", "which fields can I choose"]),
            RuleSpec::new(
                "courses",
                ["course", "lesson", "training", "module", r"\blearn"],
                COURSES,
            )
            .with_examples(["How do I start a course?", "where are my lessons"]),
            RuleSpec::new(
                "add_skill",
                [
                    "add (a |new |my |some )?skills?",
                    "record (a |my )?skills?",
                    "new skill",
                    "update (my )?skills?",
                ],
                ADD_SKILL,
            )
            .with_examples(["How do I add a skill?", "I want to record my skills"]),
            RuleSpec::new("skills", ["skill"], SKILLS)
                .with_examples(["Tell me about skills", "skills"]),
            RuleSpec::new("admin", ["admin", "moderat", "manage (users|content|data)"], ADMIN)
                .with_examples(["How do I become an admin?", "who is the administrator"]),
            RuleSpec::new(
                "language",
                ["language", "langue", "idioma", "translat", "english", "french", "spanish"],
                LANGUAGE,
            )
            .with_examples(["How do I change the language?", "can I use it in French"]),
            RuleSpec::new("thanks", ["thank", "merci", r"\bthx\b", "gracias"], THANKS)
                .with_examples(["Thanks a lot!", "thank you"]),
            RuleSpec::new("help", ["help", "what can you do", "how does (this|it) work"], HELP)
                .with_examples(["Can you help me?", "what can you do"]),
            RuleSpec::new(
                "greeting",
                [r"\bh(i|ello|ey)\b", "good (morning|afternoon|evening)", "bonjour", "hola"],
                GREETING_REPLY,
            )
            .with_examples(["Hello there", "hi!", "Good morning"]),
        ]
    }
}
