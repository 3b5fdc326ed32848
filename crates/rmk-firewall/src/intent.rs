//! Intent classification: rule-first, optional external classifier as the
//! primary path with the rule engine as its fallback.

use async_trait::async_trait;
use rmk_core::RmkResult;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Navigation,
    FactRetrieval,
    Complex,
}

const GREETINGS: &[&str] = &["hi", "hello", "hey", "good morning", "good afternoon", "good evening", "yo"];

const NAV_KEYWORDS: &[(&str, &str)] = &[
    ("settings", "settings"),
    ("profile", "profile"),
    ("dashboard", "dashboard"),
    ("home", "home"),
    ("billing", "billing"),
    ("logout", "logout"),
];

const FACT_KEYWORDS: &[&str] = &[
    "email", "e-mail", "my name", "who am i", "my groups", "preferences", "prefer", "remember about me",
];

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> RmkResult<Intent>;
}

/// Always-available fallback: literal greeting match, then keyword tables
/// for navigation/fact-retrieval, else `Complex`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier;

impl RuleClassifier {
    #[must_use]
    pub fn classify_sync(query: &str) -> Intent {
        let lowered = query.trim().to_lowercase();
        if GREETINGS.iter().any(|g| lowered == *g || lowered.starts_with(&format!("{g} "))) {
            return Intent::Greeting;
        }
        if NAV_KEYWORDS.iter().any(|(kw, _)| lowered.contains(kw)) {
            return Intent::Navigation;
        }
        if FACT_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            return Intent::FactRetrieval;
        }
        Intent::Complex
    }

    #[must_use]
    pub fn navigation_target(query: &str) -> Option<&'static str> {
        let lowered = query.to_lowercase();
        NAV_KEYWORDS
            .iter()
            .find(|(kw, _)| lowered.contains(kw))
            .map(|(_, target)| *target)
    }
}

#[async_trait]
impl IntentClassifier for RuleClassifier {
    async fn classify(&self, query: &str) -> RmkResult<Intent> {
        Ok(Self::classify_sync(query))
    }
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    intent: String,
}

/// Calls an external classifier at `{base_url}/classify`. Falls back to
/// [`RuleClassifier`] on any transport error, timeout, or unrecognized
/// label, so a classifier outage degrades to the rule engine rather than
/// failing the request.
pub struct HttpIntentClassifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIntentClassifier {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IntentClassifier for HttpIntentClassifier {
    async fn classify(&self, query: &str) -> RmkResult<Intent> {
        if RuleClassifier::classify_sync(query) == Intent::Greeting {
            return Ok(Intent::Greeting);
        }
        match self.try_classify(query).await {
            Some(intent) => Ok(intent),
            None => Ok(RuleClassifier::classify_sync(query)),
        }
    }
}

impl HttpIntentClassifier {
    async fn try_classify(&self, query: &str) -> Option<Intent> {
        let resp = self
            .client
            .post(format!("{}/classify", self.base_url))
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let parsed: ClassifyResponse = resp.json().await.ok()?;
        match parsed.intent.as_str() {
            "Greeting" => Some(Intent::Greeting),
            "Navigation" => Some(Intent::Navigation),
            "FactRetrieval" => Some(Intent::FactRetrieval),
            "Complex" => Some(Intent::Complex),
            _ => None,
        }
    }
}
