//! Per-business assistant configuration.
//!
//! Each onboarded business is one JSON file in the clients directory, keyed
//! by its provisioned phone number. `default.json` is the fallback used when
//! a call arrives on a number no file claims. Loading never fails the server:
//! unreadable files are logged and skipped, and a built-in fallback stands in
//! when even `default.json` is missing.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// Assistant configuration for one business.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusinessConfig {
    /// Business name used in the greeting and the assistant persona
    pub business_name: String,
    /// BCP 47 language tag for the telephony greeting
    pub language: String,
    /// Provisioned phone number this business answers on, E.164
    pub phone_number: Option<String>,
    /// Voice for the assistant's audio output
    pub voice: Option<String>,
    /// Full replacement for the generated assistant instructions
    pub assistant_instructions: Option<String>,
    /// Conversational tone, e.g. "professional", "friendly"
    pub tone: Option<String>,
    /// Services the business offers, woven into the persona
    pub services: Vec<String>,
    /// Keywords that should make the assistant flag a job as urgent
    pub emergency_keywords: Vec<String>,
    /// Industry descriptor from onboarding
    pub industry: Option<String>,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            business_name: "Our Business".to_string(),
            language: "en-GB".to_string(),
            phone_number: None,
            voice: None,
            assistant_instructions: None,
            tone: None,
            services: Vec::new(),
            emergency_keywords: Vec::new(),
            industry: None,
        }
    }
}

impl BusinessConfig {
    /// Greeting spoken by the telephony provider before the stream connects.
    pub fn greeting(&self) -> String {
        format!(
            "Hi, you're through to {}. Please speak after the tone.",
            self.business_name
        )
    }

    /// System instructions for the assistant.
    ///
    /// An explicit `assistant_instructions` value replaces the generated
    /// persona wholesale; otherwise the persona is built from the business
    /// profile.
    pub fn instructions(&self) -> String {
        if let Some(instructions) = &self.assistant_instructions {
            return instructions.clone();
        }

        let mut instructions = format!(
            "You are a friendly, professional telephone receptionist for {}.\n\
             You are talking to a caller on the phone.\n\
             Have a natural conversation. Use short, clear answers.\n\
             Ask follow-up questions when needed.\n\
             Speak British English. Do not say you are an AI unless asked.",
            self.business_name
        );
        if let Some(tone) = &self.tone {
            instructions.push_str(&format!("\nKeep your tone {tone}."));
        }
        if !self.services.is_empty() {
            instructions.push_str(&format!(
                "\nThe business offers: {}.",
                self.services.join(", ")
            ));
        }
        if !self.emergency_keywords.is_empty() {
            instructions.push_str(&format!(
                "\nIf the caller mentions any of the following, treat the job as urgent: {}.",
                self.emergency_keywords.join(", ")
            ));
        }
        instructions
    }
}

/// All onboarded businesses, resolved by dialled number.
#[derive(Debug, Clone)]
pub struct BusinessDirectory {
    by_number: HashMap<String, BusinessConfig>,
    default: BusinessConfig,
}

impl BusinessDirectory {
    /// Load every `*.json` file under `dir`.
    ///
    /// Never fails: unreadable or malformed files are logged and skipped, a
    /// missing directory yields an empty directory, and the built-in default
    /// stands in when `default.json` is absent.
    pub fn load(dir: &Path) -> Self {
        let mut by_number = HashMap::new();
        let mut default = None;

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %err,
                    "clients directory unreadable, using built-in default"
                );
                return Self {
                    by_number,
                    default: BusinessConfig::default(),
                };
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let config: BusinessConfig = match std::fs::read_to_string(&path)
                .map_err(|err| err.to_string())
                .and_then(|raw| serde_json::from_str(&raw).map_err(|err| err.to_string()))
            {
                Ok(config) => config,
                Err(err) => {
                    tracing::error!(file = %path.display(), error = %err, "skipping client config");
                    continue;
                }
            };

            if path.file_name().is_some_and(|name| name == "default.json") {
                default = Some(config);
                continue;
            }
            match &config.phone_number {
                Some(number) => {
                    by_number.insert(number.clone(), config);
                }
                None => {
                    tracing::warn!(
                        file = %path.display(),
                        "client config has no phone_number, unreachable by dialled number"
                    );
                }
            }
        }

        tracing::info!(
            businesses = by_number.len(),
            has_default = default.is_some(),
            "client directory loaded"
        );
        Self {
            by_number,
            default: default.unwrap_or_default(),
        }
    }

    /// Resolve the business for a dialled number, falling back to the
    /// default configuration.
    pub fn resolve(&self, dialled: Option<&str>) -> &BusinessConfig {
        dialled
            .and_then(|number| self.by_number.get(number))
            .unwrap_or(&self.default)
    }
}
