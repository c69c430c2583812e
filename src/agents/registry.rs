use super::Agent;
use super::classifier::{OTHER_INTENT, UNKNOWN_INTENT};
use crate::core::error::AgentError;
use std::sync::Arc;

/// Binds a handler to the intent label that routes to it.
#[derive(Clone)]
pub struct AgentRegistration {
    pub intent: String,
    pub intent_desc: String,
    pub agent: Arc<dyn Agent>,
}

impl AgentRegistration {
    pub fn new(
        intent: impl Into<String>,
        intent_desc: impl Into<String>,
        agent: Arc<dyn Agent>,
    ) -> Result<Self, AgentError> {
        let intent = intent.into();
        let intent_desc = intent_desc.into();

        if intent.trim().is_empty() {
            return Err(AgentError::Config("intent parameter is missing".to_string()));
        }
        if intent_desc.trim().is_empty() {
            return Err(AgentError::Config(format!(
                "intent_desc parameter is missing for {}",
                intent
            )));
        }
        if intent == OTHER_INTENT || intent == UNKNOWN_INTENT {
            return Err(AgentError::Config(format!(
                "intent {} is reserved for the fallback path",
                intent
            )));
        }

        Ok(Self {
            intent,
            intent_desc,
            agent,
        })
    }
}

/// Ordered registration table, read-only once built.
#[derive(Clone, Default)]
pub struct Registry {
    registrations: Vec<AgentRegistration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registrations(
        registrations: Vec<AgentRegistration>,
    ) -> Result<Self, AgentError> {
        let mut registry = Self::new();
        for registration in registrations {
            registry.register(registration)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, registration: AgentRegistration) -> Result<(), AgentError> {
        if self.find(&registration.intent).is_some() {
            return Err(AgentError::Config(format!(
                "intent {} is registered twice",
                registration.intent
            )));
        }
        self.registrations.push(registration);
        Ok(())
    }

    /// Exact label match; the catalog is small so a scan is enough.
    pub fn find(&self, intent: &str) -> Option<&AgentRegistration> {
        self.registrations.iter().find(|r| r.intent == intent)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentRegistration> {
        self.registrations.iter()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
