//! Role personas and their system instructions.
//!
//! Roles are configuration data: every role runs the same conversation logic,
//! only the system text differs. The registry is written at startup and read
//! on every chat call, so it is guarded by a read-biased lock.

use crate::core::error::DomainError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Role id used when nothing else is configured.
pub const DEFAULT_ROLE_ID: &str = "default";

/// A named persona (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePrompt {
    pub role_id: String,
    pub system_text: String,
}

impl RolePrompt {
    pub fn new(role_id: impl Into<String>, system_text: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            system_text: system_text.into(),
        }
    }

    /// The built-in persona set, written out when no prompt file exists yet.
    pub fn builtin() -> Vec<RolePrompt> {
        vec![
            RolePrompt::new(DEFAULT_ROLE_ID, "You are a helpful assistant."),
            RolePrompt::new(
                "professional",
                "You are a professional assistant with expertise in various fields.",
            ),
            RolePrompt::new(
                "creative",
                "You are a creative assistant that helps with brainstorming.",
            ),
            RolePrompt::new(
                "code",
                "You are a coding assistant that helps with programming.",
            ),
            RolePrompt::new(
                "儿童心理专家",
                "你是一个儿童心理专家，擅长儿童心理健康和发展指导。",
            ),
            RolePrompt::new("知心大姐姐", "你是一个知心大姐姐，擅长心理疗愈和心理疏导。"),
        ]
    }
}

/// Registry mapping role ids to system instructions.
#[derive(Debug, Default)]
pub struct RolePromptRegistry {
    prompts: RwLock<BTreeMap<String, RolePrompt>>,
}

impl RolePromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with [`RolePrompt::builtin`].
    pub fn with_builtin() -> Self {
        Self::from_prompts(RolePrompt::builtin())
    }

    pub fn from_prompts(prompts: impl IntoIterator<Item = RolePrompt>) -> Self {
        let registry = Self::new();
        for prompt in prompts {
            registry.register(prompt.role_id, prompt.system_text);
        }
        registry
    }

    /// Insert or replace the system text for `role_id`.
    pub fn register(&self, role_id: impl Into<String>, system_text: impl Into<String>) {
        let prompt = RolePrompt::new(role_id, system_text);
        self.prompts.write().insert(prompt.role_id.clone(), prompt);
    }

    pub fn lookup(&self, role_id: &str) -> Result<String, DomainError> {
        self.prompts
            .read()
            .get(role_id)
            .map(|p| p.system_text.clone())
            .ok_or_else(|| DomainError::UnknownRole(role_id.to_string()))
    }

    pub fn contains(&self, role_id: &str) -> bool {
        self.prompts.read().contains_key(role_id)
    }

    pub fn list_ids(&self) -> BTreeSet<String> {
        self.prompts.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.prompts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.read().is_empty()
    }
}
