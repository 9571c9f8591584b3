//! Skill Registry
//!
//! Capability gating for skills the backend activates. The registry is owned
//! by one orchestrator; nothing here is process-wide.

use std::collections::{HashMap, HashSet};

use mint_ai_core::{SkillCapability, SkillDescriptor};

/// Capabilities granted to a skill that declared none.
pub const DEFAULT_CAPABILITIES: &[SkillCapability] =
    &[SkillCapability::ReadWorkspace, SkillCapability::WriteFiles];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillGrant {
    pub descriptor: SkillDescriptor,
    pub capabilities: HashSet<SkillCapability>,
}

impl SkillGrant {
    pub fn allows(&self, capability: SkillCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    skills: HashMap<String, SkillGrant>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a skill with its declared permissions.
    pub fn register(&mut self, descriptor: SkillDescriptor) -> &SkillGrant {
        let capabilities = granted_capabilities(&descriptor);
        let id = descriptor.id.clone();
        self.skills.insert(
            id.clone(),
            SkillGrant {
                descriptor,
                capabilities,
            },
        );
        &self.skills[&id]
    }

    /// Register a skill with an explicit grant, overriding whatever it declares.
    pub fn grant(
        &mut self,
        descriptor: SkillDescriptor,
        capabilities: impl IntoIterator<Item = SkillCapability>,
    ) {
        self.skills.insert(
            descriptor.id.clone(),
            SkillGrant {
                descriptor,
                capabilities: capabilities.into_iter().collect(),
            },
        );
    }

    /// Resolve the grant for a skill the backend just activated. A skill the
    /// registry already knows keeps its registered grant.
    pub fn activate(&mut self, descriptor: &SkillDescriptor) -> &SkillGrant {
        if !self.skills.contains_key(&descriptor.id) {
            tracing::debug!(skill = %descriptor.id, "registering skill on activation");
            return self.register(descriptor.clone());
        }
        &self.skills[&descriptor.id]
    }

    pub fn get(&self, id: &str) -> Option<&SkillGrant> {
        self.skills.get(id)
    }

    pub fn allows(&self, id: &str, capability: SkillCapability) -> bool {
        self.skills.get(id).is_some_and(|g| g.allows(capability))
    }

    pub fn remove(&mut self, id: &str) -> Option<SkillGrant> {
        self.skills.remove(id)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

fn granted_capabilities(descriptor: &SkillDescriptor) -> HashSet<SkillCapability> {
    match &descriptor.permissions {
        Some(declared) => declared.iter().copied().collect(),
        None => DEFAULT_CAPABILITIES.iter().copied().collect(),
    }
}
