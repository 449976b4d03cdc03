//! Static capability and identity description advertised by `initialize`

use rust_mcp_sdk::schema::{
    Implementation, ServerCapabilities, ServerCapabilitiesPrompts, ServerCapabilitiesResources,
    ServerCapabilitiesTools,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityFlags {
    pub tools: bool,
    pub resources: bool,
    pub prompts: bool,
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self {
            tools: true,
            resources: true,
            prompts: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
    pub description: String,
    pub homepage: Option<String>,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self {
            name: "qa-automation-hub".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "QA Automation Service Hub".to_string(),
            homepage: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    flags: CapabilityFlags,
    identity: ServerIdentity,
}

impl CapabilityRegistry {
    pub fn new(flags: CapabilityFlags, identity: ServerIdentity) -> Self {
        Self { flags, identity }
    }

    pub fn flags(&self) -> CapabilityFlags {
        self.flags
    }

    pub fn describe(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: self.flags.tools.then_some(ServerCapabilitiesTools {
                list_changed: Some(true),
            }),
            resources: self.flags.resources.then_some(ServerCapabilitiesResources {
                subscribe: Some(true),
                list_changed: Some(true),
            }),
            prompts: self.flags.prompts.then_some(ServerCapabilitiesPrompts {
                list_changed: Some(true),
            }),
            ..Default::default()
        }
    }

    pub fn server_info(&self) -> Implementation {
        Implementation {
            name: self.identity.name.clone(),
            version: self.identity.version.clone(),
            title: None,
            description: Some(self.identity.description.clone()),
            icons: vec![],
            website_url: self.identity.homepage.clone(),
        }
    }
}
