pub mod devworkspace;

// Re-export types
pub use devworkspace::{
    Component, ContainerComponent, DevWorkspace, DevWorkspaceSpec, DevWorkspaceStatus,
    DevWorkspaceTemplateSpec, Endpoint, PluginComponent, WorkspacePhase,
};
