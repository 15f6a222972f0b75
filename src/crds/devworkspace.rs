use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// DevWorkspace as defined by the devfile operator.
/// Only the fields the timing harness populates or reads are modelled; the rest of the
/// schema is owned by the operator and passes through untouched.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "workspace.devfile.io",
    version = "v1alpha2",
    kind = "DevWorkspace",
    plural = "devworkspaces",
    singular = "devworkspace",
    shortname = "dw",
    namespaced,
    status = "DevWorkspaceStatus",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DevWorkspaceSpec {
    /// Whether the workspace should be running
    #[serde(default)]
    pub started: bool,

    #[serde(default)]
    pub template: DevWorkspaceTemplateSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DevWorkspaceTemplateSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

/// A named unit of the workspace template. Exactly one of `plugin` or `container` is set.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginComponent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerComponent>,
}

impl Component {
    pub fn plugin(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plugin: Some(PluginComponent { id: id.into() }),
            container: None,
        }
    }

    pub fn container(name: impl Into<String>, container: ContainerComponent) -> Self {
        Self {
            name: name.into(),
            plugin: None,
            container: Some(container),
        }
    }

    #[cfg(test)]
    pub fn is_plugin(&self) -> bool {
        self.plugin.is_some()
    }

    #[cfg(test)]
    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PluginComponent {
    /// Plugin registry id, e.g. `eclipse/che-theia/latest`
    pub id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerComponent {
    pub image: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub name: String,
    pub target_port: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevWorkspaceStatus {
    /// Id assigned by the operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devworkspace_id: Option<String>,

    /// Current lifecycle phase. Kept as a string: the operator owns the set of values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Phase of an observed workspace, as far as the harness cares
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkspacePhase {
    /// No status yet, or an empty phase
    Unset,
    Starting,
    Running,
    Other(String),
}

impl WorkspacePhase {
    pub fn parse(phase: Option<&str>) -> Self {
        match phase {
            None | Some("") => WorkspacePhase::Unset,
            Some("Starting") => WorkspacePhase::Starting,
            Some("Running") => WorkspacePhase::Running,
            Some(other) => WorkspacePhase::Other(other.to_string()),
        }
    }
}

impl DevWorkspace {
    pub fn phase(&self) -> WorkspacePhase {
        WorkspacePhase::parse(self.status.as_ref().and_then(|s| s.phase.as_deref()))
    }
}
