use crate::{
    config::BenchmarkConfig,
    crds::{
        Component, ContainerComponent, DevWorkspace, DevWorkspaceSpec, DevWorkspaceTemplateSpec,
        Endpoint,
    },
};

/// Plugins every benchmark workspace carries, in order: (component name, plugin id)
pub const PLUGINS: [(&str, &str); 2] = [
    ("theia-ide", "eclipse/che-theia/latest"),
    ("machine-exec", "eclipse/che-machine-exec-plugin/latest"),
];

pub const ENDPOINT_PROTOCOL: &str = "http";

/// Build the workspace submitted for a trial with `num_containers` containers
pub fn build_workspace(config: &BenchmarkConfig, num_containers: usize) -> DevWorkspace {
    let mut components: Vec<Component> = PLUGINS
        .iter()
        .map(|(name, id)| Component::plugin(*name, *id))
        .collect();
    components.extend((0..num_containers).map(|idx| {
        Component::container(format!("component-{}", idx), container_component(config, idx))
    }));

    let mut dw = DevWorkspace::new(
        &config.workspace_name,
        DevWorkspaceSpec {
            started: true,
            template: DevWorkspaceTemplateSpec { components },
        },
    );
    dw.metadata.namespace = Some(config.workspace_namespace.clone());
    dw
}

fn container_component(config: &BenchmarkConfig, idx: usize) -> ContainerComponent {
    ContainerComponent {
        image: config.container_image.clone(),
        memory_limit: Some(config.container_memory_limit.clone()),
        endpoints: vec![Endpoint {
            name: format!("container-{}", idx),
            protocol: Some(ENDPOINT_PROTOCOL.to_string()),
            target_port: config.base_port + idx as i32,
        }],
    }
}
