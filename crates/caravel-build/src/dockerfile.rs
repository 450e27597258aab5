use caravel_core::CaravelConfig;

/// Generates the Dockerfile for the bundled artifact.
///
/// The artifact is self-contained (the bundle inlines everything except
/// the configured externals), so the image is a plain copy onto a slim
/// Node base image — no install step.
pub struct DockerfileGenerator<'a> {
    config: &'a CaravelConfig,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(config: &'a CaravelConfig) -> Self {
        Self { config }
    }

    pub fn render(&self) -> String {
        format!(
            r#"FROM node:{node_version}-slim
WORKDIR /app
COPY . .
ENV PORT={port}
EXPOSE {port}
CMD ["node", "index.js"]
"#,
            node_version = self.config.node_version,
            port = self.config.port,
        )
    }
}
