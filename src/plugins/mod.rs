// Built-in plugins for packline

pub mod html_plugin;
pub mod manifest_plugin;
pub mod stats_plugin;

pub use html_plugin::HtmlPlugin;
pub use manifest_plugin::ManifestPlugin;
pub use stats_plugin::StatsPlugin;

use crate::core::models::PluginSpec;
use crate::core::plugin::Plugin;
use std::sync::Arc;

/// Build the plugin a configuration entry describes
pub fn instantiate(spec: &PluginSpec) -> Arc<dyn Plugin> {
    match spec {
        PluginSpec::Html {
            template,
            filename,
            title,
        } => Arc::new(HtmlPlugin::new(template.clone(), filename.clone(), title.clone())),
        PluginSpec::Manifest { filename } => Arc::new(ManifestPlugin::new(filename.clone())),
        PluginSpec::Stats { verbose } => Arc::new(StatsPlugin::new(*verbose)),
    }
}
