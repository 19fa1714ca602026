use crate::core::interfaces::Pipeline;
use crate::core::models::{AssetClass, TransformResult};
use crate::infrastructure::processors::{JsonPipeline, ResourcePipeline, ScriptPipeline, StylePipeline};
use crate::infrastructure::rule_table::{Rule, RuleTable};
use crate::utils::{ErrorContext, Logger, PackError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Registry of named pipelines; runs the one a rule points at
#[derive(Clone, Default)]
pub struct PipelineExecutor {
    pipelines: HashMap<String, Arc<dyn Pipeline>>,
}

impl PipelineExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor with `script`, `style`, `json` and `resource` registered
    pub fn with_builtin_pipelines() -> Self {
        let mut executor = Self::new();
        executor.register(Arc::new(ScriptPipeline::new()));
        executor.register(Arc::new(StylePipeline::default()));
        executor.register(Arc::new(JsonPipeline::new()));
        executor.register(Arc::new(ResourcePipeline));
        executor
    }

    /// Register a pipeline, replacing any with the same id
    pub fn register(&mut self, pipeline: Arc<dyn Pipeline>) {
        self.pipelines.insert(pipeline.id().to_string(), pipeline);
    }

    pub fn has_pipeline(&self, id: &str) -> bool {
        self.pipelines.contains_key(id)
    }

    pub fn pipeline_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Every rule must name a registered pipeline
    pub fn validate(&self, rules: &RuleTable) -> Result<()> {
        for rule in rules.rules() {
            if !self.has_pipeline(&rule.pipeline) {
                return Err(PackError::config(format!(
                    "Rule '{}' uses unknown pipeline '{}' (known: {})",
                    rule.test.source(),
                    rule.pipeline,
                    self.pipeline_ids().join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Transform one asset with the rule matched for it.
    ///
    /// `None` means no rule matched, which is an `UnsupportedAsset` error.
    /// Resource rules never report edges.
    pub fn run(&self, path: &Path, source: &[u8], rule: Option<&Rule>) -> Result<TransformResult> {
        let rule = rule.ok_or_else(|| PackError::UnsupportedAsset {
            path: path.to_path_buf(),
        })?;

        let pipeline = self
            .pipelines
            .get(&rule.pipeline)
            .ok_or_else(|| PackError::config(format!("Unknown pipeline '{}'", rule.pipeline)))?;

        let output = pipeline
            .transform(path, source)
            .map_err(|e| transform_error(path, &rule.pipeline, source, e))?;

        let edges = match rule.terminal {
            AssetClass::Module => output.edges,
            AssetClass::Resource => {
                if !output.edges.is_empty() {
                    Logger::debug(&format!(
                        "Dropping {} edges reported for resource {}",
                        output.edges.len(),
                        path.display()
                    ));
                }
                Vec::new()
            }
        };

        Ok(TransformResult {
            bytes: output.bytes,
            edges,
            class: rule.terminal,
        })
    }
}

fn transform_error(path: &Path, pipeline: &str, source: &[u8], err: anyhow::Error) -> PackError {
    let mut context = ErrorContext::new();

    if let Some(json_err) = err.downcast_ref::<serde_json::Error>() {
        context = context.with_location(json_err.line(), json_err.column());
        if let Ok(text) = std::str::from_utf8(source) {
            context = context.with_snippet(text.to_string());
        }
    }

    PackError::Transform {
        path: path.to_path_buf(),
        pipeline: pipeline.to_string(),
        message: format!("{:#}", err),
        context: Some(context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interfaces::PipelineOutput;
    use crate::infrastructure::rule_table::RulePattern;
    use std::path::PathBuf;

    /// Reports every line as an edge, whatever the rule says
    struct LinesPipeline;

    impl Pipeline for LinesPipeline {
        fn id(&self) -> &str {
            "lines"
        }

        fn transform(&self, _path: &Path, source: &[u8]) -> anyhow::Result<PipelineOutput> {
            let text = String::from_utf8(source.to_vec())?;
            let edges = text.lines().map(str::to_string).collect();
            Ok(PipelineOutput::new(source, edges))
        }
    }

    fn executor() -> PipelineExecutor {
        let mut executor = PipelineExecutor::with_builtin_pipelines();
        executor.register(Arc::new(LinesPipeline));
        executor
    }

    #[test]
    fn test_no_rule_is_unsupported() {
        let err = executor()
            .run(Path::new("/p/data.bin"), b"", None)
            .unwrap_err();
        assert!(matches!(err, PackError::UnsupportedAsset { .. }));
    }

    #[test]
    fn test_module_keeps_edges() {
        let rule = Rule::new(RulePattern::extensions(&["txt"]), "lines", AssetClass::Module);
        let result = executor()
            .run(Path::new("a.txt"), b"./b\n./c", Some(&rule))
            .unwrap();

        assert_eq!(result.class, AssetClass::Module);
        assert_eq!(result.edges, vec!["./b", "./c"]);
    }

    #[test]
    fn test_resource_drops_edges() {
        let rule = Rule::new(RulePattern::extensions(&["txt"]), "lines", AssetClass::Resource);
        let result = executor()
            .run(Path::new("a.txt"), b"./b\n./c", Some(&rule))
            .unwrap();

        assert_eq!(result.class, AssetClass::Resource);
        assert!(result.edges.is_empty());
        assert_eq!(result.bytes, b"./b\n./c");
    }

    #[test]
    fn test_pipeline_failure_becomes_transform_error() {
        let rule = Rule::new(RulePattern::extensions(&["json"]), "json", AssetClass::Module);
        let err = executor()
            .run(Path::new("/p/bad.json"), b"{\n  oops\n}", Some(&rule))
            .unwrap_err();

        match err {
            PackError::Transform {
                path,
                pipeline,
                context,
                ..
            } => {
                assert_eq!(path, PathBuf::from("/p/bad.json"));
                assert_eq!(pipeline, "json");
                assert_eq!(context.and_then(|c| c.line), Some(2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_unknown_pipeline() {
        let table = RuleTable::new(vec![Rule::new(
            RulePattern::extensions(&["vue"]),
            "vue",
            AssetClass::Module,
        )]);
        let err = executor().validate(&table).unwrap_err();
        assert!(err.to_string().contains("unknown pipeline 'vue'"));

        let known = RuleTable::new(vec![Rule::new(
            RulePattern::extensions(&["css"]),
            "style",
            AssetClass::Module,
        )]);
        assert!(executor().validate(&known).is_ok());
    }
}
