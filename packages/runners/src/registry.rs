// ABOUTME: Priority-ordered registry of language runners; the analyzer and engine both walk it
// ABOUTME: in ascending priority order and use the first runner whose CanHandle returns true

use std::sync::Arc;

use crate::runner::LanguageRunner;

pub struct RunnerRegistry {
    runners: Vec<Arc<dyn LanguageRunner>>,
}

impl RunnerRegistry {
    pub fn new(mut runners: Vec<Arc<dyn LanguageRunner>>) -> Self {
        runners.sort_by_key(|r| r.priority());
        Self { runners }
    }

    /// The three built-in runners (C# = 10, Python = 20, Node.js = 40), in
    /// priority order.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Arc::new(crate::languages::csharp::CSharpRunner::default()),
            Arc::new(crate::languages::python::PythonRunner::default()),
            Arc::new(crate::languages::node::NodeRunner::default()),
        ])
    }

    pub fn runners(&self) -> &[Arc<dyn LanguageRunner>] {
        &self.runners
    }

    pub async fn find_handler(&self, dir: &std::path::Path) -> Option<Arc<dyn LanguageRunner>> {
        for runner in &self.runners {
            if runner.can_handle(dir).await {
                return Some(runner.clone());
            }
        }
        None
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn LanguageRunner>> {
        self.runners.iter().find(|r| r.name() == name).cloned()
    }
}
