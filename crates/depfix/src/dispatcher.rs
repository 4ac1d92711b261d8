//! Technology dispatch.
//!
//! Maps each [`Technology`] to its editor. The match is exhaustive, so a new
//! technology does not compile until it has an editor.

use crate::config::DepfixConfig;
use depfix_core::{DependencyEditor, SharedRunner, Technology};
use depfix_go::GoEditor;
use depfix_maven::MavenEditor;
use depfix_npm::{NpmEditor, YarnEditor};
use depfix_nuget::NugetEditor;
use depfix_pypi::{PipEditor, PipenvEditor, PoetryEditor};
use std::collections::HashMap;

/// Builds a fresh editor for `technology`.
pub fn create_editor(
    technology: Technology,
    runner: SharedRunner,
    config: &DepfixConfig,
) -> Box<dyn DependencyEditor> {
    match technology {
        Technology::Go => Box::new(GoEditor::new(runner, config.go.clone())),
        Technology::Pip => Box::new(PipEditor::new(config.python.clone())),
        Technology::Pipenv => Box::new(PipenvEditor::new(runner, config.python.clone())),
        Technology::Poetry => Box::new(PoetryEditor::new(runner, config.python.clone())),
        Technology::Npm => Box::new(NpmEditor::new(runner, config.npm.clone())),
        Technology::Yarn => Box::new(YarnEditor::new(runner, config.yarn.clone())),
        Technology::Maven => Box::new(MavenEditor::new(runner, config.maven.clone())),
        Technology::Nuget => Box::new(NugetEditor::new(runner, config.nuget.clone())),
    }
}

/// Hands out one editor per technology for the duration of a run.
///
/// Editors are created on first use and reused afterwards, so per-run state
/// such as Maven module discovery or the detected Yarn flavor survives
/// between fixes.
pub struct Dispatcher {
    runner: SharedRunner,
    config: DepfixConfig,
    editors: HashMap<Technology, Box<dyn DependencyEditor>>,
}

impl Dispatcher {
    pub fn new(runner: SharedRunner, config: DepfixConfig) -> Self {
        Self {
            runner,
            config,
            editors: HashMap::new(),
        }
    }

    pub fn editor(&mut self, technology: Technology) -> &mut dyn DependencyEditor {
        let runner = &self.runner;
        let config = &self.config;
        self.editors
            .entry(technology)
            .or_insert_with(|| {
                tracing::debug!(technology = %technology, "creating editor");
                create_editor(technology, runner.clone(), config)
            })
            .as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depfix_core::test_utils::FakeRunner;
    use std::sync::Arc;

    #[test]
    fn test_every_technology_has_matching_editor() {
        let config = DepfixConfig::default();
        for technology in Technology::ALL {
            let editor = create_editor(technology, Arc::new(FakeRunner::new()), &config);
            assert_eq!(editor.technology(), technology);
        }
    }

    #[test]
    fn test_transitive_capability() {
        let config = DepfixConfig::default();
        let transitive: Vec<_> = Technology::ALL
            .into_iter()
            .filter(|t| {
                create_editor(*t, Arc::new(FakeRunner::new()), &config).supports_transitive()
            })
            .collect();
        assert_eq!(transitive, vec![Technology::Npm]);
    }

    #[test]
    fn test_editors_are_reused() {
        let mut dispatcher = Dispatcher::new(Arc::new(FakeRunner::new()), DepfixConfig::default());
        let first = std::ptr::from_mut(dispatcher.editor(Technology::Maven)).cast::<()>();
        let second = std::ptr::from_mut(dispatcher.editor(Technology::Maven)).cast::<()>();
        assert_eq!(first, second);
        assert_eq!(dispatcher.editor(Technology::Go).technology(), Technology::Go);
    }
}
