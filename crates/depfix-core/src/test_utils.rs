//! Test doubles for editors.
//!
//! Available to this crate's tests and, through the `test-utils` feature, to
//! the tests of the ecosystem crates.

use crate::command::{CommandOutput, CommandRunner, Invocation};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Handler = dyn Fn(&Invocation) -> CommandOutput + Send + Sync;

/// A [`CommandRunner`] that records invocations instead of spawning them.
///
/// By default every command succeeds with empty output. A handler can be
/// installed to simulate what the package manager would have done, such as
/// rewriting the manifest or failing with a message on stderr.
#[derive(Clone, Default)]
pub struct FakeRunner {
    calls: Arc<Mutex<Vec<Invocation>>>,
    handler: Option<Arc<Handler>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a handler that produces the output of every invocation.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&Invocation) -> CommandOutput + Send + Sync + 'static,
    {
        Self {
            calls: Arc::default(),
            handler: Some(Arc::new(handler)),
        }
    }

    /// A runner whose every command fails with `stderr`.
    pub fn failing(status: i32, stderr: &str) -> Self {
        let stderr = stderr.to_string();
        Self::with_handler(move |_| CommandOutput::failure(status, stderr.clone()))
    }

    /// Every invocation seen so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Command lines of every invocation seen so far.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::command_line).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl std::fmt::Debug for FakeRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeRunner")
            .field("calls", &self.command_lines())
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }
        Ok(match &self.handler {
            Some(handler) => handler(invocation),
            None => CommandOutput::success(""),
        })
    }
}
