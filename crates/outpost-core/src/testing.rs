//! Scripted automation double used by pipeline and tool tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::applescript::OutlookAutomation;
use crate::error::OutpostError;

/// Replays a fixed sequence of replies and records every script it was
/// given. Replies past the end of the sequence are empty successes.
pub(crate) struct ScriptedRunner {
    replies: Mutex<VecDeque<Result<String, OutpostError>>>,
    scripts: Mutex<Vec<String>>,
    ready_calls: Mutex<usize>,
}

impl ScriptedRunner {
    pub(crate) fn new(replies: Vec<Result<String, OutpostError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            scripts: Mutex::new(Vec::new()),
            ready_calls: Mutex::new(0),
        }
    }

    pub(crate) fn script_count(&self) -> usize {
        self.scripts.lock().unwrap().len()
    }

    pub(crate) fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    pub(crate) fn ready_calls(&self) -> usize {
        *self.ready_calls.lock().unwrap()
    }
}

#[async_trait]
impl OutlookAutomation for ScriptedRunner {
    async fn ensure_ready(&self) -> Result<(), OutpostError> {
        *self.ready_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn run_script(&self, script: &str) -> Result<String, OutpostError> {
        self.scripts.lock().unwrap().push(script.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
