//! In-memory collaborators for unit tests

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::download::{Downloader, ProgressFn};
use crate::error::{PackageError, PackageResult};
use crate::prompt::Prompt;
use crate::shortcut::ShortcutCreator;

/// Serves registered URLs from memory; anything else is a network error
#[derive(Debug, Clone, Default)]
pub struct MemoryDownloader {
    bodies: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl MemoryDownloader {
    pub fn with(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.borrow_mut().insert(url.to_string(), body.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Downloader for MemoryDownloader {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> PackageResult<u64> {
        self.requests.borrow_mut().push(url.to_string());
        let body = self
            .bodies
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| PackageError::network(url, "HTTP 404 Not Found"))?;

        let total = body.len() as u64;
        progress(0, Some(total));
        std::fs::write(dest, &body)
            .map_err(|e| PackageError::io(format!("Failed to write {}", dest.display()), e))?;
        progress(total, Some(total));
        Ok(total)
    }
}

/// Answers confirmation prompts from a fixed script, then declines
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, question: &str) -> PackageResult<bool> {
        self.asked.borrow_mut().push(question.to_string());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or(false))
    }
}

/// Records shortcut requests; optionally fails every one of them
#[derive(Debug, Default)]
pub struct RecordingShortcuts {
    pub fail: bool,
    created: RefCell<Vec<(PathBuf, String)>>,
}

impl RecordingShortcuts {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<(PathBuf, String)> {
        self.created.borrow().clone()
    }
}

impl ShortcutCreator for RecordingShortcuts {
    fn create(&self, target: &Path, name: &str) -> anyhow::Result<PathBuf> {
        if self.fail {
            anyhow::bail!("no desktop directory");
        }
        self.created
            .borrow_mut()
            .push((target.to_path_buf(), name.to_string()));
        Ok(PathBuf::from("/desktop").join(name))
    }
}
