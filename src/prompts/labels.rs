use std::collections::HashSet;

use regex::Regex;

use crate::errors::{BoxPromptError, BoxPromptResult};

/// Labels of the image prompts the device currently holds, in device order.
///
/// New prompts get `<prefix><n>` with the lowest `n` in `1..=max` not already
/// used, so deleting `object2` frees that name for the next box.
#[derive(Debug, Clone)]
pub struct ImagePromptLabels {
    labels: Vec<String>,
    max: usize,
    prefix: String,
    pattern: Regex,
}

impl ImagePromptLabels {
    pub fn new(prefix: &str, max: usize) -> BoxPromptResult<Self> {
        let pattern = Regex::new(&format!(r"^{}(\d+)$", regex::escape(prefix)))
            .map_err(|e| BoxPromptError::Config(format!("label prefix {prefix:?}: {e}")))?;
        Ok(Self {
            labels: Vec::new(),
            max,
            prefix: prefix.to_string(),
            pattern,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.labels.len() >= self.max
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Next free generated label, or `None` when the registry is full.
    pub fn next_label(&self) -> Option<String> {
        if self.is_full() {
            return None;
        }
        let used: HashSet<usize> = self
            .labels
            .iter()
            .filter_map(|l| self.pattern.captures(l))
            .filter_map(|c| c[1].parse().ok())
            .collect();
        let n = (1..=self.max)
            .find(|i| !used.contains(i))
            .unwrap_or(self.labels.len() + 1);
        Some(format!("{}{}", self.prefix, n))
    }

    /// Record a prompt the device accepted.
    pub fn commit(&mut self, label: String) -> BoxPromptResult<()> {
        if self.is_full() {
            return Err(BoxPromptError::PromptLimit(self.max));
        }
        self.labels.push(label);
        Ok(())
    }

    pub fn rename(&mut self, index: usize, label: &str) -> BoxPromptResult<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(BoxPromptError::InvalidLabel("label cannot be empty".into()));
        }
        let slot = self
            .labels
            .get_mut(index)
            .ok_or_else(|| BoxPromptError::InvalidLabel(format!("no image prompt at index {index}")))?;
        *slot = label.to_string();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> BoxPromptResult<String> {
        if index >= self.labels.len() {
            return Err(BoxPromptError::InvalidLabel(format!("no image prompt at index {index}")));
        }
        Ok(self.labels.remove(index))
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    /// Replace with the device's list, keeping at most `max` of the newest entries.
    pub fn replace(&mut self, labels: Vec<String>) {
        let skip = labels.len().saturating_sub(self.max);
        self.labels = labels.into_iter().skip(skip).collect();
    }
}
