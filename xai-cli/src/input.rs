//! JSON Lines input for recorded explanations.

use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;
use xai_core::{ClassLabel, ExplanationRecord};

/// One validation sample's explanation with its ground-truth label.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelledExplanation {
    pub ground_truth: ClassLabel,
    pub explanation: ExplanationRecord,
}

/// Open `path` for reading, with `-` meaning stdin.
pub fn open(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Lazily parses one JSON value per non-blank line.
pub struct JsonLines<R, T> {
    lines: io::Lines<R>,
    line_no: usize,
    _item: PhantomData<T>,
}

impl<R: BufRead, T: DeserializeOwned> JsonLines<R, T> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            _item: PhantomData,
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for JsonLines<R, T> {
    type Item = anyhow::Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(
                        Err(e).with_context(|| format!("Failed to read line {}", self.line_no)),
                    );
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&line)
                    .with_context(|| format!("Invalid record on line {}", self.line_no)),
            );
        }
    }
}
