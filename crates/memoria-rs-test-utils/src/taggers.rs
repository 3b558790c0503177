use memoria_rs_memory::{Tagger, TaggerError};
use parking_lot::Mutex;
use std::time::Duration;

/// Always returns the same tags.
#[derive(Debug, Clone)]
pub struct FixedTagger {
    name: String,
    tags: Vec<String>,
}

impl FixedTagger {
    pub fn new(name: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            name: name.into(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }
}

impl Tagger for FixedTagger {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self, _user_id: &str, _role: &str, _content: &str) -> Result<Vec<String>, TaggerError> {
        Ok(self.tags.clone())
    }
}

/// Always returns an error.
#[derive(Debug, Clone, Default)]
pub struct FailingTagger;

impl Tagger for FailingTagger {
    fn name(&self) -> &str {
        "failing"
    }

    fn tag(&self, _user_id: &str, _role: &str, _content: &str) -> Result<Vec<String>, TaggerError> {
        Err(TaggerError::new("failing", "classifier offline"))
    }
}

/// Always panics.
#[derive(Debug, Clone, Default)]
pub struct PanickingTagger;

impl Tagger for PanickingTagger {
    fn name(&self) -> &str {
        "panicking"
    }

    fn tag(&self, _user_id: &str, _role: &str, _content: &str) -> Result<Vec<String>, TaggerError> {
        panic!("panicking tagger invoked")
    }
}

/// Sleeps before returning no tags.
#[derive(Debug, Clone)]
pub struct SlowTagger {
    delay: Duration,
}

impl SlowTagger {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Tagger for SlowTagger {
    fn name(&self) -> &str {
        "slow"
    }

    fn tag(&self, _user_id: &str, _role: &str, _content: &str) -> Result<Vec<String>, TaggerError> {
        std::thread::sleep(self.delay);
        Ok(vec!["slow".to_string()])
    }
}

/// Records every `(user_id, role, content)` it sees.
#[derive(Debug, Default)]
pub struct RecordingTagger {
    calls: Mutex<Vec<(String, String, String)>>,
}

impl RecordingTagger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().clone()
    }
}

impl Tagger for RecordingTagger {
    fn name(&self) -> &str {
        "recording"
    }

    fn tag(&self, user_id: &str, role: &str, content: &str) -> Result<Vec<String>, TaggerError> {
        self.calls
            .lock()
            .push((user_id.to_string(), role.to_string(), content.to_string()));
        Ok(Vec::new())
    }
}
