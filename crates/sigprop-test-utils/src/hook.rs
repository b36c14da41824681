//! Scripted policy hook

use parking_lot::Mutex;
use sigprop_core::{ConflictReport, Decision, PolicyHook};
use std::collections::VecDeque;

/// [`PolicyHook`] answering from a script and recording what it was asked
#[derive(Debug)]
pub struct ScriptedHook {
    decision: Decision,
    defaults: Mutex<VecDeque<Option<String>>>,
    confirmations: Mutex<Vec<String>>,
    questions: Mutex<Vec<(String, String)>>,
}

impl ScriptedHook {
    /// Hook answering every confirmation with `decision`
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            defaults: Mutex::new(VecDeque::new()),
            confirmations: Mutex::new(Vec::new()),
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Queue the answer to the next default-value question (`None` cancels)
    #[must_use]
    pub fn with_default(self, value: Option<&str>) -> Self {
        self.defaults.lock().push_back(value.map(str::to_string));
        self
    }

    /// Rendered reports passed to `confirm`
    pub fn confirmations(&self) -> Vec<String> {
        self.confirmations.lock().clone()
    }

    /// `(name, type)` pairs passed to `choose_default_value`
    pub fn questions(&self) -> Vec<(String, String)> {
        self.questions.lock().clone()
    }
}

impl PolicyHook for ScriptedHook {
    fn confirm(&self, report: &ConflictReport) -> Decision {
        self.confirmations.lock().push(report.to_string());
        self.decision
    }

    fn choose_default_value(&self, name: &str, type_text: &str) -> Option<String> {
        self.questions
            .lock()
            .push((name.to_string(), type_text.to_string()));
        self.defaults.lock().pop_front().flatten()
    }
}
