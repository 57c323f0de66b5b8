//! Control-flow label allocation.
//!
//! Labels are `<Class>_<n>.<role>`, where `n` comes from a per-class counter
//! that only ever increases. Uniqueness therefore holds no matter how deeply
//! statements nest.

/// The statement a label pair is allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelContext {
    /// `while`: pair is `start` / `end`.
    Loop,
    /// `if`: pair is `true` / `end`.
    Branch,
}

/// Labels allocated for one control statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPair {
    pub start: String,
    pub end: String,
    base: String,
}

impl LabelPair {
    /// Label closing the `else` branch of an `if`.
    pub fn join(&self) -> String {
        format!("{}.join", self.base)
    }
}

/// Per-class label counter.
#[derive(Debug)]
pub struct LabelAllocator {
    class_name: String,
    counter: u32,
}

impl LabelAllocator {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            counter: 0,
        }
    }

    /// Allocate a fresh label pair; never returns the same labels twice.
    pub fn new_label_pair(&mut self, context: LabelContext) -> LabelPair {
        let base = format!("{}_{}", self.class_name, self.counter);
        self.counter += 1;

        let start_role = match context {
            LabelContext::Loop => "start",
            LabelContext::Branch => "true",
        };
        LabelPair {
            start: format!("{}.{}", base, start_role),
            end: format!("{}.end", base),
            base,
        }
    }
}
