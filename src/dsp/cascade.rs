//! Cascade of independent IIR sections
//!
//! Each section consumes the previous section's output, in insertion order.

use log::warn;
use serde::{Deserialize, Serialize};

use super::section::{DelayState, FilterSection, Stability};

/// Whether cascade sections keep their delay state between blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeMemory {
    /// Every block starts from zeroed state. Block boundaries may click.
    #[default]
    Stateless,
    /// Delay state carries over, so split blocks equal one long block
    Stateful,
}

/// Ordered list of sections plus one `[1, taps - 1]` delay state per section
#[derive(Debug, Clone)]
pub struct CascadeFilter {
    sections: Vec<FilterSection>,
    states: Vec<DelayState>,
    memory: CascadeMemory,
}

impl CascadeFilter {
    pub fn new(memory: CascadeMemory) -> Self {
        Self {
            sections: Vec::new(),
            states: Vec::new(),
            memory,
        }
    }

    /// Append a section and allocate its delay state
    pub fn push(&mut self, section: FilterSection) {
        if section.stability() == Stability::Unstable {
            warn!(
                "cascade section {} has poles outside the unit circle; output may diverge",
                self.sections.len()
            );
        }
        self.states.push(DelayState::zeros(1, section.delay_len()));
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[FilterSection] {
        &self.sections
    }

    pub fn memory(&self) -> CascadeMemory {
        self.memory
    }

    pub fn set_memory(&mut self, memory: CascadeMemory) {
        self.memory = memory;
    }

    /// Delay state of section `index`, if it exists
    pub fn state(&self, index: usize) -> Option<&DelayState> {
        self.states.get(index)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Run `samples` through every section in order
    pub fn process(&mut self, samples: &[f64]) -> Vec<f64> {
        if self.memory == CascadeMemory::Stateless {
            self.reset();
        }

        let mut output = samples.to_vec();
        for (section, state) in self.sections.iter().zip(self.states.iter_mut()) {
            output = section.filter(&output, state.row_mut(0));
        }
        output
    }

    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }

    /// Same sections and memory mode, zeroed state
    pub fn fresh_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.reset();
        copy
    }
}
