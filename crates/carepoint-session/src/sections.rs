use std::collections::BTreeSet;

use carepoint_core::models::draft::UiState;
use carepoint_core::models::form::SectionKey;
use carepoint_core::models::snapshot::FormSnapshot;
use carepoint_forms::FormDefinition;
use carepoint_forms::rules::{ValidationContext, ValidationErrors};

use crate::error::NavigationError;

/// Tracks where the user is in a multi-section form and which sections
/// are done.
///
/// Navigation has two paths on purpose: [`advance`](Self::advance) (the
/// "Continue" button) is gated on the current section validating, while
/// [`jump_to`](Self::jump_to) (clicking a tab) always succeeds.
pub struct SectionTracker {
    form: &'static dyn FormDefinition,
    order: Vec<SectionKey>,
    current: usize,
    completed: BTreeSet<SectionKey>,
    expanded: BTreeSet<SectionKey>,
}

impl SectionTracker {
    pub fn new(form: &'static dyn FormDefinition) -> Self {
        let order = form.section_keys();
        let expanded = order.first().copied().into_iter().collect();
        Self {
            form,
            order,
            current: 0,
            completed: BTreeSet::new(),
            expanded,
        }
    }

    pub fn sections(&self) -> &[SectionKey] {
        &self.order
    }

    pub fn current(&self) -> SectionKey {
        self.order[self.current]
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.order.len()
    }

    pub fn completed(&self) -> &BTreeSet<SectionKey> {
        &self.completed
    }

    pub fn is_complete(&self, key: SectionKey) -> bool {
        self.completed.contains(&key)
    }

    pub fn is_expanded(&self, key: SectionKey) -> bool {
        self.expanded.contains(&key)
    }

    pub fn is_section_valid(
        &self,
        key: SectionKey,
        snapshot: &FormSnapshot,
        ctx: &ValidationContext,
    ) -> bool {
        self.form.is_section_valid(key, snapshot, ctx)
    }

    /// Mark a section complete if it validates right now. Idempotent.
    /// Returns whether the section is complete afterwards.
    pub fn mark_section_complete(
        &mut self,
        key: SectionKey,
        snapshot: &FormSnapshot,
        ctx: &ValidationContext,
    ) -> bool {
        if self.completed.contains(&key) {
            return true;
        }
        if self.order.contains(&key) && self.is_section_valid(key, snapshot, ctx) {
            self.completed.insert(key);
            return true;
        }
        false
    }

    /// Percentage of the form done, 0..=100.
    ///
    /// Completed sections count in full. The active section earns half a
    /// section when it validates but has not been marked complete yet.
    pub fn completion_percentage(&self, snapshot: &FormSnapshot, ctx: &ValidationContext) -> u8 {
        let total = self.order.len() as f64;
        let current = self.current();
        let partial = if !self.completed.contains(&current)
            && self.is_section_valid(current, snapshot, ctx)
        {
            1.0
        } else {
            0.0
        };
        let done = self.completed.len() as f64 + 0.5 * partial;
        (100.0 * done / total).round().clamp(0.0, 100.0) as u8
    }

    /// "Continue": validate the current section, re-check every completed
    /// section, then move forward one step.
    ///
    /// On the last section the position stays put once it validates.
    pub fn advance(
        &mut self,
        snapshot: &FormSnapshot,
        ctx: &ValidationContext,
    ) -> Result<SectionKey, NavigationError> {
        let section = self.current();
        let errors: ValidationErrors = self
            .form
            .validate_section(section, snapshot, ctx)
            .into_iter()
            .collect();

        let form = self.form;
        self.completed
            .retain(|key| form.is_section_valid(*key, snapshot, ctx));

        if !errors.is_empty() {
            return Err(NavigationError::Blocked { section, errors });
        }
        self.completed.insert(section);

        if !self.is_last() {
            self.expanded.remove(&section);
            self.current += 1;
            let next = self.current();
            self.expanded.insert(next);
        }
        Ok(self.current())
    }

    /// One step back. Always permitted; a no-op on the first section.
    pub fn retreat(&mut self) -> SectionKey {
        if self.current > 0 {
            let leaving = self.current();
            self.expanded.remove(&leaving);
            self.current -= 1;
            let previous = self.current();
            self.expanded.insert(previous);
        }
        self.current()
    }

    /// Tab selection: go straight to any section without validation.
    pub fn jump_to(&mut self, key: SectionKey) -> Result<SectionKey, NavigationError> {
        let index = self
            .order
            .iter()
            .position(|k| *k == key)
            .ok_or(NavigationError::UnknownSection(key))?;
        self.current = index;
        self.expanded.insert(key);
        Ok(key)
    }

    /// Flip a section's expanded flag. Returns the new state.
    pub fn toggle_expanded(&mut self, key: SectionKey) -> bool {
        if self.expanded.remove(&key) {
            false
        } else {
            self.expanded.insert(key);
            true
        }
    }

    pub fn ui_state(&self) -> UiState {
        UiState {
            current_section: self.current(),
            completed_sections: self.completed.clone(),
        }
    }

    /// Rebuild from persisted UI state. Completed sections that no longer
    /// validate against `snapshot` are dropped.
    pub fn restore(&mut self, ui_state: &UiState, snapshot: &FormSnapshot, ctx: &ValidationContext) {
        self.current = self
            .order
            .iter()
            .position(|k| *k == ui_state.current_section)
            .unwrap_or(0);
        self.completed = ui_state
            .completed_sections
            .iter()
            .copied()
            .filter(|key| self.order.contains(key) && self.is_section_valid(*key, snapshot, ctx))
            .collect();
        self.expanded = [self.current()].into_iter().collect();
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.form);
    }
}
