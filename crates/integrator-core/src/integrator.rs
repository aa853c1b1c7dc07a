//! Batch integrator
//!
//! Walks every class named by the manifest or the ledger, works out what
//! changed since the last run, applies or reverts the mutations and writes the
//! changed classes back. The caller owns loading and storing the ledger.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::ast::Printer;
use crate::builder::{finder, ClassDescriptor, ClassModifier};
use crate::loader::SourceTreeLoader;
use crate::lock::{
    fingerprint_action, is_preexisting, mark_preexisting, Fingerprint, LockData, LockPlan, PlanStep,
};
use crate::manifest::{Manifest, ManifestAction};
use crate::parser::Parser;
use crate::{IntegratorConfig, Result};

/// Output adapter for progress and problems of a run.
pub trait IoNotifier: Send + Sync {
    fn write(&self, message: &str);

    fn warning(&self, message: &str);

    fn error(&self, message: &str);
}

/// Notifier that forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl IoNotifier for LogNotifier {
    fn write(&self, message: &str) {
        info!("{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Counters of one run. Methods for the first three, classes for the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: usize,
    pub skipped: usize,
    pub reverted: usize,
    pub written: usize,
    pub missing: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} applied, {} skipped, {} reverted, {} classes written, {} missing, {} failed",
            self.applied, self.skipped, self.reverted, self.written, self.missing, self.failed
        )
    }
}

/// Result of one class that went through without error.
#[derive(Debug, Default)]
struct ClassOutcome {
    applied: usize,
    skipped: usize,
    reverted: usize,
    written: bool,
    /// Ledger entry of the class after this run
    entry: BTreeMap<String, Fingerprint>,
}

pub struct Integrator<'a> {
    config: IntegratorConfig,
    parser: &'a dyn Parser,
    printer: &'a dyn Printer,
    notifier: &'a dyn IoNotifier,
    class_filter: Vec<String>,
}

impl<'a> Integrator<'a> {
    pub fn new(
        config: IntegratorConfig,
        parser: &'a dyn Parser,
        printer: &'a dyn Printer,
        notifier: &'a dyn IoNotifier,
    ) -> Self {
        Self {
            config,
            parser,
            printer,
            notifier,
            class_filter: Vec::new(),
        }
    }

    /// Restricts the run to classes whose name contains one of `filter`
    /// (case-insensitive). An empty filter selects everything.
    pub fn with_class_filter(mut self, filter: Vec<String>) -> Self {
        self.class_filter = filter.into_iter().map(|f| f.to_ascii_lowercase()).collect();
        self
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Brings every selected class in line with the manifest and records the
    /// result in `lock`. A failing class is reported and left alone; the run
    /// goes on with the next one.
    pub fn run(&self, manifest: &Manifest, lock: &mut LockData) -> RunSummary {
        let loader = SourceTreeLoader::new(self.parser, &self.config);
        let modifier = ClassModifier::new(self.parser);
        let mut summary = RunSummary::default();

        for class_name in self.class_names(manifest, lock) {
            let requested = manifest.fingerprints(&class_name);
            let plan = LockPlan::for_class(&class_name, &requested, lock.get(&class_name));
            if plan.is_noop() {
                debug!(class = %class_name, "Nothing to do");
                summary.skipped += plan.steps.len();
                continue;
            }

            match self.integrate_class(&loader, &modifier, manifest, &plan) {
                Ok(None) => {
                    summary.missing += 1;
                    self.notifier
                        .warning(&format!("Class {class_name} not found, skipped"));
                }
                Ok(Some(outcome)) => {
                    summary.applied += outcome.applied;
                    summary.skipped += outcome.skipped;
                    summary.reverted += outcome.reverted;
                    if outcome.written {
                        summary.written += 1;
                    }
                    if !self.config.dry_run {
                        if outcome.entry.is_empty() {
                            lock.remove(&class_name);
                        } else {
                            lock.insert(class_name.clone(), outcome.entry);
                        }
                    }
                    info!(
                        class = %class_name,
                        applied = outcome.applied,
                        reverted = outcome.reverted,
                        "Class integrated"
                    );
                }
                Err(error) => {
                    summary.failed += 1;
                    self.notifier.error(&format!("{class_name}: {error}"));
                }
            }
        }
        summary
    }

    /// Manifest classes in file order, then classes only the ledger knows.
    fn class_names(&self, manifest: &Manifest, lock: &LockData) -> Vec<String> {
        let mut names: Vec<String> = manifest.classes().map(|(name, _)| name.to_string()).collect();
        for name in lock.keys() {
            if manifest.class(name).is_none() {
                names.push(name.clone());
            }
        }
        names.retain(|name| self.selected(name));
        names
    }

    fn selected(&self, class_name: &str) -> bool {
        if self.class_filter.is_empty() {
            return true;
        }
        let lowered = class_name.to_ascii_lowercase();
        self.class_filter.iter().any(|filter| lowered.contains(filter.as_str()))
    }

    fn integrate_class(
        &self,
        loader: &SourceTreeLoader<'_>,
        modifier: &ClassModifier<'_>,
        manifest: &Manifest,
        plan: &LockPlan,
    ) -> Result<Option<ClassOutcome>> {
        let Some(mut class) = loader.load_class(&plan.class_name)? else {
            return Ok(None);
        };
        let actions = manifest.class(&plan.class_name);
        let mut outcome = ClassOutcome {
            entry: plan.entry.clone(),
            ..ClassOutcome::default()
        };

        for (method, step) in &plan.steps {
            let action = actions.and_then(|actions| actions.get(method));
            class = match (step, action) {
                (PlanStep::Skip, _) => {
                    outcome.skipped += 1;
                    class
                }
                (PlanStep::Revert { recorded }, _) => {
                    outcome.reverted += 1;
                    self.revert(modifier, class, method, recorded)
                }
                (PlanStep::Reapply { recorded }, Some(ManifestAction::Override))
                    if !is_preexisting(recorded) =>
                {
                    // Regenerate from the current parent.
                    outcome.applied += 1;
                    let class = modifier.remove_class_method(class, method);
                    self.apply(modifier, class, method, &ManifestAction::Override)?
                }
                (PlanStep::Apply, Some(action)) => {
                    outcome.applied += 1;
                    if finder::find_method_node(&class, method).is_some() {
                        if let Some(fingerprint) = outcome.entry.get_mut(method) {
                            let marked = mark_preexisting(fingerprint);
                            *fingerprint = marked;
                        }
                    }
                    self.apply(modifier, class, method, action)?
                }
                (PlanStep::Reapply { .. }, Some(action)) => {
                    outcome.applied += 1;
                    self.apply(modifier, class, method, action)?
                }
                (PlanStep::Apply | PlanStep::Reapply { .. }, None) => class,
            };
        }

        let printed = class.print(self.printer);
        if class.tree.source.as_deref() != Some(printed.as_str()) {
            if self.config.dry_run {
                self.notifier
                    .write(&format!("Would update {} (dry run)", plan.class_name));
            } else {
                let path = loader.store_class(&class, self.printer)?;
                self.notifier
                    .write(&format!("Updated {} ({})", plan.class_name, path.display()));
                outcome.written = true;
            }
        }
        Ok(Some(outcome))
    }

    fn apply(
        &self,
        modifier: &ClassModifier<'_>,
        mut class: ClassDescriptor,
        method: &str,
        action: &ManifestAction,
    ) -> Result<ClassDescriptor> {
        let request = action.to_request(self.parser, method)?;
        if matches!(action, ManifestAction::ReplaceBody { .. })
            && finder::find_method_node(&class, method).is_none()
        {
            class = modifier.override_method_from_parent(class, method);
        }
        debug!(class = %class.class_name, method, action = action.name(), "Applying");
        self.notifier
            .write(&format!("{}::{method}: {}", class.class_name, action.name()));
        modifier.apply(class, &request)
    }

    fn revert(
        &self,
        modifier: &ClassModifier<'_>,
        class: ClassDescriptor,
        method: &str,
        recorded: &str,
    ) -> ClassDescriptor {
        let action = fingerprint_action(recorded);
        if action == "remove" {
            // A removed method cannot be restored.
            self.notifier
                .write(&format!("{}::{method}: revert {action}", class.class_name));
            return class;
        }
        if is_preexisting(recorded) {
            self.notifier.warning(&format!(
                "{}::{method}: {action} no longer requested, method predates the integrator and is left in place",
                class.class_name
            ));
            return class;
        }
        self.notifier
            .write(&format!("{}::{method}: revert {action}", class.class_name));
        modifier.remove_class_method(class, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            applied: 2,
            skipped: 1,
            written: 1,
            ..RunSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "2 applied, 1 skipped, 0 reverted, 1 classes written, 0 missing, 0 failed"
        );
        assert!(summary.is_success());
        assert!(!RunSummary { failed: 1, ..summary }.is_success());
    }

    #[test]
    fn test_class_order_and_filter() {
        let mut manifest = Manifest::new();
        manifest.insert("App\\Shop\\Provider", "a", ManifestAction::Override);
        manifest.insert("App\\Cart\\Provider", "a", ManifestAction::Override);
        let mut lock = LockData::new();
        lock.insert("App\\Old\\Provider".into(), Default::default());
        lock.insert("App\\Shop\\Provider".into(), Default::default());

        let parser = crate::parser::PhpParser;
        let printer = crate::ast::PhpPrinter;
        let integrator = Integrator::new(IntegratorConfig::default(), &parser, &printer, &LogNotifier);
        assert_eq!(
            integrator.class_names(&manifest, &lock),
            vec!["App\\Shop\\Provider", "App\\Cart\\Provider", "App\\Old\\Provider"]
        );

        let integrator = integrator.with_class_filter(vec!["SHOP".into(), "old".into()]);
        assert_eq!(
            integrator.class_names(&manifest, &lock),
            vec!["App\\Shop\\Provider", "App\\Old\\Provider"]
        );
    }
}
