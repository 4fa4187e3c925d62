// src/pipeline/registry.rs

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, error, info, instrument, warn};

use crate::config::ComponentToggle;
use crate::data_model::{ComponentKind, ExcludedComponent, ExclusionStage};
use crate::error::Result;
use crate::executor::{DecisionPolicy, TuFilter};
use crate::pipeline::filters::{
    EmptyPhraseFilter, IdenticalPhraseFilter, LengthRatioFilter, UnalignedSequencesFilter,
};
use crate::pipeline::policies::{MajorityVotePolicy, OneNoPolicy, PassThroughPolicy};
use crate::utils::prometheus_metrics::COMPONENTS_EXCLUDED_TOTAL;

/// Constructor for one component implementation.
pub type Factory<T> = Box<dyn Fn() -> Result<Box<T>> + Send + Sync>;
pub type FilterFactory = Factory<dyn TuFilter>;
pub type PolicyFactory = Factory<dyn DecisionPolicy>;

/// Learning-pass requirement of a loaded filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanRequirement {
    /// Loaded but `initialize` has not run yet.
    Uninitialized,
    Scans(usize),
    /// Initialization or finalization failed; never active again.
    Excluded,
}

pub struct FilterEntry {
    pub name: String,
    pub filter: Box<dyn TuFilter>,
    pub requirement: ScanRequirement,
}

impl FilterEntry {
    pub fn new(name: impl Into<String>, filter: Box<dyn TuFilter>) -> Self {
        FilterEntry {
            name: name.into(),
            filter,
            requirement: ScanRequirement::Uninitialized,
        }
    }

    /// Runs the filter's `initialize` and records its scan requirement, or
    /// marks the entry excluded when initialization fails.
    pub fn initialize(&mut self, source_language: &str, target_language: &str) -> Result<usize> {
        match self.filter.initialize(source_language, target_language) {
            Ok(()) => {
                let scans = self.filter.number_of_scans();
                self.requirement = ScanRequirement::Scans(scans);
                Ok(scans)
            }
            Err(e) => {
                self.requirement = ScanRequirement::Excluded;
                Err(e)
            }
        }
    }

    pub fn exclude(&mut self) {
        self.requirement = ScanRequirement::Excluded;
    }

    pub fn is_excluded(&self) -> bool {
        self.requirement == ScanRequirement::Excluded
    }

    /// Declared learning passes, once initialized.
    pub fn scans(&self) -> Option<usize> {
        match self.requirement {
            ScanRequirement::Scans(scans) => Some(scans),
            _ => None,
        }
    }
}

pub struct PolicyEntry {
    pub name: String,
    pub policy: Box<dyn DecisionPolicy>,
}

/// Result of loading one component kind: the instances that are ready, in
/// config order, and the entries that were skipped.
pub struct LoadReport<E> {
    pub loaded: Vec<E>,
    pub failures: Vec<ExcludedComponent>,
}

/// Name → constructor table for filters and policies.
#[derive(Default)]
pub struct ComponentRegistry {
    filters: HashMap<String, FilterFactory>,
    policies: HashMap<String, PolicyFactory>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every filter and policy shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_filter(UnalignedSequencesFilter::NAME, || {
            Ok(Box::new(UnalignedSequencesFilter::new()))
        });
        registry.register_filter(EmptyPhraseFilter::NAME, || Ok(Box::new(EmptyPhraseFilter)));
        registry.register_filter(LengthRatioFilter::NAME, || {
            Ok(Box::new(LengthRatioFilter::new()))
        });
        registry.register_filter(IdenticalPhraseFilter::NAME, || {
            Ok(Box::new(IdenticalPhraseFilter))
        });

        registry.register_policy(OneNoPolicy::NAME, || Ok(Box::new(OneNoPolicy)));
        registry.register_policy(MajorityVotePolicy::NAME, || Ok(Box::new(MajorityVotePolicy)));
        registry.register_policy(PassThroughPolicy::NAME, || Ok(Box::new(PassThroughPolicy)));
        registry
    }

    /// Adds or replaces the constructor for filter `name`.
    pub fn register_filter<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn TuFilter>> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Box::new(factory));
    }

    /// Adds or replaces the constructor for policy `name`.
    pub fn register_policy<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn DecisionPolicy>> + Send + Sync + 'static,
    {
        self.policies.insert(name.into(), Box::new(factory));
    }

    pub fn filter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn policy_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[instrument(skip(self, toggles, root), fields(configured = toggles.len()))]
    pub fn load_filters(
        &self,
        toggles: &[ComponentToggle],
        root: Option<&Path>,
    ) -> LoadReport<FilterEntry> {
        info!("Loading filters...");
        let report = load_components(ComponentKind::Filter, toggles, root, &self.filters);
        LoadReport {
            loaded: report
                .loaded
                .into_iter()
                .map(|(name, filter)| FilterEntry::new(name, filter))
                .collect(),
            failures: report.failures,
        }
    }

    #[instrument(skip(self, toggles, root), fields(configured = toggles.len()))]
    pub fn load_policies(
        &self,
        toggles: &[ComponentToggle],
        root: Option<&Path>,
    ) -> LoadReport<PolicyEntry> {
        info!("Loading policies...");
        let report = load_components(ComponentKind::Policy, toggles, root, &self.policies);
        LoadReport {
            loaded: report
                .loaded
                .into_iter()
                .map(|(name, policy)| PolicyEntry { name, policy })
                .collect(),
            failures: report.failures,
        }
    }
}

fn load_components<T: ?Sized>(
    kind: ComponentKind,
    toggles: &[ComponentToggle],
    root: Option<&Path>,
    factories: &HashMap<String, Factory<T>>,
) -> LoadReport<(String, Box<T>)> {
    let mut loaded = Vec::new();
    let mut failures = Vec::new();
    let mut seen = HashSet::new();

    let mut skip = |name: &str, reason: String| {
        COMPONENTS_EXCLUDED_TOTAL.inc();
        failures.push(ExcludedComponent {
            kind,
            name: name.to_string(),
            stage: ExclusionStage::Load,
            reason,
        });
    };

    for toggle in toggles {
        let name = toggle.name.as_str();
        if !toggle.enabled {
            debug!(%kind, name, "Component disabled in config");
            continue;
        }
        if !seen.insert(name) {
            warn!(%kind, name, "Component listed more than once; keeping the first entry");
            continue;
        }

        if let Some(root) = root {
            let component_dir = root.join(name);
            if !component_dir.is_dir() {
                warn!(%kind, name, expected = %component_dir.display(), "No folder for component");
                skip(name, format!("missing folder {}", component_dir.display()));
                continue;
            }
        }

        let Some(factory) = factories.get(name) else {
            warn!(%kind, name, "No implementation registered for component");
            skip(name, "no implementation registered".to_string());
            continue;
        };

        match factory() {
            Ok(instance) => {
                info!(%kind, name, "Component is ready and active");
                loaded.push((name.to_string(), instance));
            }
            Err(e) => {
                error!(%kind, name, error = %e, "Couldn't create component instance");
                skip(name, e.to_string());
            }
        }
    }

    info!(
        %kind,
        loaded = loaded.len(),
        skipped = failures.len(),
        "Finished loading components"
    );
    LoadReport { loaded, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::pipeline::filters::EmptyPhraseFilter;
    use tempfile::tempdir;

    fn toggles(entries: &[(&str, bool)]) -> Vec<ComponentToggle> {
        entries
            .iter()
            .map(|(name, on)| ComponentToggle::new(*name, *on))
            .collect()
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = ComponentRegistry::with_builtins();
        assert_eq!(
            registry.filter_names(),
            vec![
                "EmptyPhraseFilter",
                "IdenticalPhraseFilter",
                "LengthRatioFilter",
                "NumberOfUnalignedSequences"
            ]
        );
        assert_eq!(
            registry.policy_names(),
            vec!["MajorityVotePolicy", "OneNoPolicy", "PassThroughPolicy"]
        );
    }

    #[test]
    fn test_load_keeps_config_order_and_skips_disabled() {
        let registry = ComponentRegistry::with_builtins();
        let report = registry.load_filters(
            &toggles(&[
                ("LengthRatioFilter", true),
                ("IdenticalPhraseFilter", false),
                ("EmptyPhraseFilter", true),
            ]),
            None,
        );
        let names: Vec<&str> = report.loaded.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["LengthRatioFilter", "EmptyPhraseFilter"]);
        // builtins register under their own implementation name
        assert!(report.loaded.iter().all(|e| e.filter.name() == e.name));
        assert!(report.failures.is_empty());
        assert!(report
            .loaded
            .iter()
            .all(|e| e.requirement == ScanRequirement::Uninitialized));
    }

    #[test]
    fn test_unknown_name_is_skipped_not_fatal() {
        let registry = ComponentRegistry::with_builtins();
        let report = registry.load_policies(
            &toggles(&[("NoSuchPolicy", true), ("OneNoPolicy", true)]),
            None,
        );
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.loaded[0].name, "OneNoPolicy");
        assert_eq!(report.loaded[0].policy.name(), "OneNoPolicy");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "NoSuchPolicy");
        assert_eq!(report.failures[0].stage, ExclusionStage::Load);
    }

    #[test]
    fn test_duplicate_names_load_once() {
        let registry = ComponentRegistry::with_builtins();
        let report = registry.load_filters(
            &toggles(&[("EmptyPhraseFilter", true), ("EmptyPhraseFilter", true)]),
            None,
        );
        assert_eq!(report.loaded.len(), 1);
    }

    #[test]
    fn test_constructor_failure_is_skipped() {
        let mut registry = ComponentRegistry::new();
        registry.register_filter("Broken", || {
            Err(PipelineError::component("Broken", "model file unreadable"))
        });
        registry.register_filter("Fine", || Ok(Box::new(EmptyPhraseFilter)));
        let report = registry.load_filters(&toggles(&[("Broken", true), ("Fine", true)]), None);
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.loaded[0].name, "Fine");
        assert!(report.failures[0].reason.contains("model file unreadable"));
    }

    #[test]
    fn test_root_requires_component_folder() {
        let root = tempdir().unwrap();
        std::fs::create_dir(root.path().join("EmptyPhraseFilter")).unwrap();
        let registry = ComponentRegistry::with_builtins();
        let report = registry.load_filters(
            &toggles(&[("EmptyPhraseFilter", true), ("LengthRatioFilter", true)]),
            Some(root.path()),
        );
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.loaded[0].name, "EmptyPhraseFilter");
        assert!(report.failures[0].reason.contains("missing folder"));
    }

    #[test]
    fn test_entry_initialize_records_requirement() {
        let mut entry = FilterEntry::new("LengthRatioFilter", Box::new(LengthRatioFilter::new()));
        assert_eq!(entry.scans(), None);
        assert_eq!(entry.initialize("en", "fr").unwrap(), 1);
        assert_eq!(entry.requirement, ScanRequirement::Scans(1));
        entry.exclude();
        assert!(entry.is_excluded());
        assert_eq!(entry.scans(), None);
    }
}
