//! Data-integrity checks on a parsed deck.
//!
//! Findings are collected into a [`ValidationReport`] rather than returned as
//! errors, so one pass reports every problem in the deck.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::error::Location;
use crate::model::{Boundary, Deck, DloadKind, Element, ElementType, KeptOption, Load, Target};

/// Number of example ids quoted in aggregated messages
const SAMPLE_IDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NoNodes,
    NoSteps,
    ConnectivityCount,
    RepeatedNode,
    DanglingNode,
    DanglingElement,
    UnknownSet,
    UnknownMaterial,
    EmptySet,
    MissingSection,
    MissingElastic,
    MissingDensity,
    InvalidDofRange,
    MissingProcedure,
    UnknownElementType,
    UnsupportedKeyword,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<Location>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Whether any issue of the given kind was found
    pub fn has(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    fn error(&mut self, kind: IssueKind, message: String, at: Option<&Location>) {
        self.push(Severity::Error, kind, message, at);
    }

    fn warning(&mut self, kind: IssueKind, message: String, at: Option<&Location>) {
        self.push(Severity::Warning, kind, message, at);
    }

    fn push(&mut self, severity: Severity, kind: IssueKind, message: String, at: Option<&Location>) {
        self.issues.push(Issue {
            severity,
            kind,
            message,
            at: at.cloned(),
        });
    }

    fn finish(mut self) -> Self {
        self.error_count = self.errors().count();
        self.warning_count = self.warnings().count();
        self.valid = self.error_count == 0;
        self
    }
}

/// Run every integrity check against the deck
pub fn validate(deck: &Deck) -> ValidationReport {
    let mut report = ValidationReport::default();

    if deck.nodes.is_empty() {
        report.error(IssueKind::NoNodes, "deck declares no nodes".to_string(), None);
    }
    check_elements(deck, &mut report);
    check_sets(deck, &mut report);
    check_sections(deck, &mut report);
    for boundary in &deck.boundaries {
        check_boundary(deck, boundary, &mut report);
    }
    check_steps(deck, &mut report);
    check_options(deck, &mut report);

    let unsupported = deck
        .unsupported
        .iter()
        .chain(deck.materials.iter().flat_map(|m| m.unsupported.iter()))
        .chain(deck.steps.iter().flat_map(|s| s.unsupported.iter()));
    for block in unsupported {
        report.warning(
            IssueKind::UnsupportedKeyword,
            format!("*{} is kept verbatim and not checked", block.keyword),
            Some(&block.at),
        );
    }

    let report = report.finish();
    tracing::debug!(
        "Validation finished: {} errors, {} warnings",
        report.error_count,
        report.warning_count
    );
    report
}

fn sample(ids: &[usize]) -> String {
    let shown: Vec<String> = ids.iter().take(SAMPLE_IDS).map(|id| id.to_string()).collect();
    if ids.len() > SAMPLE_IDS {
        format!("{}, ...", shown.join(", "))
    } else {
        shown.join(", ")
    }
}

fn check_elements(deck: &Deck, report: &mut ValidationReport) {
    let mut unknown_types: BTreeSet<String> = BTreeSet::new();
    for element in &deck.elements {
        match element.kind.node_count() {
            Some(expected) if expected != element.nodes.len() => report.error(
                IssueKind::ConnectivityCount,
                format!(
                    "element {} of type {} lists {} nodes, expected {}",
                    element.id,
                    element.kind,
                    element.nodes.len(),
                    expected
                ),
                None,
            ),
            Some(_) => {}
            None => {
                if let ElementType::Other(tag) = &element.kind {
                    unknown_types.insert(tag.clone());
                }
            }
        }
        check_connectivity(deck, element, report);
    }
    for tag in unknown_types {
        report.warning(
            IssueKind::UnknownElementType,
            format!("element type {} is unknown; connectivity length not checked", tag),
            None,
        );
    }

    let covered: HashSet<usize> = deck
        .sections
        .iter()
        .filter_map(|s| deck.element_set(s.elset()))
        .flat_map(|set| set.ids.iter().copied())
        .collect();
    let uncovered: Vec<usize> = deck
        .elements
        .iter()
        .map(|e| e.id)
        .filter(|id| !covered.contains(id))
        .collect();
    if !uncovered.is_empty() {
        report.warning(
            IssueKind::MissingSection,
            format!(
                "{} element(s) have no section assigned ({})",
                uncovered.len(),
                sample(&uncovered)
            ),
            None,
        );
    }
}

fn check_connectivity(deck: &Deck, element: &Element, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    let mut missing = Vec::new();
    for &node in &element.nodes {
        if !seen.insert(node) && !repeated.contains(&node) {
            repeated.push(node);
        }
        if !deck.has_node(node) && !missing.contains(&node) {
            missing.push(node);
        }
    }
    if !repeated.is_empty() {
        report.error(
            IssueKind::RepeatedNode,
            format!("element {} repeats node(s) {}", element.id, sample(&repeated)),
            None,
        );
    }
    if !missing.is_empty() {
        report.error(
            IssueKind::DanglingNode,
            format!(
                "element {} references undeclared node(s) {}",
                element.id,
                sample(&missing)
            ),
            None,
        );
    }
}

fn check_sets(deck: &Deck, report: &mut ValidationReport) {
    for set in &deck.node_sets {
        let missing: Vec<usize> = set.ids.iter().copied().filter(|&id| !deck.has_node(id)).collect();
        if !missing.is_empty() {
            report.error(
                IssueKind::DanglingNode,
                format!("node set {} references undeclared node(s) {}", set.name, sample(&missing)),
                None,
            );
        }
        if set.is_empty() {
            report.warning(IssueKind::EmptySet, format!("node set {} is empty", set.name), None);
        }
    }
    for set in &deck.element_sets {
        let missing: Vec<usize> = set
            .ids
            .iter()
            .copied()
            .filter(|&id| !deck.has_element(id))
            .collect();
        if !missing.is_empty() {
            report.error(
                IssueKind::DanglingElement,
                format!(
                    "element set {} references undeclared element(s) {}",
                    set.name,
                    sample(&missing)
                ),
                None,
            );
        }
        if set.is_empty() {
            report.warning(IssueKind::EmptySet, format!("element set {} is empty", set.name), None);
        }
    }
}

fn check_sections(deck: &Deck, report: &mut ValidationReport) {
    for section in &deck.sections {
        if deck.element_set(section.elset()).is_none() {
            report.error(
                IssueKind::UnknownSet,
                format!("*{} refers to undefined element set {}", section.keyword(), section.elset()),
                None,
            );
        }
        match deck.material(section.material()) {
            None => report.error(
                IssueKind::UnknownMaterial,
                format!("*{} refers to undefined material {}", section.keyword(), section.material()),
                None,
            ),
            Some(material) if material.elastic.is_empty() => report.warning(
                IssueKind::MissingElastic,
                format!("material {} has no *ELASTIC constants", material.name),
                None,
            ),
            Some(_) => {}
        }
    }
}

/// Check that a target resolves; `nodes` selects node or element addressing
fn check_target(deck: &Deck, target: &Target, nodes: bool, what: &str, at: &Location, report: &mut ValidationReport) {
    match target {
        Target::Id(id) if nodes && !deck.has_node(*id) => report.error(
            IssueKind::DanglingNode,
            format!("{} references undeclared node {}", what, id),
            Some(at),
        ),
        Target::Id(id) if !nodes && !deck.has_element(*id) => report.error(
            IssueKind::DanglingElement,
            format!("{} references undeclared element {}", what, id),
            Some(at),
        ),
        Target::Set(name) => {
            let found = if nodes {
                deck.node_set(name).is_some()
            } else {
                deck.element_set(name).is_some()
            };
            if !found {
                let kind = if nodes { "node" } else { "element" };
                report.error(
                    IssueKind::UnknownSet,
                    format!("{} refers to undefined {} set {}", what, kind, name),
                    Some(at),
                );
            }
        }
        Target::Id(_) => {}
    }
}

fn valid_dof(dof: u32) -> bool {
    (1..=6).contains(&dof) || dof == 11
}

fn check_boundary(deck: &Deck, boundary: &Boundary, report: &mut ValidationReport) {
    check_target(deck, &boundary.target, true, "*BOUNDARY", &boundary.at, report);
    let (first, last) = (boundary.first_dof, boundary.last_dof);
    if !valid_dof(first) || !valid_dof(last) || first > last {
        report.error(
            IssueKind::InvalidDofRange,
            format!("*BOUNDARY on {} has invalid DOF range {}..{}", boundary.target, first, last),
            Some(&boundary.at),
        );
    }
}

fn check_steps(deck: &Deck, report: &mut ValidationReport) {
    if deck.steps.is_empty() {
        report.warning(IssueKind::NoSteps, "deck has no *STEP".to_string(), None);
    }
    for (idx, step) in deck.steps.iter().enumerate() {
        if step.procedure.is_none() {
            report.error(
                IssueKind::MissingProcedure,
                format!("step {} has no procedure keyword", idx + 1),
                Some(&step.at),
            );
        }
        for boundary in &step.boundaries {
            check_boundary(deck, boundary, report);
        }
        for load in &step.loads {
            check_load(deck, load, report);
        }
        for output in &step.outputs {
            if let Some(set) = &output.set {
                let target = Target::Set(set.clone());
                let what = format!("*{}", output.kind.keyword());
                check_target(deck, &target, output.kind.addresses_nodes(), &what, &output.at, report);
            }
        }
    }
}

/// Options carried through without interpretation, and options that were dropped
fn check_options(deck: &Deck, report: &mut ValidationReport) {
    for ignored in &deck.ignored_options {
        report.warning(
            IssueKind::UnsupportedKeyword,
            format!("option {} of *{} was ignored", ignored.option, ignored.keyword),
            Some(&ignored.at),
        );
    }
    for section in &deck.sections {
        for option in section.options() {
            report.warning(
                IssueKind::UnsupportedKeyword,
                format!(
                    "option {} of *{} on {} is passed through unchecked",
                    option,
                    section.keyword(),
                    section.elset()
                ),
                None,
            );
        }
    }

    let model = deck.boundaries.iter().flat_map(|b| b.options.iter().map(move |o| ("BOUNDARY", o, &b.at)));
    report_kept(model.collect(), report);
    for step in &deck.steps {
        let procedure = step.procedure.as_ref().map_or("STEP", |p| p.name());
        let mut kept: Vec<(&str, &KeptOption, &Location)> = Vec::new();
        kept.extend(step.options.iter().map(|o| ("STEP", o, &step.at)));
        kept.extend(step.procedure_options.iter().map(|o| (procedure, o, &step.at)));
        for boundary in &step.boundaries {
            kept.extend(boundary.options.iter().map(|o| ("BOUNDARY", o, &boundary.at)));
        }
        for load in &step.loads {
            kept.extend(load.options().iter().map(|o| (load.keyword(), o, load.at())));
        }
        for output in &step.outputs {
            kept.extend(output.options.iter().map(|o| (output.kind.keyword(), o, &output.at)));
        }
        report_kept(kept, report);
    }
}

/// One warning per keyword and option, at its first occurrence
fn report_kept(kept: Vec<(&str, &KeptOption, &Location)>, report: &mut ValidationReport) {
    let mut seen: HashSet<(&str, String)> = HashSet::new();
    for (keyword, option, at) in kept {
        if seen.insert((keyword, option.to_string())) {
            report.warning(
                IssueKind::UnsupportedKeyword,
                format!("option {} of *{} is passed through unchecked", option, keyword),
                Some(at),
            );
        }
    }
}

fn check_load(deck: &Deck, load: &Load, report: &mut ValidationReport) {
    match load {
        Load::Concentrated { target, dof, at, .. } => {
            check_target(deck, target, true, "*CLOAD", at, report);
            if !valid_dof(*dof) {
                report.error(
                    IssueKind::InvalidDofRange,
                    format!("*CLOAD on {} uses invalid DOF {}", target, dof),
                    Some(at),
                );
            }
        }
        Load::Distributed { target, kind, at, .. } => {
            check_target(deck, target, false, "*DLOAD", at, report);
            if *kind != DloadKind::Gravity {
                return;
            }
            let Some(elements) = deck.elements_of(target) else {
                return;
            };
            let mut lacking: BTreeSet<&str> = BTreeSet::new();
            for id in elements {
                if let Some(material) = deck.material_of_element(id) {
                    if material.density().is_none() {
                        lacking.insert(material.name.as_str());
                    }
                }
            }
            for name in lacking {
                report.error(
                    IssueKind::MissingDensity,
                    format!("gravity load on {} needs *DENSITY in material {}", target, name),
                    Some(at),
                );
            }
        }
    }
}
