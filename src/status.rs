//! Effective status derivation.
//!
//! A subject is `Bloqueada` while any of its correlatives is unmet; otherwise
//! it shows its manual status, or `Disponible` when none is set. Whole-plan
//! evaluation walks the correlative graph dependencies-first, so a subject is
//! only evaluated once every subject it requires has its final status,
//! regardless of which year either one lives in.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::{debug, warn};

use crate::plan::{Correlative, ManualStatusMap, Plan, Status, Subject, SubjectId};

pub type EffectiveStatusMap = BTreeMap<SubjectId, Status>;

/// Subjects that require each other, directly or transitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrelativeCycle {
    /// Members in plan order.
    pub members: Vec<SubjectId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub statuses: EffectiveStatusMap,
    pub cycles: Vec<CorrelativeCycle>,
}

impl StatusReport {
    pub fn status_of(&self, subject_id: &str) -> Status {
        self.statuses
            .get(subject_id)
            .copied()
            .unwrap_or(Status::Disponible)
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn in_cycle(&self, subject_id: &str) -> bool {
        self.cycles
            .iter()
            .any(|cycle| cycle.members.iter().any(|id| id == subject_id))
    }
}

/// Status of one subject given a lookup for its dependencies' statuses.
///
/// Unresolved dependencies count as `Disponible`. The first unmet correlative
/// blocks the subject.
pub fn compute_effective_status<F>(
    subject: &Subject,
    resolved_status_of: F,
    manual: &ManualStatusMap,
) -> Status
where
    F: Fn(&str) -> Option<Status>,
{
    for correlative in &subject.correlatives {
        let dep_status = resolved_status_of(&correlative.subject_id).unwrap_or(Status::Disponible);
        if !correlative.kind.is_satisfied_by(dep_status) {
            return Status::Bloqueada;
        }
    }
    manual
        .get(&subject.id)
        .map(Status::from)
        .unwrap_or(Status::Disponible)
}

/// Evaluates every subject in the plan.
///
/// Members of a correlative cycle can never be unblocked by ordinary
/// progression, so they are `Bloqueada` and reported in `cycles`.
pub fn evaluate(plan: &Plan) -> StatusReport {
    let mut graph: DiGraph<&Subject, ()> = DiGraph::new();
    let mut node_map: HashMap<&str, NodeIndex> = HashMap::new();
    for subject in plan.subjects() {
        let idx = graph.add_node(subject);
        node_map.insert(subject.id.as_str(), idx);
    }

    // subject -> required subject
    for subject in plan.subjects() {
        let Some(&from) = node_map.get(subject.id.as_str()) else {
            continue;
        };
        for correlative in &subject.correlatives {
            if let Some(&to) = node_map.get(correlative.subject_id.as_str()) {
                graph.update_edge(from, to, ());
            }
        }
    }

    let mut report = StatusReport::default();

    // Tarjan emits components in reverse topological order: requirements first.
    for mut component in tarjan_scc(&graph) {
        let cyclic = component.len() > 1 || graph.contains_edge(component[0], component[0]);
        if cyclic {
            component.sort();
            let members: Vec<SubjectId> = component
                .iter()
                .map(|idx| graph[*idx].id.clone())
                .collect();
            warn!(members = ?members, "correlative cycle detected");
            for id in &members {
                report.statuses.insert(id.clone(), Status::Bloqueada);
            }
            report.cycles.push(CorrelativeCycle { members });
            continue;
        }

        let subject = graph[component[0]];
        let status = compute_effective_status(
            subject,
            |id| report.statuses.get(id).copied(),
            &plan.status_map,
        );
        report.statuses.insert(subject.id.clone(), status);
    }

    // Components come out in graph order; report cycles in plan order.
    report.cycles.sort_by_key(|cycle| {
        cycle
            .members
            .first()
            .and_then(|id| node_map.get(id.as_str()))
            .map(|idx| idx.index())
    });

    debug!(
        subjects = report.statuses.len(),
        cycles = report.cycles.len(),
        "evaluated effective statuses"
    );
    report
}

pub fn effective_statuses(plan: &Plan) -> EffectiveStatusMap {
    evaluate(plan).statuses
}

/// Count of subjects per effective status. Every status is present.
pub fn status_counts(statuses: &EffectiveStatusMap) -> BTreeMap<Status, usize> {
    let mut counts: BTreeMap<Status, usize> = Status::ALL.iter().map(|status| (*status, 0)).collect();
    for status in statuses.values() {
        *counts.entry(*status).or_insert(0) += 1;
    }
    counts
}

/// Correlatives of `subject` that are not satisfied under `statuses`.
pub fn unmet_correlatives<'a>(
    subject: &'a Subject,
    statuses: &EffectiveStatusMap,
) -> Vec<&'a Correlative> {
    subject
        .correlatives
        .iter()
        .filter(|correlative| {
            let dep = statuses
                .get(&correlative.subject_id)
                .copied()
                .unwrap_or(Status::Disponible);
            !correlative.kind.is_satisfied_by(dep)
        })
        .collect()
}
