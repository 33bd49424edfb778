use crate::app::{App, SelectionView, StatusMenu};
use crate::geometry::RoutingClass;
use crate::overlay::{Edge, OverlayPhase};
use crate::plan::{CorrelativeKind, Status, SubjectId};
use crate::repository::PlanRepository;
use crate::status::CorrelativeCycle;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// What a presentation layer reads from the application state, in one
/// serializable value.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationSnapshot {
    pub statuses: BTreeMap<SubjectId, Status>,
    pub counts: BTreeMap<Status, usize>,
    pub cycles: Vec<CorrelativeCycle>,
    pub selection: SelectionView,
    pub status_menu: Option<StatusMenu>,
    pub phase: OverlayPhase,
    pub epoch: u64,
    pub edges: Vec<EdgeSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSnapshot {
    pub from: SubjectId,
    pub to: SubjectId,
    #[serde(rename = "type")]
    pub kind: CorrelativeKind,
    pub routing: RoutingClass,
    pub points: [[f32; 2]; 2],
}

impl EdgeSnapshot {
    fn from_edge(edge: &Edge) -> Self {
        Self {
            from: edge.id.correlative.clone(),
            to: edge.id.selected.clone(),
            kind: edge.kind,
            routing: edge.routing,
            points: [[edge.x1, edge.y1], [edge.x2, edge.y2]],
        }
    }
}

impl PresentationSnapshot {
    pub fn from_app<R: PlanRepository>(app: &App<R>) -> Self {
        let report = app.status_report();
        Self {
            statuses: report.statuses.clone(),
            counts: app.status_counts(),
            cycles: report.cycles.clone(),
            selection: app.selection_view(),
            status_menu: app.status_menu(),
            phase: app.overlay().phase(),
            epoch: app.animation_epoch(),
            edges: app.edges().iter().map(EdgeSnapshot::from_edge).collect(),
        }
    }
}

pub fn write_snapshot<R: PlanRepository>(path: &Path, app: &App<R>) -> anyhow::Result<()> {
    let snapshot = PresentationSnapshot::from_app(app);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &snapshot)?;
    Ok(())
}
