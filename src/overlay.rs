//! Prerequisite overlay for the selected subject.
//!
//! Geometry is never read at selection time: the host asks for a frame, gets
//! a [`FrameTicket`], and redeems it with [`OverlayCoordinator::run_frame`]
//! once layout has settled. Only the most recently issued ticket is live, so
//! scheduling new work cancels the previous request.

use serde::Serialize;
use tracing::{debug, trace};

use crate::geometry::{CurveStyle, Rect, RectProvider, RoutingClass, resolve_edge_points};
use crate::plan::{CorrelativeKind, Plan, Subject, SubjectId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EdgeId {
    pub selected: SubjectId,
    pub correlative: SubjectId,
}

/// A drawn arrow from a requirement to the selected subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: EdgeId,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub routing: RoutingClass,
    pub kind: CorrelativeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverlayPhase {
    Idle,
    Computing,
    Displayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FrameTicket(u64);

impl FrameTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameWork {
    /// Build edges from scratch and start a new animation epoch.
    Full,
    /// Move existing edges; the epoch is unchanged.
    Reposition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFrame {
    pub ticket: FrameTicket,
    pub work: FrameWork,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayConfig {
    pub same_column_threshold: f32,
    pub curve: CurveStyle,
    pub draw_duration_secs: f32,
    pub stagger_secs: f32,
    pub stroke_width: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            same_column_threshold: crate::geometry::SAME_COLUMN_THRESHOLD,
            curve: CurveStyle::default(),
            draw_duration_secs: 0.5,
            stagger_secs: 0.07,
            stroke_width: 1.8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverlayCoordinator {
    config: OverlayConfig,
    phase: OverlayPhase,
    selected: Option<SubjectId>,
    edges: Vec<Edge>,
    epoch: u64,
    pending: Option<PendingFrame>,
    next_ticket: u64,
}

impl OverlayCoordinator {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            phase: OverlayPhase::Idle,
            selected: None,
            edges: Vec::new(),
            epoch: 0,
            pending: None,
            next_ticket: 0,
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Advances every time a new set of edges is drawn. Hosts replay the
    /// draw-on animation only when this changes.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn pending(&self) -> Option<PendingFrame> {
        self.pending
    }

    /// Starts a selection session for `subject_id`, or ends the current one.
    pub fn select(&mut self, plan: &Plan, subject_id: Option<&str>) -> Option<FrameTicket> {
        self.cancel_pending();
        self.edges.clear();

        let Some(subject) = subject_id.and_then(|id| plan.find_subject(id)) else {
            self.selected = None;
            self.phase = OverlayPhase::Idle;
            return None;
        };
        self.selected = Some(subject.id.clone());
        if subject.correlatives.is_empty() {
            self.phase = OverlayPhase::Idle;
            return None;
        }

        self.phase = OverlayPhase::Computing;
        Some(self.schedule(FrameWork::Full))
    }

    /// Resize or scroll. Only repositions edges that are already shown.
    pub fn viewport_changed(&mut self) -> Option<FrameTicket> {
        match self.phase {
            OverlayPhase::Idle => None,
            // The pending full build reads geometry when it runs anyway.
            OverlayPhase::Computing => self.pending.map(|pending| pending.ticket),
            OverlayPhase::Displayed => {
                self.cancel_pending();
                Some(self.schedule(FrameWork::Reposition))
            }
        }
    }

    /// Runs the work scheduled under `ticket`. Returns `false` for a ticket
    /// that was superseded or cancelled.
    pub fn run_frame(&mut self, ticket: FrameTicket, plan: &Plan, rects: &dyn RectProvider) -> bool {
        let Some(pending) = self.pending.filter(|pending| pending.ticket == ticket) else {
            trace!(ticket = ticket.0, "ignoring stale frame");
            return false;
        };
        self.pending = None;

        match pending.work {
            FrameWork::Full => self.build_edges(plan, rects),
            FrameWork::Reposition => self.reposition_edges(plan, rects),
        }
        true
    }

    fn schedule(&mut self, work: FrameWork) -> FrameTicket {
        self.next_ticket += 1;
        let ticket = FrameTicket(self.next_ticket);
        self.pending = Some(PendingFrame { ticket, work });
        trace!(ticket = ticket.0, ?work, "scheduled frame");
        ticket
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            trace!(ticket = pending.ticket.0, "cancelled frame");
        }
    }

    fn build_edges(&mut self, plan: &Plan, rects: &dyn RectProvider) {
        let selected = self.selected.clone();
        let subject = selected.as_deref().and_then(|id| plan.find_subject(id));
        let target = selected.as_deref().and_then(|id| rects.bounds_of(id));
        let (Some(subject), Some(target)) = (subject, target) else {
            self.edges.clear();
            self.phase = OverlayPhase::Idle;
            return;
        };

        self.edges = self.edges_for(subject, &target, rects);
        self.epoch += 1;
        self.phase = OverlayPhase::Displayed;
        debug!(
            subject = %subject.id,
            edges = self.edges.len(),
            epoch = self.epoch,
            "overlay edges computed"
        );
    }

    /// Same edge identities as the last full build; requirements whose card
    /// is unmounted are left out of this frame only.
    fn reposition_edges(&mut self, plan: &Plan, rects: &dyn RectProvider) {
        let selected = self.selected.as_deref();
        let subject = selected.and_then(|id| plan.find_subject(id));
        let target = selected.and_then(|id| rects.bounds_of(id));
        let (Some(subject), Some(target)) = (subject, target) else {
            return;
        };
        self.edges = self.edges_for(subject, &target, rects);
        trace!(edges = self.edges.len(), "overlay edges repositioned");
    }

    fn edges_for(&self, subject: &Subject, target: &Rect, rects: &dyn RectProvider) -> Vec<Edge> {
        let threshold = self.config.same_column_threshold;
        subject
            .correlatives
            .iter()
            .filter_map(|correlative| {
                let source = rects.bounds_of(&correlative.subject_id)?;
                let geo = resolve_edge_points(&source, target, threshold);
                Some(Edge {
                    id: EdgeId {
                        selected: subject.id.clone(),
                        correlative: correlative.subject_id.clone(),
                    },
                    x1: geo.x1,
                    y1: geo.y1,
                    x2: geo.x2,
                    y2: geo.y2,
                    routing: geo.routing,
                    kind: correlative.kind,
                })
            })
            .collect()
    }
}

impl Default for OverlayCoordinator {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}
