//! Application state: the single owner of the plan, the selection, the status
//! menu, the toast and the overlay coordinator.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ImportError, StorageResult, ValidationError};
use crate::geometry::RectProvider;
use crate::overlay::{Edge, FrameTicket, OverlayConfig, OverlayCoordinator};
use crate::plan::{Correlative, CorrelativeKind, Plan, Status, Subject, SubjectId, YearId};
use crate::repository::{ExportedFile, PlanRepository};
use crate::status::{self, EffectiveStatusMap, StatusReport};

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Ok,
    Error,
}

/// Short-lived notification shown after a user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    #[serde(skip)]
    pub remaining: Duration,
}

impl Toast {
    /// Returns whether the toast is still visible after `elapsed`.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        self.remaining = self.remaining.saturating_sub(elapsed);
        !self.remaining.is_zero()
    }
}

/// Options offered for one subject. A blocked subject gets no status options,
/// only the delete action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMenu {
    pub subject_id: SubjectId,
    pub year_id: Option<YearId>,
    pub current: Option<Status>,
    pub options: Vec<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionView {
    pub selected: Option<SubjectId>,
    /// Requirements of the selected subject, keyed by subject id.
    pub highlighted: BTreeMap<SubjectId, CorrelativeKind>,
    /// Same-year subjects that are neither selected nor required.
    pub dimmed: BTreeSet<SubjectId>,
}

impl SelectionView {
    pub fn highlight_of(&self, subject_id: &str) -> Option<CorrelativeKind> {
        self.highlighted.get(subject_id).copied()
    }

    pub fn is_dimmed(&self, subject_id: &str) -> bool {
        self.dimmed.contains(subject_id)
    }

    pub fn is_selected(&self, subject_id: &str) -> bool {
        self.selected.as_deref() == Some(subject_id)
    }
}

pub struct App<R: PlanRepository> {
    plan: Plan,
    repository: R,
    report: StatusReport,
    overlay: OverlayCoordinator,
    menu: Option<SubjectId>,
    toast: Option<Toast>,
    toast_duration: Duration,
}

impl<R: PlanRepository> App<R> {
    pub fn new(repository: R) -> Self {
        Self::with_settings(repository, OverlayConfig::default(), DEFAULT_TOAST_DURATION)
    }

    pub fn with_config(repository: R, config: &Config) -> Self {
        Self::with_settings(repository, config.overlay, config.toast_duration())
    }

    pub fn with_settings(repository: R, overlay: OverlayConfig, toast_duration: Duration) -> Self {
        let plan = repository.load();
        let report = status::evaluate(&plan);
        debug!(subjects = plan.subject_count(), "application state loaded");
        Self {
            plan,
            repository,
            report,
            overlay: OverlayCoordinator::new(overlay),
            menu: None,
            toast: None,
            toast_duration,
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn selected(&self) -> Option<&str> {
        self.overlay.selected()
    }

    pub fn overlay(&self) -> &OverlayCoordinator {
        &self.overlay
    }

    pub fn select_subject(&mut self, subject_id: Option<&str>) -> Option<FrameTicket> {
        self.overlay.select(&self.plan, subject_id)
    }

    /// Card click: clicking the selected card deselects it and closes the
    /// menu, clicking any other card selects it and opens its menu.
    pub fn toggle_subject(&mut self, subject_id: &str) -> Option<FrameTicket> {
        if self.overlay.selected() == Some(subject_id) {
            self.menu = None;
            return self.overlay.select(&self.plan, None);
        }
        let ticket = self.overlay.select(&self.plan, Some(subject_id));
        self.menu = self.overlay.selected().map(str::to_string);
        ticket
    }

    pub fn open_menu(&mut self, subject_id: &str) {
        if self.plan.find_subject(subject_id).is_some() {
            self.menu = Some(subject_id.to_string());
        }
    }

    pub fn close_menu(&mut self) {
        self.menu = None;
    }

    /// Clears both selection and menu, as a click outside the grid does.
    pub fn dismiss(&mut self) {
        self.menu = None;
        self.overlay.select(&self.plan, None);
    }

    pub fn add_subject(
        &mut self,
        year_id: YearId,
        name: &str,
        correlatives: Vec<Correlative>,
    ) -> Result<Subject, ValidationError> {
        let subject = self.plan.add_subject(year_id, name, correlatives)?;
        self.commit();
        self.show_toast(format!("\"{}\" agregada", subject.name), ToastKind::Ok);
        Ok(subject)
    }

    pub fn delete_subject(&mut self, year_id: YearId, subject_id: &str) -> bool {
        let removed = self.plan.delete_subject(year_id, subject_id);
        self.dismiss();
        if removed {
            self.commit();
        }
        self.show_toast("Materia eliminada", ToastKind::Error);
        removed
    }

    pub fn set_manual_status(
        &mut self,
        subject_id: &str,
        status: Status,
    ) -> Result<(), ValidationError> {
        self.plan.set_manual_status(subject_id, status)?;
        self.commit();
        self.dismiss();
        self.show_toast(format!("{} ✓", status.label()), ToastKind::Ok);
        Ok(())
    }

    pub fn request_export(&mut self) -> StorageResult<ExportedFile> {
        let file = self.repository.export_document(&self.plan)?;
        info!(bytes = file.bytes.len(), "plan exported");
        self.show_toast("JSON exportado", ToastKind::Ok);
        Ok(file)
    }

    /// Replaces the plan and manual map from an imported document. On failure
    /// the current state is kept untouched.
    pub fn request_import<S, F>(&mut self, bytes: &[u8], on_success: S, on_failure: F)
    where
        S: FnOnce(),
        F: FnOnce(&ImportError),
    {
        match self.import_document(bytes) {
            Ok(()) => on_success(),
            Err(err) => on_failure(&err),
        }
    }

    pub fn import_document(&mut self, bytes: &[u8]) -> Result<(), ImportError> {
        match self.repository.import_document(bytes) {
            Ok(plan) => {
                self.plan = plan;
                self.commit();
                self.dismiss();
                self.show_toast("Plan importado ✓", ToastKind::Ok);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "import rejected");
                self.show_toast("Archivo inválido", ToastKind::Error);
                Err(err)
            }
        }
    }

    pub fn effective_statuses(&self) -> &EffectiveStatusMap {
        &self.report.statuses
    }

    pub fn status_report(&self) -> &StatusReport {
        &self.report
    }

    pub fn status_of(&self, subject_id: &str) -> Status {
        self.report.status_of(subject_id)
    }

    pub fn status_counts(&self) -> BTreeMap<Status, usize> {
        status::status_counts(&self.report.statuses)
    }

    pub fn edges(&self) -> &[Edge] {
        self.overlay.edges()
    }

    pub fn animation_epoch(&self) -> u64 {
        self.overlay.epoch()
    }

    pub fn selection_view(&self) -> SelectionView {
        let Some(subject) = self.overlay.selected().and_then(|id| self.plan.find_subject(id))
        else {
            return SelectionView::default();
        };
        let highlighted: BTreeMap<SubjectId, CorrelativeKind> = subject
            .correlatives
            .iter()
            .map(|c| (c.subject_id.clone(), c.kind))
            .collect();
        let dimmed = self
            .plan
            .year_of(&subject.id)
            .map(|year| {
                year.subjects
                    .iter()
                    .filter(|s| s.id != subject.id && !highlighted.contains_key(&s.id))
                    .map(|s| s.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        SelectionView {
            selected: Some(subject.id.clone()),
            highlighted,
            dimmed,
        }
    }

    pub fn status_menu(&self) -> Option<StatusMenu> {
        let subject_id = self.menu.as_deref()?;
        self.plan.find_subject(subject_id)?;
        let status = self.report.status_of(subject_id);
        let (current, options) = if status == Status::Bloqueada {
            (None, Vec::new())
        } else {
            (Some(status), Status::MENU.to_vec())
        };
        Some(StatusMenu {
            subject_id: subject_id.to_string(),
            year_id: self.plan.year_of(subject_id).map(|year| year.id),
            current,
            options,
        })
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    /// Advances the toast clock.
    pub fn tick(&mut self, elapsed: Duration) {
        let expired = self
            .toast
            .as_mut()
            .is_some_and(|toast| !toast.tick(elapsed));
        if expired {
            self.toast = None;
        }
    }

    pub fn viewport_changed(&mut self) -> Option<FrameTicket> {
        self.overlay.viewport_changed()
    }

    pub fn run_frame(&mut self, ticket: FrameTicket, rects: &dyn RectProvider) -> bool {
        self.overlay.run_frame(ticket, &self.plan, rects)
    }

    fn commit(&mut self) {
        self.report = status::evaluate(&self.plan);
        self.repository.save(&self.plan);
    }

    fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toast = Some(Toast {
            message: message.into(),
            kind,
            remaining: self.toast_duration,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::overlay::OverlayPhase;
    use crate::repository::{MemoryRepository, export_document};
    use std::cell::Cell;
    use std::collections::HashMap;

    struct Ids {
        a: String,
        b: String,
        c: String,
        d: String,
    }

    fn app() -> (App<MemoryRepository>, Ids) {
        let mut plan = Plan::new();
        let a = plan.add_subject(1, "Análisis I", Vec::new()).unwrap().id;
        let b = plan.add_subject(1, "Física I", Vec::new()).unwrap().id;
        let d = plan.add_subject(2, "Química", Vec::new()).unwrap().id;
        let c = plan
            .add_subject(
                2,
                "Análisis II",
                vec![
                    Correlative::new(a.clone(), CorrelativeKind::Approve),
                    Correlative::new(b.clone(), CorrelativeKind::Regularize),
                ],
            )
            .unwrap()
            .id;
        (App::new(MemoryRepository::with_plan(plan)), Ids { a, b, c, d })
    }

    #[test]
    fn add_subject_saves_and_toasts() {
        let (mut app, ids) = app();
        let subject = app
            .add_subject(
                3,
                "  Probabilidad ",
                vec![Correlative::new(ids.c.clone(), CorrelativeKind::Regularize)],
            )
            .unwrap();
        assert_eq!(subject.name, "Probabilidad");
        assert_eq!(app.repository().save_count(), 1);
        assert_eq!(app.status_of(&subject.id), Status::Bloqueada);
        let toast = app.toast().unwrap();
        assert_eq!(toast.message, "\"Probabilidad\" agregada");
        assert_eq!(toast.kind, ToastKind::Ok);
    }

    #[test]
    fn rejected_add_changes_nothing() {
        let (mut app, _) = app();
        let before = app.plan().clone();
        assert_eq!(
            app.add_subject(4, "física i", Vec::new()),
            Err(ValidationError::DuplicateName("física i".to_string()))
        );
        assert_eq!(app.plan(), &before);
        assert_eq!(app.repository().save_count(), 0);
        assert!(app.toast().is_none());
    }

    #[test]
    fn toggle_opens_menu_and_second_click_deselects() {
        let (mut app, ids) = app();
        assert!(app.toggle_subject(&ids.c).is_some());
        assert_eq!(app.selected(), Some(ids.c.as_str()));
        let menu = app.status_menu().unwrap();
        assert_eq!(menu.subject_id, ids.c);
        assert_eq!(menu.current, None);
        assert!(menu.options.is_empty());

        assert_eq!(app.toggle_subject(&ids.c), None);
        assert_eq!(app.selected(), None);
        assert!(app.status_menu().is_none());
    }

    #[test]
    fn menu_offers_statuses_for_unblocked_subject() {
        let (mut app, ids) = app();
        app.toggle_subject(&ids.a);
        let menu = app.status_menu().unwrap();
        assert_eq!(menu.current, Some(Status::Disponible));
        assert_eq!(menu.options, Status::MENU.to_vec());
        assert_eq!(menu.year_id, Some(1));
    }

    #[test]
    fn selection_view_highlights_requirements_and_dims_year() {
        let (mut app, ids) = app();
        app.select_subject(Some(&ids.c));
        let view = app.selection_view();
        assert!(view.is_selected(&ids.c));
        assert_eq!(view.highlight_of(&ids.a), Some(CorrelativeKind::Approve));
        assert_eq!(view.highlight_of(&ids.b), Some(CorrelativeKind::Regularize));
        assert!(view.is_dimmed(&ids.d));
        assert!(!view.is_dimmed(&ids.a));
        assert_eq!(view.dimmed.len(), 1);

        app.select_subject(None);
        assert_eq!(app.selection_view(), SelectionView::default());
    }

    #[test]
    fn setting_status_unblocks_and_clears_selection() {
        let (mut app, ids) = app();
        app.toggle_subject(&ids.a);
        app.set_manual_status(&ids.a, Status::Aprobada).unwrap();
        assert_eq!(app.toast().unwrap().message, "Aprobada ✓");
        assert_eq!(app.selected(), None);
        assert!(app.status_menu().is_none());
        assert_eq!(app.status_of(&ids.c), Status::Bloqueada);

        app.set_manual_status(&ids.b, Status::Regular).unwrap();
        assert_eq!(app.status_of(&ids.c), Status::Disponible);
        let counts = app.status_counts();
        assert_eq!(counts[&Status::Aprobada], 1);
        assert_eq!(counts[&Status::Regular], 1);
        assert_eq!(counts[&Status::Disponible], 2);
        assert_eq!(app.repository().save_count(), 2);
    }

    #[test]
    fn blocked_status_is_not_settable() {
        let (mut app, ids) = app();
        assert_eq!(
            app.set_manual_status(&ids.a, Status::Bloqueada),
            Err(ValidationError::StatusNotSettable(Status::Bloqueada))
        );
        assert_eq!(app.repository().save_count(), 0);
    }

    #[test]
    fn delete_cascades_and_shows_error_toast() {
        let (mut app, ids) = app();
        app.set_manual_status(&ids.a, Status::Aprobada).unwrap();
        app.toggle_subject(&ids.a);
        assert!(app.delete_subject(1, &ids.a));
        assert_eq!(app.selected(), None);
        let toast = app.toast().unwrap();
        assert_eq!(toast.message, "Materia eliminada");
        assert_eq!(toast.kind, ToastKind::Error);
        let c = app.plan().find_subject(&ids.c).unwrap();
        assert_eq!(c.correlatives.len(), 1);
        assert!(app.plan().manual_status(&ids.a).is_none());
        assert!(!app.effective_statuses().contains_key(&ids.a));
    }

    #[test]
    fn import_replaces_state_and_reports_success() {
        let (mut app, ids) = app();
        let mut other = Plan::new();
        other.add_subject(5, "Proyecto Final", Vec::new()).unwrap();
        let bytes = export_document(&other).unwrap().bytes;

        app.select_subject(Some(&ids.c));
        let succeeded = Cell::new(false);
        app.request_import(&bytes, || succeeded.set(true), |_| panic!("import failed"));
        assert!(succeeded.get());
        assert_eq!(app.plan(), &other);
        assert_eq!(app.selected(), None);
        assert_eq!(app.toast().unwrap().message, "Plan importado ✓");
        assert_eq!(app.repository().stored(), Some(&other));
    }

    #[test]
    fn failed_import_preserves_state() {
        let (mut app, _) = app();
        let before = app.plan().clone();
        let failed = Cell::new(false);
        app.request_import(
            br#"{"statusMap": {}}"#,
            || panic!("import should fail"),
            |err| {
                assert!(matches!(err, ImportError::MissingYears));
                failed.set(true);
            },
        );
        assert!(failed.get());
        assert_eq!(app.plan(), &before);
        let toast = app.toast().unwrap();
        assert_eq!(toast.message, "Archivo inválido");
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(app.repository().save_count(), 0);
    }

    #[test]
    fn export_toasts() {
        let (mut app, _) = app();
        let file = app.request_export().unwrap();
        assert_eq!(file.file_name, "plan_de_estudios.json");
        assert_eq!(app.toast().unwrap().message, "JSON exportado");
    }

    #[test]
    fn toast_expires_after_its_lifetime() {
        let (mut app, _) = app();
        app.request_export().unwrap();
        app.tick(Duration::from_millis(1500));
        assert!(app.toast().is_some());
        app.tick(Duration::from_millis(500));
        assert!(app.toast().is_none());
    }

    #[test]
    fn frames_drive_edges_through_app() {
        let (mut app, ids) = app();
        let mut rects = HashMap::new();
        rects.insert(ids.a.clone(), Rect::new(0.0, 0.0, 160.0, 40.0));
        rects.insert(ids.b.clone(), Rect::new(0.0, 60.0, 160.0, 40.0));
        rects.insert(ids.c.clone(), Rect::new(200.0, 0.0, 160.0, 40.0));

        let ticket = app.select_subject(Some(&ids.c)).unwrap();
        assert!(app.run_frame(ticket, &rects));
        assert_eq!(app.edges().len(), 2);
        assert_eq!(app.animation_epoch(), 1);
        assert_eq!(app.overlay().phase(), OverlayPhase::Displayed);

        let resize = app.viewport_changed().unwrap();
        assert!(app.run_frame(resize, &rects));
        assert_eq!(app.animation_epoch(), 1);
    }
}
