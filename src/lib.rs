//! Curriculum plan tracking: subjects grouped by year, correlative
//! requirements between them, derived statuses and the requirement overlay
//! drawn for a selected subject.

pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod overlay;
pub mod plan;
pub mod render;
pub mod repository;
pub mod snapshot;
pub mod status;
pub mod theme;

pub use app::{App, SelectionView, StatusMenu, Toast, ToastKind};
#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{ImportError, StorageError, ValidationError};
pub use geometry::{Rect, RectProvider};
pub use overlay::{Edge, FrameTicket, OverlayCoordinator, OverlayPhase};
pub use plan::{Correlative, CorrelativeKind, Plan, Status, Subject, Year};
pub use repository::{FileRepository, MemoryRepository, PlanRepository};
pub use status::{StatusReport, compute_effective_status, effective_statuses, evaluate};
