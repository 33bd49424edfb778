use serde::{Deserialize, Serialize};

use crate::plan::{CorrelativeKind, Status};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusStyle {
    pub color: String,
    pub bg: String,
    pub border: String,
    pub dot: String,
}

impl StatusStyle {
    fn new(color: &str, bg: &str, border: &str, dot: &str) -> Self {
        Self {
            color: color.to_string(),
            bg: bg.to_string(),
            border: border.to_string(),
            dot: dot.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub heading_font_family: String,
    pub font_size: f32,
    pub background: String,
    pub text_color: String,
    pub muted_text_color: String,
    pub rule_color: String,
    pub disponible: StatusStyle,
    pub cursando: StatusStyle,
    pub regular: StatusStyle,
    pub aprobada: StatusStyle,
    pub bloqueada: StatusStyle,
    pub regularize_color: String,
    pub regularize_highlight_bg: String,
    pub regularize_highlight_border: String,
    pub approve_color: String,
    pub approve_highlight_bg: String,
    pub approve_highlight_border: String,
    pub dimmed_opacity: f32,
}

impl Theme {
    /// Warm paper palette.
    pub fn paper() -> Self {
        Self {
            font_family: "'DM Sans', system-ui, sans-serif".to_string(),
            heading_font_family: "'Playfair Display', serif".to_string(),
            font_size: 13.0,
            background: "#F5F2EC".to_string(),
            text_color: "#1A1A1A".to_string(),
            muted_text_color: "#BBBBBB".to_string(),
            rule_color: "#D5D0C8".to_string(),
            disponible: StatusStyle::new("#6B7280", "#F3F4F6", "#D1D5DB", "#9CA3AF"),
            cursando: StatusStyle::new("#0369A1", "#E0F2FE", "#7DD3FC", "#38BDF8"),
            regular: StatusStyle::new("#9A3412", "#FEF3C7", "#FCD34D", "#F59E0B"),
            aprobada: StatusStyle::new("#065F46", "#D1FAE5", "#6EE7B7", "#10B981"),
            bloqueada: StatusStyle::new("#991B1B", "#FEE2E2", "#FCA5A5", "#EF4444"),
            regularize_color: "#D97706".to_string(),
            regularize_highlight_bg: "#FEF9EC".to_string(),
            regularize_highlight_border: "#F59E0B".to_string(),
            approve_color: "#059669".to_string(),
            approve_highlight_bg: "#ECFDF5".to_string(),
            approve_highlight_border: "#10B981".to_string(),
            dimmed_opacity: 0.35,
        }
    }

    /// Cooler, higher-contrast variant.
    pub fn slate() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            heading_font_family: "Inter, Segoe UI, system-ui, sans-serif".to_string(),
            font_size: 13.0,
            background: "#F8FAFC".to_string(),
            text_color: "#0F172A".to_string(),
            muted_text_color: "#94A3B8".to_string(),
            rule_color: "#CBD5E1".to_string(),
            disponible: StatusStyle::new("#475569", "#F1F5F9", "#CBD5E1", "#94A3B8"),
            cursando: StatusStyle::new("#1D4ED8", "#DBEAFE", "#93C5FD", "#3B82F6"),
            regular: StatusStyle::new("#B45309", "#FEF3C7", "#FCD34D", "#F59E0B"),
            aprobada: StatusStyle::new("#047857", "#D1FAE5", "#6EE7B7", "#10B981"),
            bloqueada: StatusStyle::new("#B91C1C", "#FEE2E2", "#FCA5A5", "#EF4444"),
            regularize_color: "#D97706".to_string(),
            regularize_highlight_bg: "#FFFBEB".to_string(),
            regularize_highlight_border: "#F59E0B".to_string(),
            approve_color: "#059669".to_string(),
            approve_highlight_bg: "#ECFDF5".to_string(),
            approve_highlight_border: "#10B981".to_string(),
            dimmed_opacity: 0.3,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "paper" | "default" => Some(Self::paper()),
            "slate" => Some(Self::slate()),
            _ => None,
        }
    }

    pub fn status(&self, status: Status) -> &StatusStyle {
        match status {
            Status::Disponible => &self.disponible,
            Status::Cursando => &self.cursando,
            Status::Regular => &self.regular,
            Status::Aprobada => &self.aprobada,
            Status::Bloqueada => &self.bloqueada,
        }
    }

    pub fn kind_color(&self, kind: CorrelativeKind) -> &str {
        match kind {
            CorrelativeKind::Regularize => &self.regularize_color,
            CorrelativeKind::Approve => &self.approve_color,
        }
    }

    /// (background, border) of a card highlighted as a requirement.
    pub fn highlight(&self, kind: CorrelativeKind) -> (&str, &str) {
        match kind {
            CorrelativeKind::Regularize => (
                &self.regularize_highlight_bg,
                &self.regularize_highlight_border,
            ),
            CorrelativeKind::Approve => (&self.approve_highlight_bg, &self.approve_highlight_border),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::paper()
    }
}
