use std::collections::HashMap;

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::geometry::{Rect, RectProvider};
use crate::plan::{Plan, Status, SubjectId, YearId};
use crate::status::EffectiveStatusMap;
use crate::theme::Theme;

pub const PENDING_NOTE: &str = "Correlativas pendientes";
pub const EMPTY_COLUMN_NOTE: &str = "Sin materias";

const NOTE_SCALE: f32 = 0.76;
const DOT_GUTTER: f32 = 11.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardLayout {
    pub subject_id: SubjectId,
    pub year_id: YearId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: TextBlock,
    pub status: Status,
    /// Blocked cards carry a second "pending requirements" line.
    pub pending_note: bool,
}

impl CardLayout {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLayout {
    pub year_id: YearId,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub subject_count: usize,
}

impl ColumnLayout {
    /// "1 materia", "3 materias".
    pub fn count_label(&self) -> String {
        let plural = if self.subject_count == 1 { "" } else { "s" };
        format!("{} materia{}", self.subject_count, plural)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLayout {
    pub columns: Vec<ColumnLayout>,
    pub cards: Vec<CardLayout>,
    pub grid_top: f32,
    pub width: f32,
    pub height: f32,
    #[serde(skip)]
    index: HashMap<SubjectId, usize>,
}

impl PlanLayout {
    pub fn card(&self, subject_id: &str) -> Option<&CardLayout> {
        self.index.get(subject_id).map(|&idx| &self.cards[idx])
    }
}

impl RectProvider for PlanLayout {
    fn bounds_of(&self, subject_id: &str) -> Option<Rect> {
        self.card(subject_id).map(CardLayout::rect)
    }
}

/// Places one column per year and stacks the year's cards in plan order.
pub fn compute_plan_layout(
    plan: &Plan,
    statuses: &EffectiveStatusMap,
    theme: &Theme,
    config: &LayoutConfig,
) -> PlanLayout {
    let grid_top = config.padding + config.header_height + config.legend_height;
    let cards_top = grid_top + config.column_header_height;
    let mut layout = PlanLayout {
        grid_top,
        ..Default::default()
    };
    let mut tallest = cards_top;

    for (col, year) in plan.years.iter().enumerate() {
        let x = config.padding + col as f32 * (config.card_width + config.column_gap);
        layout.columns.push(ColumnLayout {
            year_id: year.id,
            label: year.label.clone(),
            x,
            y: grid_top,
            width: config.card_width,
            subject_count: year.subjects.len(),
        });

        let mut y = cards_top;
        if year.subjects.is_empty() {
            y += theme.font_size * config.line_height + config.card_padding_y;
        }
        for subject in &year.subjects {
            let status = statuses
                .get(&subject.id)
                .copied()
                .unwrap_or(Status::Disponible);
            let label = measure_label(&subject.name, theme, config);
            let pending_note = status == Status::Bloqueada;
            let mut height = label.height + config.card_padding_y * 2.0;
            if pending_note {
                height += theme.font_size * NOTE_SCALE * config.line_height;
            }
            layout.index.insert(subject.id.clone(), layout.cards.len());
            layout.cards.push(CardLayout {
                subject_id: subject.id.clone(),
                year_id: year.id,
                x,
                y,
                width: config.card_width,
                height,
                label,
                status,
                pending_note,
            });
            y += height + config.card_gap;
        }
        tallest = tallest.max(y);
    }

    let columns = plan.years.len().max(1) as f32;
    layout.width = config.padding * 2.0 + columns * config.card_width
        + (columns - 1.0) * config.column_gap;
    layout.height = tallest + config.padding;
    layout
}

pub fn measure_label(text: &str, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    let mut lines = wrap_line(text.trim(), config.max_name_chars);
    if lines.is_empty() {
        lines.push(String::new());
    }

    let max_len = lines.iter().map(|l| l.chars().count()).max().unwrap_or(1);
    let approx_char_width = theme.font_size * 0.55;
    let width = (max_len as f32 * approx_char_width + DOT_GUTTER).min(config.card_width);
    let height = lines.len() as f32 * theme.font_size * config.line_height;

    TextBlock {
        lines,
        width,
        height,
    }
}

fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    if line.chars().count() <= max_chars {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if candidate.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(current.clone());
                current.clear();
            }
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Correlative, CorrelativeKind};
    use crate::status::effective_statuses;

    #[test]
    fn wraps_long_names() {
        let theme = Theme::paper();
        let config = LayoutConfig {
            max_name_chars: 12,
            ..Default::default()
        };
        let block = measure_label("Sistemas de Representación", &theme, &config);
        assert_eq!(block.lines, vec!["Sistemas de", "Representación"]);
        let single = measure_label("Física I", &theme, &config);
        assert_eq!(single.lines.len(), 1);
        assert!(block.height > single.height);
    }

    #[test]
    fn cards_stack_per_year_and_blocked_cards_grow() {
        let mut plan = Plan::new();
        let a = plan.add_subject(1, "Álgebra", Vec::new()).unwrap().id;
        let b = plan.add_subject(1, "Física", Vec::new()).unwrap().id;
        let c = plan
            .add_subject(
                2,
                "Álgebra II",
                vec![Correlative::new(a.clone(), CorrelativeKind::Approve)],
            )
            .unwrap()
            .id;
        let statuses = effective_statuses(&plan);
        let theme = Theme::paper();
        let config = LayoutConfig::default();
        let layout = compute_plan_layout(&plan, &statuses, &theme, &config);

        assert_eq!(layout.columns.len(), 5);
        assert_eq!(layout.columns[0].count_label(), "2 materias");
        assert_eq!(layout.columns[1].count_label(), "1 materia");
        assert_eq!(layout.columns[2].count_label(), "0 materias");

        let ra = layout.bounds_of(&a).unwrap();
        let rb = layout.bounds_of(&b).unwrap();
        let rc = layout.bounds_of(&c).unwrap();
        assert_eq!(ra.x, rb.x);
        assert!((rb.y - (ra.y + ra.height + config.card_gap)).abs() < 1e-3);
        assert_eq!(rc.x, ra.x + config.card_width + config.column_gap);
        assert!(layout.card(&c).unwrap().pending_note);
        assert!(rc.height > ra.height);
        assert!(layout.bounds_of("ghost").is_none());
        assert!(layout.width >= rc.right());
        assert!(layout.height >= rb.bottom());
    }
}
