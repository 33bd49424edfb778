use crate::app::SelectionView;
use crate::config::LayoutConfig;
#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::geometry::{build_curve, draw_on_timing, estimate_length};
use crate::layout::{CardLayout, ColumnLayout, EMPTY_COLUMN_NOTE, PENDING_NOTE, PlanLayout, TextBlock};
use crate::overlay::{Edge, OverlayConfig};
use crate::plan::{CorrelativeKind, Status};
use crate::theme::Theme;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

const CARD_RADIUS: f32 = 8.0;
const DOT_RADIUS: f32 = 3.5;
const HEADER_COUNTERS: [(Status, &str); 3] = [
    (Status::Aprobada, "Aprobadas"),
    (Status::Regular, "Regulares"),
    (Status::Cursando, "Cursando"),
];

/// Everything one frame of the plan view needs.
pub struct RenderInput<'a> {
    pub layout: &'a PlanLayout,
    pub selection: &'a SelectionView,
    pub counts: &'a BTreeMap<Status, usize>,
    pub edges: &'a [Edge],
    pub epoch: u64,
    pub overlay: &'a OverlayConfig,
    /// Emit the draw-on animation. Static rasterizers ignore CSS animations,
    /// so PNG output turns this off to get fully drawn arrows.
    pub animate: bool,
}

pub fn render_svg(input: &RenderInput<'_>, theme: &Theme, config: &LayoutConfig) -> String {
    let layout = input.layout;
    let mut svg = String::new();
    let width = layout.width.max(200.0);
    let height = layout.height.max(200.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    for kind in [CorrelativeKind::Regularize, CorrelativeKind::Approve] {
        svg.push_str(&format!(
            "<marker id=\"{}\" markerWidth=\"8\" markerHeight=\"8\" refX=\"6.5\" refY=\"4\" orient=\"auto\" markerUnits=\"userSpaceOnUse\"><path d=\"M0,1.5 L0,6.5 L7,4z\" fill=\"{}\"/></marker>",
            marker_id(kind),
            theme.kind_color(kind)
        ));
    }
    if input.animate && !input.edges.is_empty() {
        svg.push_str(&format!(
            "<style>@keyframes draw-{} {{ to {{ stroke-dashoffset: 0; }} }}</style>",
            input.epoch
        ));
    }
    svg.push_str("</defs>");

    render_header(&mut svg, input.counts, layout, theme, config);
    render_legend(&mut svg, layout, theme, config);

    for column in &layout.columns {
        render_column(&mut svg, column, layout, theme, config);
    }
    for card in &layout.cards {
        render_card(&mut svg, card, input.selection, theme, config);
    }

    if !input.edges.is_empty() {
        svg.push_str(&format!("<g class=\"overlay\" data-epoch=\"{}\">", input.epoch));
        for (idx, edge) in input.edges.iter().enumerate() {
            render_edge(&mut svg, idx, edge, input, theme);
        }
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    svg
}

fn render_header(
    svg: &mut String,
    counts: &BTreeMap<Status, usize>,
    layout: &PlanLayout,
    theme: &Theme,
    config: &LayoutConfig,
) {
    let x = config.padding;
    let base = config.padding;
    svg.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{:.2}\" letter-spacing=\"1.6\" fill=\"{}\">GESTIÓN ACADÉMICA</text>",
        base + 10.0,
        theme.font_family,
        theme.font_size * 0.8,
        theme.muted_text_color
    ));
    svg.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{:.2}\" font-weight=\"700\" fill=\"{}\">Materias</text>",
        base + 42.0,
        theme.heading_font_family,
        theme.font_size * 2.4,
        theme.text_color
    ));

    let mut counter_x = layout.width - config.padding - 30.0;
    for (status, label) in HEADER_COUNTERS.iter().rev() {
        let count = counts.get(status).copied().unwrap_or(0);
        svg.push_str(&format!(
            "<text x=\"{counter_x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{:.2}\" fill=\"{}\">{}</text>",
            base + 30.0,
            theme.font_family,
            theme.font_size * 1.6,
            theme.status(*status).dot,
            count
        ));
        svg.push_str(&format!(
            "<text x=\"{counter_x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{:.2}\" fill=\"{}\">{}</text>",
            base + 44.0,
            theme.font_family,
            theme.font_size * 0.7,
            theme.muted_text_color,
            label.to_uppercase()
        ));
        counter_x -= 72.0;
    }

    let rule_y = config.padding + config.header_height - 8.0;
    svg.push_str(&format!(
        "<line x1=\"0\" y1=\"{rule_y:.2}\" x2=\"{:.2}\" y2=\"{rule_y:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
        layout.width,
        theme.rule_color
    ));
}

fn render_legend(svg: &mut String, layout: &PlanLayout, theme: &Theme, config: &LayoutConfig) {
    let y = config.padding + config.header_height + config.legend_height / 2.0;
    let font_size = theme.font_size * 0.8;
    let mut x = config.padding;
    for status in Status::ALL {
        let style = theme.status(status);
        svg.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{y:.2}\" r=\"{DOT_RADIUS}\" fill=\"{}\"/>",
            x + DOT_RADIUS,
            style.dot
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{font_size:.2}\" fill=\"{}\">{}</text>",
            x + DOT_RADIUS * 2.0 + 5.0,
            y + font_size * 0.35,
            theme.font_family,
            style.color,
            status.label()
        ));
        x += 96.0;
    }

    let mut x = layout.width - config.padding - 200.0;
    for kind in [CorrelativeKind::Regularize, CorrelativeKind::Approve] {
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{font_size:.2}\" fill=\"{}\"><tspan font-weight=\"700\" fill=\"{}\">→</tspan> {}</text>",
            y + font_size * 0.35,
            theme.font_family,
            theme.muted_text_color,
            theme.kind_color(kind),
            kind.label()
        ));
        x += 100.0;
    }
}

fn render_column(
    svg: &mut String,
    column: &ColumnLayout,
    layout: &PlanLayout,
    theme: &Theme,
    config: &LayoutConfig,
) {
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{:.2}\" font-weight=\"600\" fill=\"{}\">{}</text>",
        column.x,
        column.y + theme.font_size * 1.2,
        theme.heading_font_family,
        theme.font_size * 1.15,
        theme.text_color,
        escape_xml(&column.label)
    ));
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{:.2}\" fill=\"{}\">{}</text>",
        column.x,
        column.y + theme.font_size * 2.4,
        theme.font_family,
        theme.font_size * 0.8,
        theme.muted_text_color,
        column.count_label()
    ));
    let rule_y = layout.grid_top + config.column_header_height - 6.0;
    svg.push_str(&format!(
        "<line x1=\"{:.2}\" y1=\"{rule_y:.2}\" x2=\"{:.2}\" y2=\"{rule_y:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
        column.x,
        column.x + column.width,
        theme.rule_color
    ));
    if column.subject_count == 0 {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{:.2}\" font-style=\"italic\" fill=\"{}\">{}</text>",
            column.x,
            layout.grid_top + config.column_header_height + theme.font_size,
            theme.font_family,
            theme.font_size * 0.85,
            theme.muted_text_color,
            EMPTY_COLUMN_NOTE
        ));
    }
}

fn render_card(
    svg: &mut String,
    card: &CardLayout,
    selection: &SelectionView,
    theme: &Theme,
    config: &LayoutConfig,
) {
    let style = theme.status(card.status);
    let highlight = selection.highlight_of(&card.subject_id);
    let (fill, border) = match highlight {
        Some(kind) => theme.highlight(kind),
        None => (style.bg.as_str(), style.border.as_str()),
    };
    let opacity = if selection.is_dimmed(&card.subject_id) {
        theme.dimmed_opacity
    } else {
        1.0
    };

    svg.push_str(&format!(
        "<g class=\"card\" data-subject-id=\"{}\" opacity=\"{opacity}\">",
        escape_xml(&card.subject_id)
    ));
    if selection.is_selected(&card.subject_id) && card.status != Status::Bloqueada {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" fill=\"none\" stroke=\"{border}\" stroke-opacity=\"0.53\" stroke-width=\"2\"/>",
            card.x - 2.0,
            card.y - 2.0,
            card.width + 4.0,
            card.height + 4.0,
            CARD_RADIUS + 2.0,
            CARD_RADIUS + 2.0
        ));
    }
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{CARD_RADIUS}\" ry=\"{CARD_RADIUS}\" fill=\"{fill}\" stroke=\"{border}\" stroke-width=\"1\"/>",
        card.x, card.y, card.width, card.height
    ));

    let text_x = card.x + config.card_padding_x;
    let text_top = card.y + config.card_padding_y;
    svg.push_str(&format!(
        "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{DOT_RADIUS}\" fill=\"{}\"/>",
        text_x + DOT_RADIUS,
        text_top + theme.font_size * config.line_height / 2.0,
        style.dot
    ));
    let weight = if highlight.is_some() { 500 } else { 400 };
    svg.push_str(&text_block_svg(
        text_x + DOT_RADIUS * 2.0 + 5.0,
        text_top,
        &card.label,
        &style.color,
        weight,
        theme,
        config,
    ));

    if card.pending_note {
        let note_size = theme.font_size * 0.76;
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{note_size:.2}\" font-style=\"italic\" fill=\"{}\">{}</text>",
            text_x + DOT_RADIUS * 2.0 + 5.0,
            text_top + card.label.height + note_size,
            theme.font_family,
            theme.bloqueada.dot,
            PENDING_NOTE
        ));
    }
    svg.push_str("</g>");
}

fn render_edge(svg: &mut String, idx: usize, edge: &Edge, input: &RenderInput<'_>, theme: &Theme) {
    let overlay = input.overlay;
    let curve = build_curve(edge.x1, edge.y1, edge.x2, edge.y2, edge.routing, &overlay.curve);
    let length = estimate_length(edge.x1, edge.y1, edge.x2, edge.y2, edge.routing);
    let timing = draw_on_timing(idx, length, overlay.draw_duration_secs, overlay.stagger_secs);

    let animation = if input.animate {
        format!(
            " stroke-dasharray=\"{len:.2}\" stroke-dashoffset=\"{len:.2}\" style=\"animation: draw-{} {:.2}s cubic-bezier(0.4,0,0.2,1) {:.2}s forwards\"",
            input.epoch,
            timing.duration_secs,
            timing.delay_secs,
            len = timing.length
        )
    } else {
        String::new()
    };
    svg.push_str(&format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\" marker-end=\"url(#{})\" data-from=\"{}\" data-to=\"{}\"{animation}/>",
        curve.to_svg_d(),
        theme.kind_color(edge.kind),
        overlay.stroke_width,
        marker_id(edge.kind),
        escape_xml(&edge.id.correlative),
        escape_xml(&edge.id.selected)
    ));
}

fn text_block_svg(
    x: f32,
    top: f32,
    label: &TextBlock,
    color: &str,
    weight: u16,
    theme: &Theme,
    config: &LayoutConfig,
) -> String {
    let line_height = theme.font_size * config.line_height;
    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{top:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"{weight}\" fill=\"{color}\">",
        theme.font_family, theme.font_size
    );
    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { theme.font_size } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

fn marker_id(kind: CorrelativeKind) -> &'static str {
    match kind {
        CorrelativeKind::Regularize => "arrow-regular",
        CorrelativeKind::Approve => "arrow-aprobada",
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "DM Sans".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("Invalid render size"))?;
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;
    pixmap.fill(parse_background(&render_cfg.background));

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(feature = "png")]
fn parse_background(hex: &str) -> resvg::tiny_skia::Color {
    let digits = hex.trim_start_matches('#');
    let channel = |idx: usize| {
        digits
            .get(idx..idx + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
    };
    match (digits.len(), channel(0), channel(2), channel(4)) {
        (6, Some(r), Some(g), Some(b)) => resvg::tiny_skia::Color::from_rgba8(r, g, b, 255),
        _ => resvg::tiny_skia::Color::WHITE,
    }
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
