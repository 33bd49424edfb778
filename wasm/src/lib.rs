use std::collections::BTreeMap;

use correlativas::config::{Config, LayoutConfig};
use correlativas::geometry::{RoutingClass, build_curve, draw_on_timing, estimate_length};
use correlativas::layout::compute_plan_layout;
use correlativas::overlay::{OverlayConfig, OverlayCoordinator};
use correlativas::plan::{CorrelativeKind, Plan, Status, SubjectId};
use correlativas::render::{RenderInput, render_svg};
use correlativas::repository::{MemoryRepository, import_document};
use correlativas::status::{CorrelativeCycle, evaluate};
use correlativas::theme::Theme;
use correlativas::{App, Rect};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Serialize)]
struct StatusesResponse {
    statuses: BTreeMap<SubjectId, Status>,
    cycles: Vec<CorrelativeCycle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EdgeResponse {
    id: String,
    from: SubjectId,
    to: SubjectId,
    #[serde(rename = "type")]
    kind: CorrelativeKind,
    routing: RoutingClass,
    d: String,
    length: f32,
    delay_secs: f32,
    duration_secs: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderOptions {
    theme: Option<String>,
    selected: Option<String>,
}

fn js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_plan(plan_json: &str) -> Result<Plan, JsValue> {
    import_document(plan_json.as_bytes()).map_err(js_error)
}

fn statuses_json(plan: &Plan) -> Result<String, String> {
    let report = evaluate(plan);
    serde_json::to_string(&StatusesResponse {
        statuses: report.statuses,
        cycles: report.cycles,
    })
    .map_err(|error| error.to_string())
}

fn edges_json(
    plan: &Plan,
    selected: &str,
    rects: &BTreeMap<String, Rect>,
) -> Result<String, String> {
    let config = OverlayConfig::default();
    let mut overlay = OverlayCoordinator::new(config);
    if let Some(ticket) = overlay.select(plan, Some(selected)) {
        overlay.run_frame(ticket, plan, rects);
    }
    let edges: Vec<EdgeResponse> = overlay
        .edges()
        .iter()
        .enumerate()
        .map(|(idx, edge)| {
            let length = estimate_length(edge.x1, edge.y1, edge.x2, edge.y2, edge.routing);
            let timing = draw_on_timing(idx, length, config.draw_duration_secs, config.stagger_secs);
            EdgeResponse {
                id: format!("{}-{}", edge.id.selected, edge.id.correlative),
                from: edge.id.correlative.clone(),
                to: edge.id.selected.clone(),
                kind: edge.kind,
                routing: edge.routing,
                d: build_curve(edge.x1, edge.y1, edge.x2, edge.y2, edge.routing, &config.curve)
                    .to_svg_d(),
                length,
                delay_secs: timing.delay_secs,
                duration_secs: timing.duration_secs,
            }
        })
        .collect();
    serde_json::to_string(&edges).map_err(|error| error.to_string())
}

fn plan_svg(plan: Plan, options: RenderOptions) -> String {
    let mut config = Config::default();
    if let Some(theme) = options.theme.as_deref().and_then(Theme::from_name) {
        config.theme = theme;
    }
    let layout_config = LayoutConfig::default();
    let mut app = App::with_config(MemoryRepository::with_plan(plan), &config);
    let layout = compute_plan_layout(app.plan(), app.effective_statuses(), &config.theme, &layout_config);
    if let Some(ticket) = app.select_subject(options.selected.as_deref()) {
        app.run_frame(ticket, &layout);
    }
    let selection = app.selection_view();
    let counts = app.status_counts();
    let input = RenderInput {
        layout: &layout,
        selection: &selection,
        counts: &counts,
        edges: app.edges(),
        epoch: app.animation_epoch(),
        overlay: app.overlay().config(),
        animate: true,
    };
    render_svg(&input, &config.theme, &layout_config)
}

/// `{ statuses: { id: status }, cycles: [{ members }] }` for a plan document.
#[wasm_bindgen]
pub fn effective_statuses(plan_json: &str) -> Result<String, JsValue> {
    let plan = parse_plan(plan_json)?;
    statuses_json(&plan).map_err(js_error)
}

/// Overlay edges for `selected_id`, given the on-screen boxes of the cards
/// as `{ id: { x, y, width, height } }`.
#[wasm_bindgen]
pub fn resolve_edges(plan_json: &str, selected_id: &str, rects_json: &str) -> Result<String, JsValue> {
    let plan = parse_plan(plan_json)?;
    let rects: BTreeMap<String, Rect> = serde_json::from_str(rects_json).map_err(js_error)?;
    edges_json(&plan, selected_id, &rects).map_err(js_error)
}

/// SVG path data for one arrow. `routing` is `ltr`, `rtl` or `same`.
#[wasm_bindgen]
pub fn curve_path(x1: f32, y1: f32, x2: f32, y2: f32, routing: &str) -> Result<String, JsValue> {
    let routing: RoutingClass =
        serde_json::from_value(serde_json::Value::String(routing.to_string())).map_err(js_error)?;
    let style = OverlayConfig::default().curve;
    Ok(build_curve(x1, y1, x2, y2, routing, &style).to_svg_d())
}

#[wasm_bindgen]
pub fn render_plan_svg(plan_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let plan = parse_plan(plan_json)?;
    let options = match options_json {
        Some(raw) => serde_json::from_str::<RenderOptions>(&raw).map_err(js_error)?,
        None => RenderOptions::default(),
    };
    Ok(plan_svg(plan, options))
}
