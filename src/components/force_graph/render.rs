use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::{CanvasState, NODE_RADIUS};

const BACKGROUND: &str = "#1a1a2e";
const EDGE_RGB: &str = "100, 180, 255";
/// Edge labels only show once zoomed in this far.
const EDGE_LABEL_ZOOM: f64 = 1.5;

pub fn render(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.camera.x, state.camera.y);
	let _ = ctx.scale(state.camera.k, state.camera.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_edges(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.camera.k;
	let (line_width, arrow) = (1.2 / k, 7.0 / k);
	let dimming = state.hovered.is_some();

	state.graph.visit_edges(|a, b, _| {
		let (x1, y1, x2, y2) = (a.x() as f64, a.y() as f64, b.x() as f64, b.y() as f64);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = dx.hypot(dy);
		if dist < NODE_RADIUS * 2.0 {
			return;
		}
		let lit = state.is_highlighted(a.index()) && state.is_highlighted(b.index());
		let alpha = match (dimming, lit) {
			(false, _) => 0.6,
			(true, true) => 0.95,
			(true, false) => 0.12,
		};
		let (ux, uy) = (dx / dist, dy / dist);

		ctx.set_stroke_style_str(&format!("rgba({EDGE_RGB}, {alpha})"));
		ctx.set_line_width(line_width);
		ctx.begin_path();
		ctx.move_to(x1 + ux * NODE_RADIUS, y1 + uy * NODE_RADIUS);
		ctx.line_to(x2 - ux * (NODE_RADIUS + arrow), y2 - uy * (NODE_RADIUS + arrow));
		ctx.stroke();

		let (tip_x, tip_y) = (x2 - ux * NODE_RADIUS, y2 - uy * NODE_RADIUS);
		let (back_x, back_y) = (tip_x - ux * arrow, tip_y - uy * arrow);
		let (px, py) = (-uy * arrow * 0.5, ux * arrow * 0.5);
		ctx.set_fill_style_str(&format!("rgba({EDGE_RGB}, {alpha})"));
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();

		if k >= EDGE_LABEL_ZOOM || (dimming && lit) {
			if let Some(label) = state.edge_label(a.index(), b.index()) {
				ctx.set_fill_style_str(&format!("rgba(200, 220, 255, {alpha})"));
				ctx.set_font(&format!("{}px sans-serif", 8.0 / k.max(0.5)));
				let _ = ctx.fill_text(label, (x1 + x2) / 2.0, (y1 + y2) / 2.0);
			}
		}
	});
}

fn draw_nodes(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.camera.k;
	let dimming = state.hovered.is_some();

	state.graph.visit_nodes(|node| {
		let idx = node.index();
		let (x, y) = (node.x() as f64, node.y() as f64);
		let lit = state.is_highlighted(idx);
		let alpha = if dimming && !lit { 0.3 } else { 1.0 };
		let radius = if state.hovered == Some(idx) {
			NODE_RADIUS * 1.3
		} else {
			NODE_RADIUS
		};

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node.data.user_data.color);
		ctx.fill();

		if state.selected == Some(idx) {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 3.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str("white");
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		ctx.set_fill_style_str("white");
		ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
		let _ = ctx.fill_text(&node.data.user_data.label, x + radius + 3.0, y + 3.0);
		ctx.set_global_alpha(1.0);
	});
}
