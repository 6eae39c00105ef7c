//! SVG charts
//!
//! Plain SVG strings, written with `format!` so the output opens in any
//! browser without a plotting backend.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 50.0;

/// Escape text for use inside SVG elements
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn svg_open(output: &mut String, title: &str) {
    output.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
        w = WIDTH,
        h = HEIGHT
    ));
    output.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    output.push_str(&format!(
        "<text x=\"{}\" y=\"28\" font-family=\"sans-serif\" font-size=\"18\" text-anchor=\"middle\">{}</text>\n",
        WIDTH / 2.0,
        escape(title)
    ));
}

/// Closing prices with markers on the days predicted "up"
pub fn render_price_chart(
    title: &str,
    dates: &[NaiveDate],
    closes: &[f64],
    predicted_up: &[NaiveDate],
) -> Result<String> {
    if dates.len() != closes.len() {
        return Err(Error::InvalidInput(format!(
            "{} dates but {} closes",
            dates.len(),
            closes.len()
        )));
    }
    if dates.is_empty() {
        return Err(Error::InvalidInput("nothing to plot".to_string()));
    }

    let (min, max) = closes
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| (lo.min(c), hi.max(c)));
    let span = if max > min { max - min } else { 1.0 };
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let last = (dates.len() - 1).max(1) as f64;

    let x = |i: usize| MARGIN_LEFT + plot_w * i as f64 / last;
    let y = |c: f64| MARGIN_TOP + plot_h * (1.0 - (c - min) / span);

    let mut output = String::new();
    svg_open(&mut output, title);

    // Axes
    output.push_str(&format!(
        "<line x1=\"{l}\" y1=\"{t}\" x2=\"{l}\" y2=\"{b}\" stroke=\"#444\"/>\n\
         <line x1=\"{l}\" y1=\"{b}\" x2=\"{r}\" y2=\"{b}\" stroke=\"#444\"/>\n",
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = MARGIN_TOP + plot_h,
        r = MARGIN_LEFT + plot_w
    ));
    for (value, label_y) in [(max, MARGIN_TOP), (min, MARGIN_TOP + plot_h)] {
        output.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"12\" text-anchor=\"end\">{:.2}</text>\n",
            MARGIN_LEFT - 6.0,
            label_y + 4.0,
            value
        ));
    }
    for (i, anchor) in [(0, "start"), (dates.len() - 1, "end")] {
        output.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"12\" text-anchor=\"{}\">{}</text>\n",
            x(i),
            HEIGHT - MARGIN_BOTTOM + 20.0,
            anchor,
            dates[i]
        ));
    }

    // Price line
    let points: Vec<String> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| format!("{:.1},{:.1}", x(i), y(c)))
        .collect();
    output.push_str(&format!(
        "<polyline fill=\"none\" stroke=\"#1f77b4\" stroke-width=\"1.5\" points=\"{}\"/>\n",
        points.join(" ")
    ));

    // Up markers
    let up: HashSet<&NaiveDate> = predicted_up.iter().collect();
    let mut markers = 0;
    for (i, date) in dates.iter().enumerate() {
        if up.contains(date) {
            output.push_str(&format!(
                "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"3.5\" fill=\"#2ca02c\"/>\n",
                x(i),
                y(closes[i])
            ));
            markers += 1;
        }
    }

    // Legend
    output.push_str(&format!(
        "<line x1=\"{x0}\" y1=\"{ly}\" x2=\"{x1}\" y2=\"{ly}\" stroke=\"#1f77b4\" stroke-width=\"2\"/>\n\
         <text x=\"{tx}\" y=\"{ty}\" font-family=\"sans-serif\" font-size=\"12\">Close</text>\n\
         <circle cx=\"{cx}\" cy=\"{ly}\" r=\"3.5\" fill=\"#2ca02c\"/>\n\
         <text x=\"{ctx}\" y=\"{ty}\" font-family=\"sans-serif\" font-size=\"12\">Predicted up ({n})</text>\n",
        x0 = MARGIN_LEFT + 10.0,
        x1 = MARGIN_LEFT + 30.0,
        ly = MARGIN_TOP - 10.0,
        tx = MARGIN_LEFT + 36.0,
        ty = MARGIN_TOP - 6.0,
        cx = MARGIN_LEFT + 100.0,
        ctx = MARGIN_LEFT + 110.0,
        n = markers
    ));

    output.push_str("</svg>\n");
    Ok(output)
}

/// Headline metrics of one model variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantMetrics {
    pub name: String,
    pub accuracy: f64,
    /// Precision of the "up" class
    pub precision: f64,
    /// Recall of the "up" class
    pub recall: f64,
    /// F1 of the "up" class
    pub f1: f64,
}

impl VariantMetrics {
    pub fn values(&self) -> [(&'static str, f64); 4] {
        [
            ("Accuracy", self.accuracy),
            ("Precision", self.precision),
            ("Recall", self.recall),
            ("F1", self.f1),
        ]
    }
}

const BAR_COLORS: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

/// Grouped bars: one group per metric, one bar per variant
pub fn render_metric_bars(title: &str, variants: &[VariantMetrics]) -> Result<String> {
    if variants.is_empty() {
        return Err(Error::InvalidInput("no model variants to compare".to_string()));
    }

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let base = MARGIN_TOP + plot_h;
    let n_groups = 4.0;
    let group_w = plot_w / n_groups;
    let bar_w = group_w * 0.8 / variants.len() as f64;

    let mut output = String::new();
    svg_open(&mut output, title);

    // Y axis from 0 to 1
    for tick in 0..=5 {
        let v = tick as f64 / 5.0;
        let ty = base - plot_h * v;
        output.push_str(&format!(
            "<line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#ddd\"/>\n\
             <text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"12\" text-anchor=\"end\">{:.1}</text>\n",
            MARGIN_LEFT,
            ty,
            MARGIN_LEFT + plot_w,
            ty,
            MARGIN_LEFT - 6.0,
            ty + 4.0,
            v
        ));
    }

    let labels = variants[0].values().map(|(label, _)| label);
    for (g, label) in labels.iter().enumerate() {
        let group_x = MARGIN_LEFT + group_w * g as f64 + group_w * 0.1;
        for (v, variant) in variants.iter().enumerate() {
            let value = variant.values()[g].1.clamp(0.0, 1.0);
            let h = plot_h * value;
            let bx = group_x + bar_w * v as f64;
            output.push_str(&format!(
                "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\"><title>{}: {:.3}</title></rect>\n",
                bx,
                base - h,
                bar_w * 0.95,
                h,
                BAR_COLORS[v % BAR_COLORS.len()],
                escape(&variant.name),
                value
            ));
            output.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"10\" text-anchor=\"middle\">{:.2}</text>\n",
                bx + bar_w * 0.475,
                base - h - 4.0,
                value
            ));
        }
        output.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"13\" text-anchor=\"middle\">{}</text>\n",
            MARGIN_LEFT + group_w * (g as f64 + 0.5),
            base + 20.0,
            label
        ));
    }

    // Legend
    for (v, variant) in variants.iter().enumerate() {
        let lx = MARGIN_LEFT + 10.0 + 180.0 * v as f64;
        output.push_str(&format!(
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"12\" height=\"12\" fill=\"{}\"/>\n\
             <text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"12\">{}</text>\n",
            lx,
            MARGIN_TOP - 22.0,
            BAR_COLORS[v % BAR_COLORS.len()],
            lx + 16.0,
            MARGIN_TOP - 12.0,
            escape(&variant.name)
        ));
    }

    output.push_str("</svg>\n");
    Ok(output)
}
