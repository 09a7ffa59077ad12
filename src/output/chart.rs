// @file: kline_exporter/src/output/chart.rs
// @description: Renders the close price of a series as a standalone SVG line chart.
// @author: LAS.

use crate::core::error::Result;
use crate::core::models::Series;
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use log::info;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

//
// CONSTANTS
//

const WIDTH: f64 = 1600.0;
const HEIGHT: f64 = 900.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 80.0;
const PRICE_GRID_LINES: usize = 5;
const MAX_DAY_TICKS: usize = 400;
const DAY_MILLIS: i64 = 86_400_000;


//
// TYPE DEFINITIONS
//

/// Linear mapping from (time, price) into the plot area.
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    t_min: i64,
    t_max: i64,
    p_min: f64,
    p_max: f64,
}

impl PlotArea {
    fn from_series(series: &Series) -> Option<Self> {
        let first = series.first()?;
        let last = series.last()?;

        let (p_min, p_max) = series.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, c| {
            (acc.0.min(c.close), acc.1.max(c.close))
        });

        // Flat or single-point series still need a non-zero span
        let (t_min, t_max) = if first.close_time == last.close_time {
            (first.close_time - DAY_MILLIS / 2, last.close_time + DAY_MILLIS / 2)
        } else {
            (first.close_time, last.close_time)
        };
        let pad: f64 = if p_max > p_min { (p_max - p_min) * 0.05 } else { p_max.abs().max(1.0) * 0.05 };

        Some(Self {
            t_min,
            t_max,
            p_min: p_min - pad,
            p_max: p_max + pad,
        })
    }

    fn x(&self, t: i64) -> f64 {
        let span: f64 = (self.t_max - self.t_min) as f64;
        MARGIN_LEFT + (t - self.t_min) as f64 / span * (WIDTH - MARGIN_LEFT - MARGIN_RIGHT)
    }

    fn y(&self, price: f64) -> f64 {
        let span: f64 = self.p_max - self.p_min;
        HEIGHT - MARGIN_BOTTOM - (price - self.p_min) / span * (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM)
    }
}


//
// PUBLIC INTERFACE
//

/// Close price against close time, month major grid, day minor grid.
pub fn render_close_chart(series: &Series, title: &str, x_label: &str) -> String {
    let mut svg: String = String::with_capacity(64 * series.len() + 2048);

    // #1. Canvas, frame and labels
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" font-family="sans-serif" font-size="24" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        MARGIN_TOP / 2.0 + 8.0,
        escape(title)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" font-family="sans-serif" font-size="16" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        HEIGHT - 20.0,
        escape(x_label)
    );
    let _ = writeln!(
        svg,
        r##"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="#333"/>"##,
        MARGIN_LEFT,
        MARGIN_TOP,
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT,
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
    );

    let Some(area) = PlotArea::from_series(series) else {
        svg.push_str("</svg>\n");
        return svg;
    };

    // #2. Grid
    write_time_grid(&mut svg, &area);
    write_price_grid(&mut svg, &area);

    // #3. Close price line
    let points: Vec<String> = series
        .iter()
        .map(|c| format!("{:.1},{:.1}", area.x(c.close_time), area.y(c.close)))
        .collect();
    let _ = writeln!(
        svg,
        r##"<polyline fill="none" stroke="#1f77b4" stroke-width="1.5" points="{}"/>"##,
        points.join(" ")
    );

    svg.push_str("</svg>\n");
    svg
}

pub fn write_chart(path: &Path, series: &Series, title: &str, x_label: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, render_close_chart(series, title, x_label))?;

    info!("Wrote chart to {}", path.display());
    Ok(())
}


//
// INTERNAL HELPERS
//

fn write_time_grid(svg: &mut String, area: &PlotArea) {
    let (Some(start), Some(end)) = (
        DateTime::<Utc>::from_timestamp_millis(area.t_min),
        DateTime::<Utc>::from_timestamp_millis(area.t_max),
    ) else {
        return;
    };

    // #1. Minor: day boundaries, skipped when they would be a solid block
    let day_count: usize = ((area.t_max - area.t_min) / DAY_MILLIS) as usize;
    if day_count <= MAX_DAY_TICKS {
        let mut day: NaiveDate = start.date_naive();
        while let Some(next) = day.succ_opt() {
            day = next;
            let t: i64 = day.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp_millis()).unwrap_or(i64::MAX);
            if t > area.t_max {
                break;
            }
            let x: f64 = area.x(t);
            let _ = writeln!(
                svg,
                r##"<line x1="{x:.1}" y1="{}" x2="{x:.1}" y2="{}" stroke="#eee"/>"##,
                MARGIN_TOP,
                HEIGHT - MARGIN_BOTTOM
            );
        }
    }

    // #2. Major: first of each month, labelled
    let Some(mut month) = NaiveDate::from_ymd_opt(start.year(), start.month(), 1) else {
        return;
    };
    while let Some(next) = month.checked_add_months(Months::new(1)) {
        month = next;
        if month > end.date_naive() {
            break;
        }
        let Some(t) = month.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp_millis()) else {
            break;
        };
        let x: f64 = area.x(t);
        let _ = writeln!(
            svg,
            r##"<line x1="{x:.1}" y1="{}" x2="{x:.1}" y2="{}" stroke="#bbb"/>"##,
            MARGIN_TOP,
            HEIGHT - MARGIN_BOTTOM
        );
        let _ = writeln!(
            svg,
            r#"<text x="{x:.1}" y="{}" font-family="sans-serif" font-size="12" text-anchor="middle">{}</text>"#,
            HEIGHT - MARGIN_BOTTOM + 18.0,
            month.format("%Y-%m")
        );
    }
}

fn write_price_grid(svg: &mut String, area: &PlotArea) {
    for i in 0..=PRICE_GRID_LINES {
        let price: f64 = area.p_min + (area.p_max - area.p_min) * i as f64 / PRICE_GRID_LINES as f64;
        let y: f64 = area.y(price);
        let _ = writeln!(
            svg,
            r##"<line x1="{}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="#ddd"/>"##,
            MARGIN_LEFT,
            WIDTH - MARGIN_RIGHT
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" font-family="sans-serif" font-size="12" text-anchor="end">{:.2}</text>"#,
            MARGIN_LEFT - 8.0,
            y + 4.0,
            price
        );
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
