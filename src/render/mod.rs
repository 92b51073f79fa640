// Figure rendering: turns feature arrays into PNG plots.
//
// Every figure is a white canvas with one framed axes area. Waveforms are drawn as a
// filled min/max envelope, 1-D features as a polyline, 2-D features as a colored
// heatmap with a colorbar. Glyphs are not rasterized; the title and the axis labels
// and ranges travel as PNG text chunks instead.

pub mod canvas;
pub mod colormap;
pub mod scale;

use image::RgbImage;
use ndarray::Array2;

use crate::audio::waveform::WaveformEnvelope;
use crate::config::RenderConfig;
use crate::error::{Error, Result};
use canvas::{Canvas, Rect, BLACK, LINE_BLUE};
use colormap::Colormap;
use scale::Scale;

const MARGIN_LEFT: u32 = 90;
const MARGIN_RIGHT: u32 = 30;
const MARGIN_TOP: u32 = 40;
const MARGIN_BOTTOM: u32 = 55;
const COLORBAR_GAP: u32 = 30;
const COLORBAR_WIDTH: u32 = 20;
/// Room to the right of the colorbar for its tick marks
const COLORBAR_TICK_ROOM: u32 = 60;
const TICK_LENGTH: i64 = 5;
const LINE_THICKNESS: u32 = 2;

/// Vertical axis of a heatmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YAxis {
    /// Rows are plotted evenly, row 0 at the bottom
    Linear,
    /// Rows are linearly spaced frequency bins from 0 to `max_hz`, shown on a log axis
    LogFrequency { max_hz: f32 },
}

#[derive(Debug, Clone)]
pub enum PlotKind {
    Waveform {
        envelope: WaveformEnvelope,
        duration_s: f32,
    },
    Line {
        x: Vec<f32>,
        y: Vec<f32>,
        /// Logarithmic y axis; non-positive values are left out of the line
        log_y: bool,
    },
    Heatmap {
        /// `(rows, frames)`
        values: Array2<f32>,
        duration_s: f32,
        y_axis: YAxis,
        /// Unit shown next to the colorbar range, e.g. "dB"
        colorbar_unit: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: PlotKind,
}

/// Render a figure to an 8-bit RGB PNG.
pub fn render_png(figure: &Figure, config: &RenderConfig) -> Result<Vec<u8>> {
    let (image, description) = render_image(figure, config)?;
    encode_png(&image, &figure.title, &description)
}

/// Render a figure to pixels, returning the text that describes its axes.
pub fn render_image(figure: &Figure, config: &RenderConfig) -> Result<(RgbImage, String)> {
    if config.width < 200 || config.height < 120 {
        return Err(Error::Render(format!(
            "figure size {}x{} is too small",
            config.width, config.height
        )));
    }

    let mut canvas = Canvas::new(config.width, config.height);
    let has_colorbar = matches!(figure.kind, PlotKind::Heatmap { .. });
    let plot = plot_area(config, has_colorbar);

    let (x_scale, y_scale, extra) = match &figure.kind {
        PlotKind::Waveform {
            envelope,
            duration_s,
        } => draw_waveform(&mut canvas, plot, envelope, *duration_s),
        PlotKind::Line { x, y, log_y } => draw_line_plot(&mut canvas, plot, x, y, *log_y),
        PlotKind::Heatmap {
            values,
            duration_s,
            y_axis,
            colorbar_unit,
        } => draw_heatmap(
            &mut canvas,
            plot,
            values,
            *duration_s,
            *y_axis,
            colorbar_unit.as_deref(),
        ),
    };

    canvas.stroke_rect(plot, BLACK);
    draw_x_ticks(&mut canvas, plot, &x_scale);
    draw_y_ticks(&mut canvas, plot, &y_scale);

    let mut description = format!(
        "x: {} {}; y: {} {}",
        figure.x_label,
        describe_scale(&x_scale),
        figure.y_label,
        describe_scale(&y_scale)
    );
    if let Some(extra) = extra {
        description.push_str("; ");
        description.push_str(&extra);
    }

    Ok((canvas.into_image(), description))
}

fn plot_area(config: &RenderConfig, has_colorbar: bool) -> Rect {
    let right_margin = if has_colorbar {
        MARGIN_RIGHT + COLORBAR_GAP + COLORBAR_WIDTH + COLORBAR_TICK_ROOM
    } else {
        MARGIN_RIGHT
    };
    Rect {
        x: MARGIN_LEFT,
        y: MARGIN_TOP,
        width: config.width.saturating_sub(MARGIN_LEFT + right_margin).max(1),
        height: config.height.saturating_sub(MARGIN_TOP + MARGIN_BOTTOM).max(1),
    }
}

fn describe_scale(axis: &Scale) -> String {
    let (min, max) = axis.bounds();
    let range = format!("[{}, {}]", scale::format_tick(min), scale::format_tick(max));
    match axis {
        Scale::Linear { .. } => range,
        Scale::Log { .. } => format!("{} log", range),
    }
}

type Drawn = (Scale, Scale, Option<String>);

fn draw_waveform(
    canvas: &mut Canvas,
    plot: Rect,
    envelope: &WaveformEnvelope,
    duration_s: f32,
) -> Drawn {
    let x_scale = Scale::Linear {
        min: 0.0,
        max: if duration_s > 0.0 { duration_s } else { 1.0 },
    };
    let peak = envelope.peak_amplitude();
    let limit = if peak > 0.0 { peak * 1.05 } else { 1.0 };
    let y_scale = Scale::Linear {
        min: -limit,
        max: limit,
    };

    let n = envelope.len();
    for (i, point) in envelope.points.iter().enumerate() {
        let x0 = plot.x_at(i as f32 / n as f32);
        let x1 = plot.x_at((i + 1) as f32 / n as f32).max(x0 + 1);
        let top = y_scale.fraction(point.max).map(|f| plot.y_at(f));
        let bottom = y_scale.fraction(point.min).map(|f| plot.y_at(f));
        if let (Some(top), Some(bottom)) = (top, bottom) {
            for x in x0..x1 {
                canvas.vline(x, top, bottom, LINE_BLUE);
            }
        }
    }

    (x_scale, y_scale, None)
}

fn draw_line_plot(canvas: &mut Canvas, plot: Rect, x: &[f32], y: &[f32], log_y: bool) -> Drawn {
    let x_scale = Scale::linear_padded(x);
    let y_scale = if log_y {
        Scale::log_padded(y)
    } else {
        Scale::linear_padded(y)
    };

    let mut previous: Option<(i64, i64)> = None;
    for (&xv, &yv) in x.iter().zip(y) {
        let point = match (x_scale.fraction(xv), y_scale.fraction(yv)) {
            (Some(fx), Some(fy)) => Some((plot.x_at(fx), plot.y_at(fy))),
            _ => None,
        };
        match (previous, point) {
            (Some(from), Some(to)) => canvas.thick_line(from, to, LINE_THICKNESS, LINE_BLUE),
            (None, Some(to)) => canvas.thick_line(to, to, LINE_THICKNESS, LINE_BLUE),
            _ => {}
        }
        previous = point;
    }

    (x_scale, y_scale, None)
}

fn draw_heatmap(
    canvas: &mut Canvas,
    plot: Rect,
    values: &Array2<f32>,
    duration_s: f32,
    y_axis: YAxis,
    colorbar_unit: Option<&str>,
) -> Drawn {
    let (rows, cols) = values.dim();
    let x_scale = Scale::Linear {
        min: 0.0,
        max: if duration_s > 0.0 { duration_s } else { 1.0 },
    };
    let y_scale = match y_axis {
        YAxis::LogFrequency { max_hz } if rows > 1 && max_hz > 0.0 => {
            let spacing = max_hz / (rows - 1) as f32;
            Scale::Log {
                min: spacing,
                max: max_hz,
            }
        }
        _ => Scale::Linear {
            min: 0.0,
            max: rows.max(1) as f32,
        },
    };

    let (vmin, vmax) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let (vmin, vmax) = if vmin > vmax {
        (0.0, 1.0)
    } else if vmax - vmin <= f32::EPSILON * vmax.abs().max(1.0) {
        (vmin - 0.5, vmax + 0.5)
    } else {
        (vmin, vmax)
    };
    let cmap = Colormap::for_data(values.iter());

    if rows > 0 && cols > 0 {
        let col_of: Vec<usize> = (0..plot.width)
            .map(|px| {
                let frac = (px as f32 + 0.5) / plot.width as f32;
                ((frac * cols as f32) as usize).min(cols - 1)
            })
            .collect();
        let row_of: Vec<usize> = (0..plot.height)
            .map(|py| {
                let frac = 1.0 - (py as f32 + 0.5) / plot.height as f32;
                match y_scale {
                    Scale::Log { max, .. } => {
                        let spacing = max / (rows - 1) as f32;
                        let hz = y_scale.value_at(frac);
                        ((hz / spacing).round() as usize).min(rows - 1)
                    }
                    Scale::Linear { .. } => ((frac * rows as f32) as usize).min(rows - 1),
                }
            })
            .collect();

        for (py, &row) in row_of.iter().enumerate() {
            for (px, &col) in col_of.iter().enumerate() {
                let t = (values[[row, col]] - vmin) / (vmax - vmin);
                canvas.put(
                    (plot.x + px as u32) as i64,
                    (plot.y + py as u32) as i64,
                    cmap.sample(t),
                );
            }
        }
    }

    let bar = Rect {
        x: plot.right() + COLORBAR_GAP,
        y: plot.y,
        width: COLORBAR_WIDTH,
        height: plot.height,
    };
    draw_colorbar(canvas, bar, cmap, vmin, vmax);

    let unit = colorbar_unit.map(|u| format!(" {}", u)).unwrap_or_default();
    let extra = format!(
        "colorbar{}: [{}, {}] {}",
        unit,
        scale::format_tick(vmin),
        scale::format_tick(vmax),
        cmap.name()
    );
    (x_scale, y_scale, Some(extra))
}

fn draw_colorbar(canvas: &mut Canvas, bar: Rect, cmap: Colormap, vmin: f32, vmax: f32) {
    for py in 0..bar.height {
        let frac = 1.0 - (py as f32 + 0.5) / bar.height as f32;
        let color = cmap.sample(frac);
        canvas.hline(
            bar.x as i64,
            bar.right() as i64 - 1,
            (bar.y + py) as i64,
            color,
        );
    }
    canvas.stroke_rect(bar, BLACK);

    let scale = Scale::Linear {
        min: vmin,
        max: vmax,
    };
    for tick in scale.ticks(6) {
        if let Some(frac) = scale.fraction(tick).filter(|f| (0.0..=1.0).contains(f)) {
            let y = bar.y_at(frac);
            let x = bar.right() as i64;
            canvas.hline(x, x + TICK_LENGTH - 1, y, BLACK);
        }
    }
}

fn draw_x_ticks(canvas: &mut Canvas, plot: Rect, scale: &Scale) {
    let bottom = plot.bottom() as i64;
    for tick in scale.ticks(10) {
        if let Some(frac) = scale.fraction(tick).filter(|f| (0.0..=1.0).contains(f)) {
            let x = plot.x_at(frac);
            canvas.vline(x, bottom, bottom + TICK_LENGTH - 1, BLACK);
        }
    }
}

fn draw_y_ticks(canvas: &mut Canvas, plot: Rect, scale: &Scale) {
    let left = plot.x as i64;
    for tick in scale.ticks(6) {
        if let Some(frac) = scale.fraction(tick).filter(|f| (0.0..=1.0).contains(f)) {
            let y = plot.y_at(frac);
            canvas.hline(left - TICK_LENGTH, left - 1, y, BLACK);
        }
    }
}

fn encode_png(image: &RgbImage, title: &str, description: &str) -> Result<Vec<u8>> {
    let render_err = |e: png::EncodingError| Error::Render(e.to_string());

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .add_itxt_chunk("Title".to_string(), title.to_string())
            .map_err(render_err)?;
        encoder
            .add_itxt_chunk("Description".to_string(), description.to_string())
            .map_err(render_err)?;
        encoder
            .add_text_chunk(
                "Software".to_string(),
                format!("audiofeat {}", crate::VERSION),
            )
            .map_err(render_err)?;

        let mut writer = encoder.write_header().map_err(render_err)?;
        writer.write_image_data(image.as_raw()).map_err(render_err)?;
        writer.finish().map_err(render_err)?;
    }
    Ok(buf)
}
