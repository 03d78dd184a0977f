use chrono::NaiveDate;
use satwatch_domain::entities::market_report::MarketReport;
use satwatch_domain::repositories::chart::ChartWriter;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryMeta {
    pub generated_at: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub success_count: usize,
    pub total_count: usize,
}

/// Machine-readable tally of one run; `metrics` is whatever per-metric summary the caller keeps.
pub fn write_summary_json<T: Serialize>(
    path: &Path,
    meta: &SummaryMeta,
    metrics: &[T],
) -> Result<(), String> {
    let metrics = serde_json::to_value(metrics)
        .map_err(|err| format!("failed to serialize metric summaries: {err}"))?;
    let json = serde_json::json!({
        "generated_at": meta.generated_at,
        "window": {
            "start": meta.window_start.to_string(),
            "end": meta.window_end.to_string(),
        },
        "success_count": meta.success_count,
        "total_count": meta.total_count,
        "metrics": metrics,
    });
    let json = serde_json::to_string_pretty(&json)
        .map_err(|err| format!("failed to serialize summary: {err}"))?;
    ensure_parent(path)?;
    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create summary: {err}"))?;
    file.write_all(json.as_bytes())
        .map_err(|err| format!("failed to write summary: {err}"))
}

/// Renders the market report as a single self-contained HTML page drawn on `<canvas>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlDashboardWriter;

impl ChartWriter for HtmlDashboardWriter {
    fn write_chart(&self, path: &Path, report: &MarketReport) -> Result<(), String> {
        let start = std::time::Instant::now();
        let html = render_dashboard_html(report)?;
        ensure_parent(path)?;
        let mut file =
            fs::File::create(path).map_err(|err| format!("failed to create html: {err}"))?;
        file.write_all(html.as_bytes())
            .map_err(|err| format!("failed to write html: {err}"))?;
        tracing::info!(
            path = %path.display(),
            panels = report.panels.len() + report.correlations.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "dashboard written"
        );
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<(), String> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {err}", parent.display())),
        _ => Ok(()),
    }
}

pub fn render_dashboard_html(report: &MarketReport) -> Result<String, String> {
    // `</` inside embedded JSON would close the script element early.
    let report_json = serde_json::to_string(report)
        .map_err(|err| format!("failed to serialize market report: {err}"))?
        .replace("</", "<\\/");
    let signal = report
        .latest_signal
        .map(|class| class.label().to_string())
        .unwrap_or_else(|| "n/a".to_string());

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>Bitcoin Market Analysis</title>
  <style>
    body {{ font-family: ui-sans-serif, system-ui; padding: 24px; background: #fafafa; }}
    code {{ background: #f2f2f2; padding: 2px 6px; border-radius: 4px; }}
    .grid {{ display: grid; grid-template-columns: 1fr 1fr; gap: 16px; align-items: start; }}
    .card {{ border: 1px solid #ddd; border-radius: 10px; padding: 16px; background: #fff; }}
    .wide {{ grid-column: 1 / span 2; }}
    canvas {{ width: 100%; height: 260px; border: 1px solid #eee; border-radius: 8px; }}
    canvas.tall {{ height: 420px; }}
    .muted {{ color: #666; }}
    .legend span {{ margin-right: 12px; font-size: 12px; }}
  </style>
</head>
<body>
  <h1>Bitcoin Market Analysis</h1>
  <p class="muted">
    generated: <code>{generated_at}</code> window: <code>{window_start}</code> to <code>{window_end}</code>
    metrics: <code>{success}/{total}</code> latest signal: <code>{signal}</code>
  </p>
  <div class="grid" id="panels"></div>

  <script>
    const report = {report_json};
    const palette = ['#2b6cb0', '#dd6b20', '#38a169', '#805ad5', '#d53f8c', '#319795', '#718096'];
    const bandColors = {{
      strong_sell: 'rgba(229, 62, 62, 0.22)',
      sell: 'rgba(229, 62, 62, 0.10)',
      neutral: 'rgba(0, 0, 0, 0)',
      buy: 'rgba(56, 161, 105, 0.10)',
      strong_buy: 'rgba(56, 161, 105, 0.22)'
    }};

    function card(title, wide, tall) {{
      const div = document.createElement('div');
      div.className = wide ? 'card wide' : 'card';
      const h = document.createElement('h2');
      h.textContent = title;
      const legend = document.createElement('div');
      legend.className = 'legend';
      const canvas = document.createElement('canvas');
      if (tall) canvas.className = 'tall';
      div.appendChild(h);
      div.appendChild(legend);
      div.appendChild(canvas);
      document.getElementById('panels').appendChild(div);
      return {{ canvas, legend }};
    }}

    function drawLines(target, dates, lines, opts) {{
      const canvas = target.canvas;
      const ctx = canvas.getContext('2d');
      const dpr = window.devicePixelRatio;
      const w = canvas.width = canvas.clientWidth * dpr;
      const h = canvas.height = canvas.clientHeight * dpr;
      ctx.clearRect(0, 0, w, h);
      target.legend.innerHTML = '';

      const values = [];
      for (const line of lines) for (const v of line.values) if (v !== null) values.push(v);
      if (dates.length < 2 || values.length === 0) {{
        ctx.fillStyle = '#666';
        ctx.fillText('no data', 10, 20);
        return;
      }}

      let minV = Math.min(...values), maxV = Math.max(...values);
      if (opts.yRange) {{ minV = opts.yRange[0]; maxV = opts.yRange[1]; }}
      const pad = 24 * dpr;
      const x0 = pad, y0 = pad, x1 = w - pad, y1 = h - pad;
      const x = i => x0 + (i / (dates.length - 1)) * (x1 - x0);
      const y = v => maxV === minV ? (y0 + y1) / 2 : y1 - ((v - minV) / (maxV - minV)) * (y1 - y0);

      if (opts.bands) {{
        const step = (x1 - x0) / (dates.length - 1);
        opts.bands.forEach((cls, i) => {{
          ctx.fillStyle = bandColors[cls] || bandColors.neutral;
          ctx.fillRect(x(i) - step / 2, y0, step, y1 - y0);
        }});
      }}
      for (const level of opts.levels || []) {{
        ctx.strokeStyle = '#bbb';
        ctx.setLineDash([4 * dpr, 4 * dpr]);
        ctx.beginPath();
        ctx.moveTo(x0, y(level));
        ctx.lineTo(x1, y(level));
        ctx.stroke();
        ctx.setLineDash([]);
      }}

      lines.forEach((line, n) => {{
        const color = palette[n % palette.length];
        ctx.strokeStyle = color;
        ctx.lineWidth = (n === 0 ? 2 : 1.5) * dpr;
        ctx.beginPath();
        let pen = false;
        line.values.forEach((v, i) => {{
          if (v === null) {{ pen = false; return; }}
          if (pen) ctx.lineTo(x(i), y(v)); else ctx.moveTo(x(i), y(v));
          pen = true;
        }});
        ctx.stroke();
        const label = document.createElement('span');
        label.style.color = color;
        label.textContent = line.label;
        target.legend.appendChild(label);
      }});

      ctx.fillStyle = '#666';
      ctx.font = `${{10 * dpr}}px sans-serif`;
      ctx.fillText(maxV.toFixed(2), 2, y0);
      ctx.fillText(minV.toFixed(2), 2, y1);
      ctx.fillText(dates[0], x0, h - 4);
      ctx.fillText(dates[dates.length - 1], x1 - 70 * dpr, h - 4);
      if (opts.yLabel) ctx.fillText(opts.yLabel, x0 + 4, y0 + 12 * dpr);
    }}

    const draws = [];
    const p = report.price;
    if (p) {{
      const main = card(p.title, true, true);
      const priceLines = [{{ label: 'BTC Price', values: p.close }}].concat(p.moving_averages);
      draws.push(() => drawLines(main, p.dates, priceLines, {{ bands: p.signals }}));
      const rsi = card('RSI', false, false);
      draws.push(() => drawLines(rsi, p.dates, [{{ label: 'RSI', values: p.rsi }}], {{ yRange: [0, 100], levels: [30, 70] }}));
      const macd = card('MACD', false, false);
      draws.push(() => drawLines(macd, p.dates, [
        {{ label: 'MACD', values: p.macd }},
        {{ label: 'Signal', values: p.macd_signal }},
        {{ label: 'Histogram', values: p.macd_histogram }}
      ], {{ levels: [0] }}));
    }}
    for (const panel of report.correlations.concat(report.panels)) {{
      const target = card(panel.title, false, false);
      draws.push(() => drawLines(target, panel.dates, panel.lines, {{ yRange: panel.y_range, yLabel: panel.y_label }}));
    }}

    const redraw = () => draws.forEach(draw => draw());
    redraw();
    window.addEventListener('resize', redraw);
  </script>
</body>
</html>"#,
        generated_at = report.generated_at,
        window_start = report.window_start,
        window_end = report.window_end,
        success = report.success_count,
        total = report.total_count,
    ))
}
