use crate::config::DashboardConfig;
use crate::entry::{parse_links, summarize_links};
use crate::models::DailyRecord;
use crate::stats::{format_compact, kpis, last_days, summary};
use crate::storage::DISPLAY_DATE_FORMAT;
use chrono::NaiveDate;
use std::fmt::Write;

pub fn render_index(
    config: &DashboardConfig,
    today: NaiveDate,
    current: Option<&DailyRecord>,
    records: &[DailyRecord],
) -> String {
    let totals = summary(records);
    let rates = kpis(records);
    let palette = &config.palette;
    let palette_json = serde_json::to_string(palette).unwrap_or_else(|_| "{}".to_string());

    let (status, status_type) = match current {
        Some(_) => ("Today's numbers are recorded. Saving again overwrites them.", "ok"),
        None => ("Nothing recorded for today yet. Use the form below.", "info"),
    };
    let delete_form = if current.is_some() {
        r#"<form method="post" action="/today/delete" id="delete-form">
          <button class="btn-secondary" type="submit">Delete today's entry</button>
        </form>"#
    } else {
        ""
    };

    INDEX_HTML
        .replace("{{TITLE}}", &escape_html(&config.title))
        .replace("{{COLOR_OPENED}}", &palette.opened)
        .replace("{{COLOR_CLOSED}}", &palette.closed)
        .replace("{{COLOR_IN_PROGRESS}}", &palette.in_progress)
        .replace("{{COLOR_BACKGROUND}}", &palette.background)
        .replace("{{PALETTE_JSON}}", &palette_json)
        .replace("{{CHART_HEIGHT}}", &config.chart_height.to_string())
        .replace("{{DATE}}", &today.format(DISPLAY_DATE_FORMAT).to_string())
        .replace("{{STATUS}}", status)
        .replace("{{STATUS_TYPE}}", status_type)
        .replace("{{OPENED}}", &current.map_or(0, |r| r.opened).to_string())
        .replace("{{CLOSED}}", &current.map_or(0, |r| r.closed).to_string())
        .replace("{{IN_PROGRESS}}", &current.map_or(0, |r| r.in_progress).to_string())
        .replace("{{DELETE_FORM}}", delete_form)
        .replace("{{TOTAL_OPENED}}", &format_compact(totals.total_opened as f64))
        .replace("{{TOTAL_CLOSED}}", &format_compact(totals.total_closed as f64))
        .replace("{{RESOLUTION}}", &format!("{:.1}%", rates.resolution_rate))
        .replace("{{MEAN_IN_PROGRESS}}", &format!("{:.1}", totals.mean_in_progress))
        // User text goes in last, so no later pass can rewrite it.
        .replace("{{LINKS_TEXT}}", &escape_html(current.map_or("", |r| r.links.as_str())))
        .replace("{{LINKS_LIST}}", &render_links(current))
        .replace("{{RECENT_ROWS}}", &render_recent(records))
}

fn render_links(current: Option<&DailyRecord>) -> String {
    let links = current.map(|r| parse_links(&r.links)).unwrap_or_default();
    if links.is_empty() {
        return String::new();
    }

    let mut html = String::from("<ol class=\"links\">");
    for link in links {
        let target = escape_html(&link.target);
        if link.is_url {
            let _ = write!(html, "<li><a href=\"{target}\">Ticket {}</a></li>", link.index);
        } else {
            let _ = write!(html, "<li>{target}</li>");
        }
    }
    html.push_str("</ol>");
    html
}

fn render_recent(records: &[DailyRecord]) -> String {
    let recent = last_days(records, 7);
    if recent.is_empty() {
        return "<tr><td colspan=\"5\">No data yet</td></tr>".to_string();
    }

    let mut rows = String::new();
    for record in recent.iter().rev() {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            record.date.format(DISPLAY_DATE_FORMAT),
            record.opened,
            record.closed,
            record.in_progress,
            escape_html(&summarize_links(&record.links)),
        );
    }
    rows
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            other => out.push(other),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg: {{COLOR_BACKGROUND}};
      --ink: #23272f;
      --opened: {{COLOR_OPENED}};
      --closed: {{COLOR_CLOSED}};
      --in-progress: {{COLOR_IN_PROGRESS}};
      --card: white;
      --shadow: 0 18px 48px rgba(31, 119, 180, 0.12);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Segoe UI", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(980px, 100%);
      display: grid;
      gap: 24px;
    }

    header {
      background: linear-gradient(90deg, var(--opened), var(--closed));
      color: white;
      border-radius: 18px;
      padding: 20px 28px;
    }

    h1 {
      margin: 0;
      font-size: clamp(1.6rem, 3vw, 2.2rem);
    }

    .card {
      background: var(--card);
      border-radius: 18px;
      box-shadow: var(--shadow);
      padding: 24px;
      display: grid;
      gap: 16px;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .stat {
      border-radius: 14px;
      padding: 16px;
      border: 1px solid rgba(35, 39, 47, 0.08);
      display: grid;
      gap: 6px;
    }

    .stat .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: #7b8190;
    }

    .stat .value {
      font-size: 1.6rem;
      font-weight: 600;
    }

    .entry {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
      gap: 16px;
    }

    label {
      display: grid;
      gap: 6px;
      font-weight: 600;
    }

    input, textarea, select {
      font: inherit;
      padding: 10px 12px;
      border-radius: 10px;
      border: 1px solid rgba(35, 39, 47, 0.2);
    }

    textarea {
      min-height: 100px;
      grid-column: 1 / -1;
    }

    .actions {
      display: flex;
      flex-wrap: wrap;
      gap: 12px;
    }

    button, .button {
      appearance: none;
      border: none;
      border-radius: 10px;
      padding: 12px 18px;
      font-size: 1rem;
      font-weight: 600;
      cursor: pointer;
      text-decoration: none;
      background: linear-gradient(90deg, var(--opened), var(--closed));
      color: white;
    }

    .btn-secondary {
      background: #e8ebf0;
      color: var(--ink);
    }

    .status[data-type="ok"] {
      color: #2d7a4b;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .tabs {
      display: flex;
      gap: 6px;
    }

    .tab {
      background: #e8ebf0;
      color: var(--ink);
    }

    .tab.active {
      background: var(--opened);
      color: white;
    }

    #chart {
      width: 100%;
      height: {{CHART_HEIGHT}}px;
      display: block;
    }

    .chart-grid {
      stroke: rgba(35, 39, 47, 0.1);
    }

    .chart-label {
      fill: #7b8190;
      font-size: 11px;
    }

    .filter {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
      gap: 16px;
      align-items: end;
    }

    .report {
      display: flex;
      flex-wrap: wrap;
      gap: 18px;
      color: #4a5060;
    }

    .legend span {
      margin-right: 16px;
      font-weight: 600;
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    th, td {
      text-align: left;
      padding: 8px;
      border-bottom: 1px solid rgba(35, 39, 47, 0.08);
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>{{TITLE}}</h1>
      <p>Today: {{DATE}}</p>
    </header>

    <section class="card">
      <p class="status" id="status" data-type="{{STATUS_TYPE}}">{{STATUS}}</p>
      <form method="post" action="/today" id="entry-form" class="entry">
        <label>Tickets opened
          <input type="number" name="opened" min="0" value="{{OPENED}}" />
        </label>
        <label>Tickets closed
          <input type="number" name="closed" min="0" value="{{CLOSED}}" />
        </label>
        <label>Tickets in progress
          <input type="number" name="in_progress" min="0" value="{{IN_PROGRESS}}" />
        </label>
        <textarea name="links" placeholder="One link per line, or comma separated">{{LINKS_TEXT}}</textarea>
        <div class="actions">
          <button type="submit">Save</button>
        </div>
      </form>
      {{DELETE_FORM}}
      {{LINKS_LIST}}
    </section>

    <section class="panel">
      <div class="stat">
        <span class="label">Total opened</span>
        <span class="value" style="color: var(--opened)">{{TOTAL_OPENED}}</span>
      </div>
      <div class="stat">
        <span class="label">Total closed</span>
        <span class="value" style="color: var(--closed)">{{TOTAL_CLOSED}}</span>
      </div>
      <div class="stat">
        <span class="label">Resolution rate</span>
        <span class="value">{{RESOLUTION}}</span>
      </div>
      <div class="stat">
        <span class="label">Mean in progress</span>
        <span class="value" style="color: var(--in-progress)">{{MEAN_IN_PROGRESS}}</span>
      </div>
    </section>

    <section class="card">
      <div class="tabs" role="tablist">
        <button class="tab active" type="button" data-tab="recent">Last 7 days</button>
        <button class="tab" type="button" data-tab="all">All history</button>
        <button class="tab" type="button" data-tab="filtered">Filtered</button>
      </div>
      <div class="legend">
        <span style="color: var(--opened)">Opened</span>
        <span style="color: var(--closed)">Closed</span>
        <span style="color: var(--in-progress)">In progress</span>
      </div>
      <svg id="chart" viewBox="0 0 900 {{CHART_HEIGHT}}" role="img" aria-label="Ticket history"></svg>
    </section>

    <section class="card">
      <h2>Recent days</h2>
      <table>
        <thead>
          <tr><th>Date</th><th>Opened</th><th>Closed</th><th>In progress</th><th>Links</th></tr>
        </thead>
        <tbody>{{RECENT_ROWS}}</tbody>
      </table>
      <div class="actions">
        <a class="button" href="/api/export">Download CSV</a>
        <button class="btn-secondary" type="button" id="backup-btn">Create backup</button>
      </div>
    </section>

    <section class="card">
      <h2>Filter and report</h2>
      <form id="filter-form" class="filter">
        <label>From
          <input type="date" name="from" id="filter-from" />
        </label>
        <label>To
          <input type="date" name="to" id="filter-to" />
        </label>
        <label>Show
          <select name="category" id="filter-category">
            <option value="all">All days</option>
            <option value="with_opened">Days with opened tickets</option>
            <option value="with_closed">Days with closed tickets</option>
            <option value="with_in_progress">Days with tickets in progress</option>
          </select>
        </label>
        <div class="actions">
          <button type="submit">Apply</button>
        </div>
      </form>
      <div class="report" id="report"></div>
      <table>
        <thead>
          <tr><th>Date</th><th>Opened</th><th>Closed</th><th>In progress</th><th>Links</th></tr>
        </thead>
        <tbody id="filter-rows"></tbody>
      </table>
    </section>
  </main>

  <script>
    const chartEl = document.getElementById('chart');
    const statusEl = document.getElementById('status');
    const tabs = Array.from(document.querySelectorAll('.tab'));
    const palette = {{PALETTE_JSON}};
    const series = ['opened', 'closed', 'in_progress'].map((key) => ({ key, color: palette[key] }));

    let recent = [];
    let history = [];
    let filtered = [];
    let activeTab = 'recent';

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const renderChart = (rows) => {
      if (!rows.length) {
        chartEl.innerHTML = '<text class="chart-label" x="50%" y="50%" text-anchor="middle">No data yet</text>';
        return;
      }

      const width = 900;
      const height = {{CHART_HEIGHT}};
      const padX = 44;
      const padY = 34;
      const top = 20;
      const max = Math.max(1, ...rows.flatMap((row) => series.map((s) => row[s.key])));
      const xStep = rows.length > 1 ? (width - padX * 2) / (rows.length - 1) : 0;
      const x = (i) => padX + i * xStep;
      const y = (v) => height - padY - (v / max) * (height - top - padY);

      let svg = '';
      for (let i = 0; i <= 4; i += 1) {
        const value = (max * i) / 4;
        svg += `<line class="chart-grid" x1="${padX}" y1="${y(value)}" x2="${width - padX}" y2="${y(value)}" />`;
        svg += `<text class="chart-label" x="${padX - 8}" y="${y(value) + 4}" text-anchor="end">${Math.round(value)}</text>`;
      }
      series.forEach((s) => {
        const path = rows.map((row, i) => `${i === 0 ? 'M' : 'L'} ${x(i).toFixed(2)} ${y(row[s.key]).toFixed(2)}`).join(' ');
        svg += `<path d="${path}" fill="none" stroke="${s.color}" stroke-width="3" />`;
      });
      const labelEvery = Math.ceil(rows.length / 10);
      rows.forEach((row, i) => {
        if (i % labelEvery === 0) {
          svg += `<text class="chart-label" x="${x(i)}" y="${height - padY + 18}" text-anchor="middle">${row.date.slice(5)}</text>`;
        }
      });
      chartEl.innerHTML = svg;
    };

    const renderActiveTab = () => {
      const rows = { recent, all: history, filtered }[activeTab] || recent;
      renderChart(rows);
    };

    const selectTab = (name) => {
      activeTab = name;
      tabs.forEach((b) => b.classList.toggle('active', b.dataset.tab === name));
      renderActiveTab();
    };

    const displayDate = (iso) => iso.split('-').reverse().join('/');

    const renderFilteredRows = (rows) => {
      const body = document.getElementById('filter-rows');
      body.replaceChildren();
      if (!rows.length) {
        const tr = body.insertRow();
        const td = tr.insertCell();
        td.colSpan = 5;
        td.textContent = 'No records match this filter';
        return;
      }
      rows.forEach((row) => {
        const tr = body.insertRow();
        [displayDate(row.date), row.opened, row.closed, row.in_progress, row.links].forEach((value) => {
          tr.insertCell().textContent = String(value);
        });
      });
    };

    const renderReport = async (from, to) => {
      const reportEl = document.getElementById('report');
      reportEl.replaceChildren();
      if (!from || !to) {
        return;
      }
      const res = await fetch(`/api/report?${new URLSearchParams({ from, to })}`);
      if (res.status === 404) {
        reportEl.textContent = 'No records in this period';
        return;
      }
      if (!res.ok) {
        throw new Error(await res.text());
      }
      const report = await res.json();
      [
        `Period: ${report.period}`,
        `Days: ${report.days}`,
        `Opened: ${report.total_opened}`,
        `Closed: ${report.total_closed}`,
        `Mean in progress: ${report.mean_in_progress.toFixed(1)}`,
        `Busiest day: ${displayDate(report.busiest_day)}`,
        `Peak opened: ${report.peak_opened}`,
        `Peak closed: ${report.peak_closed}`,
      ].forEach((text) => {
        const span = document.createElement('span');
        span.textContent = text;
        reportEl.appendChild(span);
      });
    };

    const applyFilter = async () => {
      const from = document.getElementById('filter-from').value;
      const to = document.getElementById('filter-to').value;
      const category = document.getElementById('filter-category').value;
      const params = new URLSearchParams({ category });
      if (from) params.set('from', from);
      if (to) params.set('to', to);

      const res = await fetch(`/api/records?${params}`);
      if (!res.ok) {
        throw new Error(await res.text());
      }
      filtered = (await res.json()).records;
      renderFilteredRows(filtered);
      selectTab('filtered');
      await renderReport(from, to);
    };

    const refresh = async () => {
      const [statsRes, recordsRes] = await Promise.all([fetch('/api/stats'), fetch('/api/records')]);
      if (!statsRes.ok || !recordsRes.ok) {
        throw new Error('Unable to load history');
      }
      recent = (await statsRes.json()).last_7_days;
      history = (await recordsRes.json()).records;
      renderActiveTab();
    };

    tabs.forEach((button) => {
      button.addEventListener('click', () => selectTab(button.dataset.tab));
    });

    document.getElementById('filter-form').addEventListener('submit', (event) => {
      event.preventDefault();
      applyFilter().catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('backup-btn').addEventListener('click', async () => {
      const res = await fetch('/api/backup', { method: 'POST' });
      if (res.ok) {
        setStatus(`Backup written: ${(await res.json()).file_name}`, 'ok');
      } else {
        setStatus(await res.text(), 'error');
      }
    });

    refresh().catch((err) => setStatus(err.message, 'error'));
  </script>
</body>
</html>
"#;
