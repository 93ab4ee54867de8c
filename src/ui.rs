//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).  Each frame reads the feed caches
//! through their non-blocking `get`, so drawing never waits on the network.
//!
//! ## For contributors
//!
//! * The layout is a three-row split: tab bar, the selected page, and a
//!   one-line status bar.
//! * Every feed is drawn by [`panel`], which handles the shared states
//!   (waiting, in flight, stale with error).  A page only supplies the lines
//!   for a decoded value.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, Tab};
use crate::cache::CachedValue;
use crate::source::{
    DifficultyAdjustment, FearGreed, HistoricalPrice, LongShortRatio, MiningStats, SpotPrice,
};

/// Draw the complete UI for one frame.
pub fn draw(app: &App, frame: &mut Frame) {
    let [tabs_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let now = Utc::now();
    draw_tabs(app, frame, tabs_area);
    match app.tab {
        Tab::Market => draw_market(app, frame, main_area, now),
        Tab::Futures => draw_futures(app, frame, main_area, now),
        Tab::Mining => draw_mining(app, frame, main_area, now),
    }
    draw_status_bar(app, frame, status_area);
}

fn draw_tabs(app: &App, frame: &mut Frame, area: Rect) {
    let titles: Vec<String> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{} {}", i + 1, t.title()))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(Block::default().borders(Borders::ALL).title(" BTC Pulse "))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, area);
}

/// Split `area` into equal rows and render one panel per row.
fn draw_panels(frame: &mut Frame, area: Rect, panels: Vec<Paragraph<'static>>) {
    let rows = Layout::vertical(vec![Constraint::Fill(1); panels.len()]).split(area);
    for (panel, row) in panels.into_iter().zip(rows.iter()) {
        frame.render_widget(panel, *row);
    }
}

fn draw_market(app: &App, frame: &mut Frame, area: Rect, now: DateTime<Utc>) {
    let spot = app.feeds.spot_price.get();
    let year_ago = app.feeds.price_year_ago.get();
    let currency = app.feeds.price_year_ago.descriptor().params.currency.clone();
    let spot_price = spot.value().map(|s| s.price);

    draw_panels(
        frame,
        area,
        vec![
            panel("Spot price", &spot, now, spot_lines),
            panel("Price 1y ago", &year_ago, now, |h| year_ago_lines(h, &currency, spot_price)),
            panel("Fear & Greed", &app.feeds.fear_greed.get(), now, fear_greed_lines),
        ],
    );
}

fn draw_futures(app: &App, frame: &mut Frame, area: Rect, now: DateTime<Utc>) {
    draw_panels(
        frame,
        area,
        vec![
            panel("Long/short accounts", &app.feeds.global_long_short.get(), now, ratio_lines),
            panel("Top trader positions", &app.feeds.top_trader_positions.get(), now, ratio_lines),
        ],
    );
}

fn draw_mining(app: &App, frame: &mut Frame, area: Rect, now: DateTime<Utc>) {
    draw_panels(
        frame,
        area,
        vec![
            panel("Hashrate", &app.feeds.hashrate.get(), now, mining_lines),
            panel("Difficulty adjustment", &app.feeds.difficulty.get(), now, adjustment_lines),
        ],
    );
}

/// Render one feed: its value, its age, and any error next to it.
fn panel<T>(
    label: &str,
    snap: &CachedValue<T>,
    now: DateTime<Utc>,
    body: impl FnOnce(&T) -> Vec<Line<'static>>,
) -> Paragraph<'static> {
    let mut title = format!(" {label} ");
    if let Some(at) = snap.fetched_at() {
        title.push_str(&format!("· {} ", format_age(now - at)));
    }
    if snap.in_flight() {
        title.push_str("… ");
    }

    let mut lines = match snap.value() {
        Some(value) => body(value),
        None => vec![Line::styled("waiting for data", Style::default().fg(Color::DarkGray))],
    };

    let border = match snap.error() {
        Some(e) => {
            let prefix = if snap.is_available() { "stale" } else { "unavailable" };
            lines.push(Line::styled(
                format!("⚠ {prefix}: {e}"),
                Style::default().fg(Color::Red),
            ));
            Style::default().fg(Color::Red)
        }
        None => Style::default(),
    };

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title).border_style(border))
        .wrap(Wrap { trim: true })
}

// ---------------------------------------------------------------------------
// Per-record lines
// ---------------------------------------------------------------------------

fn spot_lines(spot: &SpotPrice) -> Vec<Line<'static>> {
    let mut headline = vec![Span::styled(
        format_money(spot.price, &spot.currency),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(change) = spot.change_24h {
        headline.push(Span::raw("  "));
        headline.push(Span::styled(format!("{} (24h)", signed_pct(change)), trend_style(change)));
    }

    let mut lines = vec![Line::from(headline)];
    let cap = spot.market_cap.map(format_compact).unwrap_or_else(|| "n/a".into());
    let vol = spot.volume_24h.map(format_compact).unwrap_or_else(|| "n/a".into());
    lines.push(Line::raw(format!("Market cap {cap}  ·  24h volume {vol}")));
    lines
}

fn year_ago_lines(hist: &HistoricalPrice, currency: &str, spot: Option<f64>) -> Vec<Line<'static>> {
    let Some(then) = hist.price_in(currency) else {
        return vec![Line::raw(format!("no {} price for that day", currency.to_uppercase()))];
    };
    let mut spans = vec![Span::raw(format_money(then, currency))];
    if let Some(now) = spot.filter(|_| then > 0.0) {
        let change = (now - then) / then * 100.0;
        spans.push(Span::raw("  "));
        spans.push(Span::styled(format!("{} since", signed_pct(change)), trend_style(change)));
    }
    vec![Line::from(spans)]
}

fn fear_greed_lines(fg: &FearGreed) -> Vec<Line<'static>> {
    let latest = fg.latest();
    let colour = match latest.value {
        0..=24 => Color::Red,
        25..=49 => Color::LightRed,
        50..=74 => Color::LightGreen,
        _ => Color::Green,
    };
    let filled = (usize::from(latest.value) / 5).min(20);
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled));

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{} · {}", latest.value, latest.classification),
                Style::default().fg(colour).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(bar, Style::default().fg(colour)),
        ]),
    ];
    if let Some(change) = fg.change() {
        lines.push(Line::raw(format!("{change:+} vs previous reading")));
    }
    if let Some(next) = fg.next_update {
        let next = chrono::Duration::from_std(next).unwrap_or_else(|_| chrono::Duration::zero());
        lines.push(Line::raw(format!("next reading in {}", format_span(next))));
    }
    lines
}

fn ratio_lines(ratio: &LongShortRatio) -> Vec<Line<'static>> {
    let latest = ratio.latest();
    vec![
        Line::from(vec![
            Span::styled(
                format!("Ratio {:.2}", latest.ratio),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(format!("drift {:+.2}", ratio.drift()), trend_style(ratio.drift())),
        ]),
        Line::from(vec![
            Span::styled(
                format!("Long {:.1}%", latest.long_share * 100.0),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  |  "),
            Span::styled(
                format!("Short {:.1}%", latest.short_share * 100.0),
                Style::default().fg(Color::Red),
            ),
        ]),
        Line::styled(
            format!("{} · as of {}", ratio.symbol, latest.timestamp.format("%H:%M UTC")),
            Style::default().fg(Color::DarkGray),
        ),
    ]
}

fn mining_lines(stats: &MiningStats) -> Vec<Line<'static>> {
    vec![
        Line::styled(
            format!("{:.1} EH/s", stats.hashrate_ehs()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::raw(format!("Difficulty {}", format_compact(stats.current_difficulty))),
        Line::styled(
            format!("{} daily samples", stats.samples.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]
}

fn adjustment_lines(adj: &DifficultyAdjustment) -> Vec<Line<'static>> {
    vec![
        Line::raw(format!("Epoch progress {:.1}%", adj.progress_percent)),
        Line::from(vec![
            Span::raw("Estimated change "),
            Span::styled(signed_pct(adj.difficulty_change), trend_style(adj.difficulty_change)),
            Span::raw(format!("  (previous {})", signed_pct(adj.previous_retarget))),
        ]),
        Line::raw(format!(
            "{} blocks left · ~{} · height {}",
            adj.remaining_blocks,
            format_span(adj.remaining_time),
            adj.next_retarget_height
        )),
        Line::styled(
            format!("ETA {}", adj.estimated_retarget.format("%Y-%m-%d %H:%M UTC")),
            Style::default().fg(Color::DarkGray),
        ),
    ]
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let (auto, auto_colour) = if app.feeds.is_auto_refreshing() {
        ("auto: on", Color::Green)
    } else {
        ("auto: paused", Color::Red)
    };
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(app.status.clone(), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(auto, Style::default().fg(auto_colour)),
        Span::raw("  q: quit  Tab/←/→: page  r: refresh  p: pause"),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn trend_style(change: f64) -> Style {
    if change >= 0.0 {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    }
}

fn signed_pct(v: f64) -> String {
    format!("{v:+.2}%")
}

/// `1234567.891` -> `1,234,567.89`
fn group_thousands(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

fn format_money(v: f64, currency: &str) -> String {
    match currency.to_ascii_lowercase().as_str() {
        "usd" => format!("${}", group_thousands(v)),
        "eur" => format!("€{}", group_thousands(v)),
        "gbp" => format!("£{}", group_thousands(v)),
        other => format!("{} {}", group_thousands(v), other.to_uppercase()),
    }
}

/// Large magnitudes with a T/B/M suffix.
fn format_compact(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e12 {
        format!("{:.2}T", v / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else {
        format!("{v:.2}")
    }
}

fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// Coarse two-unit duration such as `7d 17h` or `12m`.
fn format_span(span: chrono::Duration) -> String {
    let secs = span.num_seconds().max(0);
    let (d, h, m) = (secs / 86_400, secs % 86_400 / 3600, secs % 3600 / 60);
    if d > 0 {
        format!("{d}d {h}h")
    } else if h > 0 {
        format!("{h}h {m}m")
    } else {
        format!("{m}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use crate::cache::tests::MockSource;
    use crate::config::Config;
    use crate::error::FetchError;
    use crate::feeds::Feeds;

    fn render(app: &App) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    fn app_with(source: std::sync::Arc<MockSource>) -> App {
        App::new(Feeds::new(&Config::default(), source))
    }

    // -- rendering (smoke tests) ---------------------------------------------

    #[test]
    fn draw_every_tab_with_no_data() {
        let mut app = app_with(MockSource::new(Duration::ZERO));
        for i in 0..Tab::ALL.len() {
            app.select_tab(i);
            let text = render(&app);
            assert!(text.contains("waiting for data"), "tab {i}");
        }
    }

    #[test]
    fn status_bar_shows_paused_when_not_polling() {
        let app = app_with(MockSource::new(Duration::ZERO));
        let text = render(&app);
        assert!(text.contains("auto: paused"));
    }

    #[tokio::test]
    async fn draw_market_with_price() {
        let source = MockSource::new(Duration::ZERO);
        source.push(Ok(br#"{"bitcoin":{"usd":50000,"usd_24h_change":2.5}}"#.to_vec()));
        let app = app_with(source);
        app.feeds.spot_price.refresh(true).await.unwrap();

        let text = render(&app);
        assert!(text.contains("$50,000.00"), "price rendered");
        assert!(text.contains("+2.50% (24h)"));
    }

    #[tokio::test]
    async fn stale_value_is_drawn_with_error() {
        let source = MockSource::new(Duration::ZERO);
        source.push(Ok(br#"{"bitcoin":{"usd":50000}}"#.to_vec()));
        source.push(Err(FetchError::HttpStatus(503)));
        let app = app_with(source);
        app.feeds.spot_price.refresh(true).await.unwrap();
        let _ = app.feeds.spot_price.refresh(true).await;

        let text = render(&app);
        assert!(text.contains("$50,000.00"), "last known value still shown");
        assert!(text.contains("stale: HTTP status 503"));
    }

    #[tokio::test]
    async fn draw_futures_with_ratio() {
        let source = MockSource::new(Duration::ZERO);
        source.push(Ok(br#"[{"symbol":"BTCUSDT","longShortRatio":"1.5","longAccount":"0.6","shortAccount":"0.4","timestamp":1767225900000}]"#.to_vec()));
        let mut app = app_with(source);
        app.feeds.global_long_short.refresh(true).await.unwrap();
        app.select_tab(1);

        let text = render(&app);
        assert!(text.contains("Ratio 1.50"));
        assert!(text.contains("Long 60.0%"));
    }

    // -- formatting ----------------------------------------------------------

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0.5), "0.50");
        assert_eq!(group_thousands(999.999), "1,000.00");
        assert_eq!(group_thousands(1_234_567.891), "1,234,567.89");
        assert_eq!(group_thousands(-42_000.0), "-42,000.00");
    }

    #[test]
    fn money_uses_currency_symbol() {
        assert_eq!(format_money(67_012.5, "usd"), "$67,012.50");
        assert_eq!(format_money(1.0, "EUR"), "€1.00");
        assert_eq!(format_money(10_000.0, "jpy"), "10,000.00 JPY");
    }

    #[test]
    fn compact_suffixes() {
        assert_eq!(format_compact(1.32e12), "1.32T");
        assert_eq!(format_compact(3.1e10), "31.00B");
        assert_eq!(format_compact(2_500_000.0), "2.50M");
        assert_eq!(format_compact(12.0), "12.00");
    }

    #[test]
    fn ages_and_spans() {
        assert_eq!(format_age(chrono::Duration::seconds(12)), "12s ago");
        assert_eq!(format_age(chrono::Duration::seconds(-3)), "0s ago");
        assert_eq!(format_age(chrono::Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(chrono::Duration::hours(30)), "1d ago");
        assert_eq!(format_span(chrono::Duration::milliseconds(665_977_000)), "7d 16h");
        assert_eq!(format_span(chrono::Duration::minutes(90)), "1h 30m");
        assert_eq!(format_span(chrono::Duration::seconds(30)), "0m");
    }
}
