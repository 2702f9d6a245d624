mod tui_app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Gauge, Paragraph, Row, Table},
    Frame, Terminal,
};
use tui_app::{
    format_money, format_pct, short_month, truncate, AppState, ConnectionStatus, Figure,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(10);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Char('e') | KeyCode::Char('E') => {
                            app.export(client).await;
                        }
                        KeyCode::Right | KeyCode::Char('l') => {
                            if app.select_next() {
                                app.refresh_report(client).await;
                            }
                        }
                        KeyCode::Left | KeyCode::Char('h') => {
                            if app.select_prev() {
                                app.refresh_report(client).await;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let area = f.area();

    // Outer vertical split: header | cards | goal | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(4), // cards
            Constraint::Length(5), // goal
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_cards(f, app, chunks[1]);
    render_goal(f, app, chunks[2]);
    render_body(f, app, chunks[3]);
    render_footer(f, app, chunks[4]);
}

fn bordered(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let month = app.selected_month().unwrap_or("—");
    let position = if app.months.is_empty() {
        "0/0".to_string()
    } else {
        format!("{}/{}", app.selected + 1, app.months.len())
    };

    let title_spans = vec![
        Span::styled(
            " Sales Dashboard  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("◀ {month} ▶"),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" ({position})"), Style::default().fg(Color::DarkGray)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} orders", app.summary.orders),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            truncate(&app.summary.source, 30),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans))
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_cards(f: &mut Frame, app: &AppState, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(area);

    let (revenue, profit, orders, ticket) = match &app.report {
        Some(r) => (
            format_money(r.total_revenue),
            format_money(r.total_profit),
            r.order_count.to_string(),
            r.average_ticket.show(format_money),
        ),
        None => ("—".into(), "—".into(), "—".into(), "—".into()),
    };

    let cards = [
        (" REVENUE ", revenue, Color::Green),
        (" GROSS PROFIT ", profit, Color::LightGreen),
        (" ORDERS ", orders, Color::White),
        (" AVG TICKET ", ticket, Color::Cyan),
    ];
    for ((title, value, color), slot) in cards.into_iter().zip(cols.iter()) {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .block(bordered(title));
        f.render_widget(paragraph, *slot);
    }
}

fn render_goal(f: &mut Frame, app: &AppState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let (ratio, label) = match &app.report {
        Some(r) => match (r.goal_progress.value(), &r.goal_amount) {
            (Some(p), Figure::Value(goal)) => (
                p.clamp(0.0, 1.0),
                format!(
                    "{} of {}",
                    r.goal_attainment_pct.show(format_pct),
                    format_money(*goal)
                ),
            ),
            _ => (0.0, format!("goal {}", r.goal_amount.show(format_money))),
        },
        None => (0.0, "—".to_string()),
    };
    let gauge_color = if ratio >= 1.0 {
        Color::Green
    } else if ratio >= 0.5 {
        Color::Yellow
    } else {
        Color::Red
    };
    let gauge = Gauge::default()
        .block(bordered(" GOAL "))
        .gauge_style(Style::default().fg(gauge_color).bg(Color::Black))
        .ratio(ratio)
        .label(label);
    f.render_widget(gauge, halves[0]);

    let lines = match &app.report {
        Some(r) => vec![
            Line::from(vec![
                Span::styled("shortfall   ", Style::default().fg(Color::DarkGray)),
                Span::raw(format_money(r.shortfall)),
            ]),
            Line::from(vec![
                Span::styled("orders left ", Style::default().fg(Color::DarkGray)),
                Span::raw(r.projected_orders_to_goal.show(|v| format!("{v:.0}"))),
            ]),
            Line::from(vec![
                Span::styled("forecast    ", Style::default().fg(Color::DarkGray)),
                Span::raw(r.forecast_next_month.show(format_money)),
            ]),
        ],
        None => vec![Line::from("—")],
    };
    f.render_widget(Paragraph::new(lines).block(bordered(" OUTLOOK ")), halves[1]);
}

fn render_body(f: &mut Frame, app: &AppState, area: Rect) {
    // Horizontal split: monthly revenue (55%) | technician ranking (45%)
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_monthly_chart(f, app, halves[0]);
    render_technician_table(f, app, halves[1]);
}

fn render_monthly_chart(f: &mut Frame, app: &AppState, area: Rect) {
    let labels: Vec<(String, u64)> = app
        .monthly
        .iter()
        .map(|m| (short_month(&m.month), m.total_revenue.max(0.0).round() as u64))
        .collect();
    let data: Vec<(&str, u64)> = labels.iter().map(|(l, v)| (l.as_str(), *v)).collect();

    let chart = BarChart::default()
        .block(bordered(" MONTHLY REVENUE "))
        .data(&data[..])
        .bar_width(6)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, area);
}

fn render_technician_table(f: &mut Frame, app: &AppState, area: Rect) {
    let header_cells = ["#", "Technician", "Profit", "Orders"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let ranking = app
        .report
        .as_ref()
        .map(|r| r.technician_profit.as_slice())
        .unwrap_or_default();

    let rows: Vec<Row> = ranking
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let profit_color = if t.gross_profit < 0.0 {
                Color::Red
            } else {
                Color::Green
            };
            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&t.technician, 20)),
                Cell::from(format_money(t.gross_profit)).style(Style::default().fg(profit_color)),
                Cell::from(t.order_count.to_string()).style(Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(16),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(bordered(" PROFIT BY TECHNICIAN "));

    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let mut spans = vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[←→ / h l] ", Style::default().fg(Color::Yellow)),
        Span::raw("month  "),
        Span::styled("[e] ", Style::default().fg(Color::Yellow)),
        Span::raw("export  "),
    ];
    match &app.notice {
        Some(n) => spans.push(Span::styled(truncate(n, 60), Style::default().fg(Color::Magenta))),
        None => spans.push(Span::styled(
            format!("report p99: {}", app.latency.report.p99_us.map_or("—".to_string(), |v| format!("{v}µs"))),
            Style::default().fg(Color::DarkGray),
        )),
    }
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
