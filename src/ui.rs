use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use name_reconciliation::compare::ComparisonReport;
use name_reconciliation::{canonicalize, MatchKind, RecordSummary};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Matched,
    OnlyDocument,
    OnlySpreadsheet,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Matched => Page::OnlyDocument,
            Page::OnlyDocument => Page::OnlySpreadsheet,
            Page::OnlySpreadsheet => Page::Matched,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Matched => Page::OnlySpreadsheet,
            Page::OnlyDocument => Page::Matched,
            Page::OnlySpreadsheet => Page::OnlyDocument,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Matched => "In Both",
            Page::OnlyDocument => "Only in Document",
            Page::OnlySpreadsheet => "Only in Spreadsheet",
        }
    }

    fn index(&self) -> usize {
        match self {
            Page::Matched => 0,
            Page::OnlyDocument => 1,
            Page::OnlySpreadsheet => 2,
        }
    }
}

/// One table row with everything the detail panel shows
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub name: String,
    pub operation_code: String,
    pub canonical_name: String,
    pub match_kind: Option<MatchKind>,
    pub partner: Option<String>,
    pub shared_tokens: Vec<String>,
    pub date: Option<NaiveDate>,
    pub line_number: Option<usize>,
}

pub struct App {
    pub report: ComparisonReport,
    pub rows: [Vec<ResultRow>; 3],
    pub states: [TableState; 3],
    pub current_page: Page,
    pub show_detail: bool,
}

impl App {
    pub fn new(report: ComparisonReport) -> Self {
        let rows = build_rows(&report);

        let states = [0, 1, 2].map(|i| {
            let mut state = TableState::default();
            if !rows[i].is_empty() {
                state.select(Some(0));
            }
            state
        });

        Self {
            report,
            rows,
            states,
            current_page: Page::Matched,
            show_detail: false,
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn current_rows(&self) -> &[ResultRow] {
        &self.rows[self.current_page.index()]
    }

    fn current_state(&mut self) -> &mut TableState {
        &mut self.states[self.current_page.index()]
    }

    pub fn selected_row(&self) -> Option<&ResultRow> {
        let i = self.states[self.current_page.index()].selected()?;
        self.current_rows().get(i)
    }

    fn select_clamped(&mut self, target: isize) {
        let len = self.current_rows().len();
        if len == 0 {
            return;
        }
        let i = target.clamp(0, len as isize - 1) as usize;
        self.current_state().select(Some(i));
    }

    pub fn next(&mut self) {
        let len = self.current_rows().len();
        if len == 0 {
            return;
        }
        let i = match self.current_state().selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.current_state().select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.current_rows().len();
        if len == 0 {
            return;
        }
        let i = match self.current_state().selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.current_state().select(Some(i));
    }

    pub fn page_down(&mut self) {
        let current = self.current_state().selected().unwrap_or(0) as isize;
        self.select_clamped(current + 20);
    }

    pub fn page_up(&mut self) {
        let current = self.current_state().selected().unwrap_or(0) as isize;
        self.select_clamped(current - 20);
    }

    pub fn home(&mut self) {
        self.select_clamped(0);
    }

    pub fn end(&mut self) {
        self.select_clamped(isize::MAX);
    }
}

fn document_row(report: &ComparisonReport, summary: &RecordSummary) -> ResultRow {
    let canonical_name = canonicalize(&summary.raw_name);
    let record = report.records.get(&canonical_name);

    ResultRow {
        name: summary.raw_name.clone(),
        operation_code: summary.operation_code.clone(),
        canonical_name,
        match_kind: None,
        partner: None,
        shared_tokens: Vec::new(),
        date: record.and_then(|r| r.date),
        line_number: record.map(|r| r.line_number),
    }
}

/// Flatten the report into the three page tables
pub fn build_rows(report: &ComparisonReport) -> [Vec<ResultRow>; 3] {
    let result = &report.result;

    let matched = result
        .matched
        .iter()
        .zip(&result.pairings)
        .map(|(summary, pairing)| ResultRow {
            match_kind: Some(pairing.kind),
            partner: Some(pairing.tabular_name.clone()),
            shared_tokens: pairing.shared_tokens.clone(),
            ..document_row(report, summary)
        })
        .collect();

    let only_document = result
        .only_in_unstructured
        .iter()
        .map(|summary| document_row(report, summary))
        .collect();

    let only_sheet = result
        .only_in_tabular
        .iter()
        .map(|name| ResultRow {
            name: name.clone(),
            operation_code: String::new(),
            canonical_name: name.clone(),
            match_kind: None,
            partner: None,
            shared_tokens: Vec::new(),
            date: None,
            line_number: None,
        })
        .collect();

    [matched, only_document, only_sheet]
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::Char('1') => app.current_page = Page::Matched,
                KeyCode::Char('2') => app.current_page = Page::OnlyDocument,
                KeyCode::Char('3') => app.current_page = Page::OnlySpreadsheet,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.home(),
                KeyCode::End => app.end(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Matched, Page::OnlyDocument, Page::OnlySpreadsheet];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(
            format!("{} ({})", page.title(), app.rows[page.index()].len()),
            style,
        ));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        truncate(&app.report.document_name, 24),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw(" vs "));
    tab_spans.push(Span::styled(
        truncate(&app.report.sheet_name, 24),
        Style::default().fg(Color::Cyan),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let page = app.current_page;

    let titles: &[&str] = match page {
        Page::Matched => &["Name", "Op", "Match", "Spreadsheet Name"],
        Page::OnlyDocument => &["Name", "Op", "Date", "Line"],
        Page::OnlySpreadsheet => &["Canonical Name"],
    };

    let header_cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.rows[page.index()].iter().map(|row| {
        let cells = match page {
            Page::Matched => {
                let (label, color) = match row.match_kind {
                    Some(MatchKind::Exact) => ("exact", Color::Green),
                    _ => ("partial", Color::Yellow),
                };
                vec![
                    Cell::from(truncate(&row.name, 40)),
                    Cell::from(row.operation_code.clone()),
                    Cell::from(label).style(Style::default().fg(color)),
                    Cell::from(truncate(row.partner.as_deref().unwrap_or(""), 40)),
                ]
            }
            Page::OnlyDocument => vec![
                Cell::from(truncate(&row.name, 40)),
                Cell::from(row.operation_code.clone()),
                Cell::from(format_date(row.date)),
                Cell::from(row.line_number.map(|n| n.to_string()).unwrap_or_default()),
            ],
            Page::OnlySpreadsheet => vec![Cell::from(truncate(&row.name, 60))],
        };
        Row::new(cells).height(1)
    });

    let widths: Vec<Constraint> = match page {
        Page::Matched => vec![
            Constraint::Length(42),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Min(20),
        ],
        Page::OnlyDocument => vec![
            Constraint::Length(42),
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(8),
        ],
        Page::OnlySpreadsheet => vec![Constraint::Min(20)],
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} ", page.title())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.states[page.index()]);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.states[app.current_page.index()]
        .selected()
        .map(|i| i + 1)
        .unwrap_or(0);
    let total = app.current_rows().len();

    let status_spans = vec![
        Span::styled(format!(" Row: {}/{} ", selected, total), Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Details | "),
        Span::styled("Tab/1-3", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" Fast | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let value = Style::default().fg(Color::Green);

    let content = match app.selected_row() {
        None => vec![Line::from("  Nothing selected")],
        Some(row) => {
            let mut lines = vec![
                Line::from(""),
                Line::from(vec![Span::styled("  Name: ", label), Span::styled(&row.name, value)]),
                Line::from(vec![
                    Span::styled("  Canonical: ", label),
                    Span::styled(&row.canonical_name, value),
                ]),
            ];

            if !row.operation_code.is_empty() {
                lines.push(Line::from(vec![
                    Span::styled("  Operation: ", label),
                    Span::styled(&row.operation_code, value),
                ]));
            }

            if row.date.is_some() {
                lines.push(Line::from(vec![
                    Span::styled("  Date: ", label),
                    Span::styled(format_date(row.date), value),
                ]));
            }

            if let Some(n) = row.line_number {
                lines.push(Line::from(vec![
                    Span::styled("  Document Line: ", label),
                    Span::styled(n.to_string(), value),
                ]));
            }

            if let Some(partner) = &row.partner {
                lines.push(Line::from(""));
                lines.push(Line::from(vec![
                    Span::styled("  Matched With: ", label),
                    Span::styled(wrap_text(partner, 35), value),
                ]));
                if !row.shared_tokens.is_empty() {
                    lines.push(Line::from(vec![
                        Span::styled("  Shared Tokens: ", label),
                        Span::styled(row.shared_tokens.join(", "), Style::default().fg(Color::Yellow)),
                    ]));
                }
            }

            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  Press Enter to close",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
            lines
        }
    };

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Details "),
    );

    f.render_widget(detail_panel, area);
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if !current_line.is_empty() && current_line.chars().count() + word.chars().count() + 1 > width {
            lines.push(std::mem::take(&mut current_line));
        }
        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines.join("\n  ")
}
