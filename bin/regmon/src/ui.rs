use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use panel_api::Client;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};
use ratatui::{Frame, Terminal};
use tokio::sync::Mutex;
use tokio::time;

use crate::app::{App, InputMode};
use crate::dispatch::{self, Command};
use crate::view::{self, PanelView};
use crate::Result;

const DRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Runs the terminal shell until the operator quits. The terminal is always
/// restored, also when the event loop returns an error.
pub async fn run(client: Client, app: Arc<Mutex<App>>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, client, app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    client: Client,
    app: Arc<Mutex<App>>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = time::interval(DRAW_INTERVAL);

    loop {
        {
            let app = app.lock().await;
            let view = view::project(&app);
            terminal.draw(|frame| draw(frame, &view, &app))?;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if handle_key(key, &client, &app).await {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => break,
            },
        }
    }

    Ok(())
}

/// Returns `true` when the operator asked to quit.
async fn handle_key(key: KeyEvent, client: &Client, app: &Arc<Mutex<App>>) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    let mut guard = app.lock().await;

    match guard.mode {
        InputMode::AddRegister => match key.code {
            KeyCode::Esc => {
                guard.register_input.clear();
                guard.mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                guard.register_input.pop();
            }
            KeyCode::Enter => {
                let raw = guard.register_input.clone();
                drop(guard);
                spawn_command(Command::AddRegister(raw), client, app);
            }
            KeyCode::Char(c) => guard.register_input.push(c),
            _ => {}
        },
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('a') => {
                let desired = !guard.armed;
                drop(guard);
                spawn_command(Command::SetArm(desired), client, app);
            }
            KeyCode::Char('r') | KeyCode::Char('+') => guard.mode = InputMode::AddRegister,
            KeyCode::Up => guard.move_register(-1),
            KeyCode::Down => guard.move_register(1),
            KeyCode::Left | KeyCode::BackTab => guard.move_device(-1),
            KeyCode::Right | KeyCode::Tab => guard.move_device(1),
            KeyCode::Esc => {
                guard.value_input.clear();
                guard.notice = None;
            }
            KeyCode::Backspace => {
                guard.value_input.pop();
            }
            KeyCode::Enter => {
                if let Some((device, address)) = guard.selected_target() {
                    let raw = guard.value_input.clone();
                    drop(guard);
                    spawn_command(
                        Command::Write {
                            device,
                            address,
                            raw,
                        },
                        client,
                        app,
                    );
                }
            }
            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '.' | '-' | 'e' | 'E') => {
                guard.value_input.push(c)
            }
            _ => {}
        },
    }

    false
}

/// Commands run in their own tasks, so a slow server never freezes input
/// handling, and a post-command refresh may overlap a scheduled poll cycle.
fn spawn_command(command: Command, client: &Client, app: &Arc<Mutex<App>>) {
    let client = client.clone();
    let app = app.clone();

    tokio::task::spawn(dispatch::run(command, client, app));
}

fn draw(frame: &mut Frame, view: &PanelView, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], view);
    draw_cards(frame, chunks[1], view);
    draw_footer(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, view: &PanelView) {
    let arm_span = if view.armed {
        Span::styled(
            "ARMED",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("DISARMED", Style::default().fg(Color::Green))
    };

    let title = Line::from(vec![
        Span::styled("regmon", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  writes: "),
        arm_span,
    ]);

    let notice = match &view.notice {
        Some(notice) => Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(""),
    };

    frame.render_widget(Paragraph::new(vec![title, notice]), area);
}

fn draw_cards(frame: &mut Frame, area: Rect, view: &PanelView) {
    if view.cards.is_empty() {
        let waiting = Paragraph::new("waiting for first snapshot...")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(waiting, area);
        return;
    }

    let constraints: Vec<Constraint> = view
        .cards
        .iter()
        .map(|_| Constraint::Ratio(1, view.cards.len() as u32))
        .collect();

    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (card, card_area) in view.cards.iter().zip(areas.iter()) {
        let rows = card.rows.iter().map(|row| {
            let style = if row.selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else if row.status.starts_with("ERR") {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            Row::new(vec![
                row.address.clone(),
                row.value.clone(),
                row.status.clone(),
            ])
            .style(style)
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(8),
                Constraint::Length(12),
                Constraint::Min(10),
            ],
        )
        .header(
            Row::new(vec!["Register", "Value", "Status"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(card.title.clone()),
        );

        frame.render_widget(table, *card_area);
    }
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let input = match app.mode {
        InputMode::AddRegister => Line::from(vec![
            Span::raw("add register: "),
            Span::styled(
                format!("{}_", app.register_input),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  (Enter submit, Esc cancel)"),
        ]),
        InputMode::Normal => Line::from(vec![
            Span::raw("write value: "),
            Span::styled(
                format!("{}_", app.value_input),
                Style::default().fg(Color::Cyan),
            ),
        ]),
    };

    let help = Line::from(Span::styled(
        "arrows/Tab select · type+Enter write · a arm · r add register · q quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(vec![input, help]), area);
}
