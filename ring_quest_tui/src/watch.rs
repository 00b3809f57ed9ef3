use std::{
    collections::HashSet,
    io::{self, Stdout},
    time::{Duration, Instant},
};

use anyhow::Result;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use ring_quest_core::{
    BOARD_SIZE, Position,
    agent::Planner,
    environment::{Environment, MapDefinition, Variant, briefed_planner},
    search::SearchConfig,
    world::{SightingKind, ThreatKind, WorldModel},
};

struct App {
    environment: Environment,
    planner: Planner,
    tick_rate: Duration,
    should_quit: bool,
    paused: bool,
}

impl App {
    fn new(map: MapDefinition, variant: Variant, config: SearchConfig, tick_ms: u64) -> Self {
        let environment = Environment::new(map, variant);
        let planner = briefed_planner(&environment, config);
        App {
            environment,
            planner,
            tick_rate: Duration::from_millis(tick_ms),
            should_quit: false,
            paused: false,
        }
    }

    /// Lets the agent take one turn.
    fn tick(&mut self) {
        if self.paused {
            return;
        }
        self.environment.step(&mut self.planner);
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

/// Runs the viewer until the user quits.
pub fn run(map: MapDefinition, variant: Variant, config: SearchConfig, tick_ms: u64) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(map, variant, config, tick_ms);
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    result
}

/// Switches to raw mode on the alternate screen.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Leaves raw mode and the alternate screen.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = app
            .tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.paused = !app.paused,
                    KeyCode::Char('n') if app.paused => {
                        app.environment.step(&mut app.planner);
                    }
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= app.tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(frame: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(frame.area());
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35), // status
            Constraint::Percentage(25), // what the agent has seen
            Constraint::Percentage(30), // command log
            Constraint::Percentage(10), // help
        ])
        .split(columns[1]);

    render_board(frame, columns[0], app);
    render_status(frame, side[0], app);
    render_knowledge(frame, side[1], app);
    render_log(frame, side[2], app);

    let help_text = Paragraph::new("q/Esc quit, space pause, n step while paused")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, side[3]);
}

fn threat_style(kind: ThreatKind) -> Style {
    match kind {
        ThreatKind::Orc => Style::default().fg(Color::Red),
        ThreatKind::Uruk => Style::default().fg(Color::LightRed),
        ThreatKind::Nazgul => Style::default().fg(Color::Magenta).bold(),
        ThreatKind::Tower => Style::default().fg(Color::White).bold(),
    }
}

/// Draws the true map, shading cells the agent knows to be deadly right now.
fn render_board(frame: &mut Frame, area: Rect, app: &App) {
    let env = &app.environment;
    let map = env.map();
    let state = app.planner.state();
    let route: HashSet<Position> = app
        .planner
        .planned_route()
        .map(|plan| plan.states.iter().map(|s| s.position).collect())
        .unwrap_or_default();

    let mut lines: Vec<Line> = Vec::with_capacity(BOARD_SIZE as usize);
    for y in 0..BOARD_SIZE {
        let mut spans: Vec<Span> = Vec::with_capacity(BOARD_SIZE as usize);
        for x in 0..BOARD_SIZE {
            let pos = Position::new(x, y);
            let span = if pos == env.position() {
                Span::styled(" @", Style::default().fg(Color::Yellow).bold())
            } else if let Some(enemy) = map.enemy_at(pos) {
                Span::styled(format!(" {}", enemy.code()), threat_style(enemy.kind))
            } else if pos == map.first_target && !env.first_met() {
                Span::styled(" G", Style::default().fg(Color::Green).bold())
            } else if pos == map.second_target {
                let style = if env.first_met() {
                    Style::default().fg(Color::Green).bold()
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                Span::styled(" M", style)
            } else if pos == map.coat && !env.coat_taken() {
                Span::styled(" C", Style::default().fg(Color::Cyan))
            } else if route.contains(&pos) {
                Span::styled(" ·", Style::default().fg(Color::Yellow))
            } else if !app.planner.world().is_safe(pos, state.equipment) {
                Span::styled(" ░", Style::default().fg(Color::Red))
            } else if env.hazards().is_hazard(pos, state.equipment) {
                Span::styled(" ░", Style::default().fg(Color::DarkGray))
            } else {
                Span::raw(" .")
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let board = Paragraph::new(lines)
        .block(Block::default().title("Ring Quest").borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(board, area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let env = &app.environment;
    let state = app.planner.state();
    let flag = |on: bool| if on { "yes" } else { "no" };
    let target = app
        .planner
        .current_target()
        .map_or_else(|| "unknown".to_string(), |t| t.to_string());
    let reference = env
        .reference()
        .to_second
        .map_or_else(|| "unsolvable".to_string(), |n| format!("{n} moves"));

    let mut items = vec![
        ListItem::new(format!("Position: {}", state.position)),
        ListItem::new(format!(
            "Ring: {}  Coat: {}",
            flag(state.equipment.ring),
            flag(state.equipment.coat)
        )),
        ListItem::new(format!("Heading for: {target}")),
        ListItem::new(format!("Turns: {}", app.planner.steps())),
        ListItem::new(format!("Planner: {:?}", app.planner.phase())),
        ListItem::new(format!("Best possible: {reference}")),
    ];
    if app.paused {
        items.push(ListItem::new(Span::styled(
            "Paused",
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(report) = env.report() {
        let color = if report.success { Color::Green } else { Color::Red };
        items.push(ListItem::new(Span::styled(
            format!("Episode over: {}", report.outcome),
            Style::default().fg(color).bold(),
        )));
    }

    let status = List::new(items).block(Block::default().borders(Borders::ALL).title("Agent"));
    frame.render_widget(status, area);
}

/// Summarises the agent's accumulated knowledge, one line per fact.
fn knowledge_lines(world: &WorldModel) -> Vec<String> {
    let mut lines: Vec<String> = ThreatKind::ALL
        .iter()
        .filter_map(|&kind| {
            let mut seen: Vec<Position> = world.threats(kind).collect();
            if seen.is_empty() {
                return None;
            }
            seen.sort();
            let cells: Vec<String> = seen.iter().map(ToString::to_string).collect();
            Some(format!("{kind:?}: {}", cells.join(" ")))
        })
        .collect();
    lines.push(format!("Forbidden cells: {}", world.danger_zone().len()));
    for (label, kind) in [
        ("Coat", SightingKind::Coat),
        ("First target", SightingKind::FirstTarget),
        ("Second target", SightingKind::SecondTarget),
    ] {
        let at = world
            .landmark(kind)
            .map_or_else(|| "unseen".to_string(), |p| p.to_string());
        lines.push(format!("{label}: {at}"));
    }
    lines
}

fn render_knowledge(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = knowledge_lines(app.planner.world())
        .into_iter()
        .map(ListItem::new)
        .collect();
    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Seen"));
    frame.render_widget(widget, area);
}

fn render_log(frame: &mut Frame, area: Rect, app: &App) {
    let log = app.environment.log();
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = log
        .iter()
        .enumerate()
        .skip(log.len().saturating_sub(visible))
        .map(|(i, line)| ListItem::new(format!("{:>4}  {line}", i + 1)))
        .collect();
    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Commands"));
    frame.render_widget(widget, area);
}
