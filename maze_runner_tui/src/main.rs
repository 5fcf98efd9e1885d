use anyhow::{Context, Result};
use clap::Parser;
use maze_runner_core::{
    GenerationResult, MazeGenerator, Position, TrapKind,
    hazard::{TrapCycle, TrapState},
    level::{LevelConfig, LevelTable},
};
use rand::{SeedableRng, rngs::StdRng};
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
use std::{
    collections::HashMap,
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, fmt::writer::BoxMakeWriter, prelude::*};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Level to generate, starting at 1
    #[arg(short, long, default_value_t = 1)]
    level: usize,

    /// TOML level table to use instead of the built-in one
    #[arg(long, value_name = "LEVELS_FILE")]
    levels: Option<PathBuf>,

    /// Seed for reproducible mazes
    #[arg(short, long)]
    seed: Option<u64>,

    /// Floor of the level to start on
    #[arg(short, long, default_value_t = 1)]
    floor: usize,

    /// Print the maze in the text map format and exit
    #[arg(short, long)]
    print: bool,

    /// Append logs to this file
    #[arg(long, value_name = "LOG_FILE")]
    log: Option<PathBuf>,
}

struct App {
    level_number: usize,
    level: LevelConfig,
    floor: usize,
    generator: MazeGenerator,
    rng: StdRng,
    /// Drives the trap animation.
    started: Instant,
    should_quit: bool,
}

impl App {
    fn new(table: &LevelTable, level: usize, floor: usize, rng: StdRng) -> Self {
        let level_number = table.clamp_level(level);
        let level = table.get(level_number).clone();
        let floor = floor.clamp(1, level.floors.max(1));
        let generator = MazeGenerator::new(level.size.0, level.size.1);
        let mut app = App {
            level_number,
            level,
            floor,
            generator,
            rng,
            started: Instant::now(),
            should_quit: false,
        };
        app.regenerate();
        app
    }

    /// Generates the current floor again.
    fn regenerate(&mut self) {
        let params = self.level.params_for_floor(self.floor);
        self.generator.generate(&params, &mut self.rng);
        self.started = Instant::now();
    }

    /// Moves to the next floor, wrapping back to the first.
    fn next_floor(&mut self) {
        self.floor = if self.floor >= self.level.floors { 1 } else { self.floor + 1 };
        info!(level = self.level_number, floor = self.floor, "changing floor");
        self.regenerate();
    }

    fn result(&self) -> Option<&GenerationResult> {
        self.generator.last_result()
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let writer = match &args.log {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        // The alternate screen owns the terminal outside print mode.
        None if args.print => BoxMakeWriter::new(io::stderr),
        None => BoxMakeWriter::new(io::sink),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "maze_runner_core=info".into()))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_tracing(&args)?;

    let table = match &args.levels {
        Some(path) => LevelTable::load(path)?,
        None => LevelTable::default(),
    };
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut app = App::new(&table, args.level, args.floor, rng);

    if args.print {
        if let Some(result) = app.result() {
            print!("{}", result.layout);
        }
        return Ok(());
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop
    let outcome = run_app(&mut terminal, &mut app);

    // Restore the terminal state even if the loop failed
    restore_terminal(&mut terminal)?;

    outcome
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
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

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    // Redraw often enough for the trap warnings to show
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui(f, app))?;

        if crossterm::event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char('r') => app.regenerate(),
                    KeyCode::Char('n') => app.next_floor(),
                    _ => {}
                }
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Area for the map
            Constraint::Length(6), // Area for level status
            Constraint::Length(2), // Area for help
        ])
        .split(frame.area());

    if let Some(result) = app.result() {
        let elapsed = app.started.elapsed().as_secs_f64();
        render_map(frame, main_layout[0], result, app.level.trap_cycle(), elapsed);
        render_status(frame, main_layout[1], app, result);
    }

    let help_text = Paragraph::new("'r' regenerate  'n' next floor  'q'/'Esc' quit")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders the level description and how generation went.
fn render_status(frame: &mut Frame, area: Rect, app: &App, result: &GenerationResult) {
    let layout = &result.layout;
    let time_limit = match app.level.time_limit {
        0 => "none".to_string(),
        seconds => format!("{seconds}s"),
    };
    let lines = vec![
        Line::from(app.level.description.as_str()),
        Line::from(format!(
            "Level {} ({})  Floor {}/{}  Time limit: {}",
            app.level_number, app.level.theme, app.floor, app.level.floors, time_limit
        )),
        Line::from(format!(
            "Keys: {}  Enemies: {}  Traps: {}",
            layout.get_key_positions().len(),
            layout.get_enemy_positions().len(),
            layout.get_trap_positions().len()
        )),
        Line::from(vec![
            Span::raw(format!("Attempts: {}  ", result.report.attempts)),
            if result.report.used_fallback {
                Span::styled("fallback maze", Style::default().fg(Color::Yellow))
            } else {
                Span::styled("random maze", Style::default().fg(Color::Green))
            },
        ]),
    ];

    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, area);
}

/// Renders the maze onto the frame.
fn render_map(frame: &mut Frame, area: Rect, result: &GenerationResult, cycle: TrapCycle, elapsed: f64) {
    let layout = &result.layout;
    let grid = layout.grid();

    let mut markers: HashMap<Position, Span> = HashMap::new();
    for trap in layout.get_trap_positions() {
        let symbol = match trap.kind {
            TrapKind::Spike => "^",
            TrapKind::Fire => "~",
        };
        let style = match cycle.state_at(elapsed) {
            TrapState::Idle => Style::default().fg(Color::DarkGray),
            TrapState::Warning => Style::default().fg(Color::Yellow),
            TrapState::Active => Style::default().fg(Color::Red).bold(),
        };
        markers.insert(trap.position, Span::styled(symbol, style));
    }
    for enemy in layout.get_enemy_positions() {
        markers.insert(*enemy, Span::styled("e", Style::default().fg(Color::Magenta)));
    }
    for stairs in layout.get_stair_positions() {
        markers.insert(*stairs, Span::styled(">", Style::default().fg(Color::Cyan).bold()));
    }
    for key in layout.get_key_positions() {
        markers.insert(*key, Span::styled("k", Style::default().fg(Color::Yellow)));
    }
    if let Some(door) = layout.get_door_position() {
        markers.insert(door, Span::styled("D", Style::default().fg(Color::Yellow).bold()));
    }
    markers.insert(layout.exit(), Span::styled("E", Style::default().fg(Color::Green).bold()));
    markers.insert(layout.start(), Span::styled("S", Style::default().fg(Color::Blue).bold()));

    let mut lines: Vec<Line> = Vec::with_capacity(grid.height());
    for y in 0..grid.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(grid.width());
        for x in 0..grid.width() {
            let position = Position::new(x, y);
            if let Some(marker) = markers.get(&position) {
                spans.push(marker.clone());
            } else if grid.is_wall(position) {
                spans.push(Span::styled("#", Style::default().fg(Color::DarkGray)));
            } else {
                spans.push(Span::raw(" "));
            }
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Maze Runner").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}
