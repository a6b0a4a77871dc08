use anyhow::Result;
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use life_engine::Game;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

const DEFAULT_PREY: usize = 20;
const DEFAULT_PREDATORS: usize = 5;
// Runs that never reach an extinction still terminate.
const DEFAULT_GENERATION_CAP: usize = 10_000;

struct RunConfig {
    rows: usize,
    columns: usize,
    prey: usize,
    predators: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    loop {
        match main_menu()?.as_str() {
            "1" => run_game_mode()?,
            "2" => run_scientific_mode()?,
            "3" => print_help()?,
            _ => return Ok(()),
        }
    }
}

fn main_menu() -> Result<String> {
    loop {
        println!("\nGame of Life: predators and prey");
        println!("1) Game mode");
        println!("2) Scientific mode");
        println!("3) Help");
        println!("4) Exit");
        print!("> ");
        io::stdout().flush()?;

        let choice = read_line()?;
        let choice = choice.trim();
        if matches!(choice, "1" | "2" | "3" | "4") {
            return Ok(choice.to_string());
        }
    }
}

/// Interactive mode: the grid is drawn after every generation and the user
/// paces the run one keystroke at a time.
fn run_game_mode() -> Result<()> {
    let config = prompt_config()?;
    let prefix = export_prefix();
    let seed = rand::random();
    tracing::debug!(seed, "seeding game mode run");

    let mut game = Game::new(
        config.rows,
        config.columns,
        config.prey,
        config.predators,
        DEFAULT_GENERATION_CAP,
        seed,
        Some(prefix.clone()),
    )?;

    let mut state = game.start()?;
    game.draw();
    println!("Press any key for the next generation, 'x' to stop.");

    while !state.finished && await_next_generation()? {
        state = game.update();
        game.draw();
        println!("Press any key for the next generation, 'x' to stop.");
    }

    if let Some(reason) = &state.finished_reason {
        println!(
            "The run finished after {} generations: {:?}",
            state.generation, reason
        );
    }

    game.export()?;
    println!(
        "Statistics written to {}-stats.csv and {}-frames.csv",
        prefix, prefix
    );

    Ok(())
}

/// Batch mode: the simulation is repeated back to back without drawing,
/// producing one pair of CSV tables per run.
fn run_scientific_mode() -> Result<()> {
    let config = prompt_config()?;
    let repetitions = prompt_count("repetitions", 1)?;
    let base = export_prefix();

    for run in 1..=repetitions {
        let prefix = format!("{}-run{}", base, run);
        let seed = rand::random();
        tracing::debug!(run, seed, "seeding scientific mode run");

        let mut game = Game::new(
            config.rows,
            config.columns,
            config.prey,
            config.predators,
            DEFAULT_GENERATION_CAP,
            seed,
            Some(prefix.clone()),
        )?;

        let mut state = game.start()?;
        while !state.finished {
            state = game.update();
        }
        game.export()?;

        println!(
            "Run {}: finished after {} generations ({:?}); tables at {}-stats.csv and {}-frames.csv",
            run,
            state.generation,
            state.finished_reason.unwrap(),
            prefix,
            prefix
        );
    }

    Ok(())
}

fn print_help() -> Result<()> {
    println!();
    println!("Two species share a closed grid: prey ('O') and predators ('X').");
    println!("Each generation every agent tries one random move, predators eat");
    println!("any adjacent prey instead of moving, both species breed on a");
    println!("per-species cooldown, and a predator that goes too long without");
    println!("eating starves. A run ends when either species dies out.");
    println!();
    println!("Game mode draws the grid and advances one generation per keypress.");
    println!("Scientific mode repeats the simulation back to back with no");
    println!("drawing, for producing datasets. Both modes write a statistics");
    println!("table and a per-cell frame table as CSV when the run ends.");
    Ok(())
}

/// Collects the run configuration, re-prompting until the populations fit
/// on the requested grid.
fn prompt_config() -> Result<RunConfig> {
    loop {
        let prey = prompt_count("prey", DEFAULT_PREY)?;
        let predators = prompt_count("predators", DEFAULT_PREDATORS)?;
        let total = prey + predators;

        let suggested_rows = ((total as f64).sqrt().ceil() as usize).max(1);
        let rows = prompt_count("rows", suggested_rows)?;
        let suggested_columns = ((total + rows - 1) / rows).max(1);
        let columns = prompt_count("columns", suggested_columns)?;

        if rows * columns >= total {
            return Ok(RunConfig {
                rows,
                columns,
                prey,
                predators,
            });
        }

        println!(
            "A {}x{} grid only has {} cells but {} agents were requested. Please try again.",
            rows,
            columns,
            rows * columns,
            total
        );
    }
}

fn prompt_count(label: &str, default: usize) -> Result<usize> {
    loop {
        print!("How many {} would you like? (press Enter for {}) ", label, default);
        io::stdout().flush()?;

        let input = read_line()?;
        let input = input.trim();
        if input.is_empty() {
            return Ok(default);
        }

        match input.parse::<usize>() {
            Ok(value) if value > 0 => return Ok(value),
            _ => println!("Please enter a positive whole number."),
        }
    }
}

/// Blocks until the user reacts to the drawn generation. Returns `false`
/// when they asked the run to stop.
fn await_next_generation() -> Result<bool> {
    terminal::enable_raw_mode()?;
    let proceed = loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                break !matches!(key.code, KeyCode::Char('x') | KeyCode::Char('X'));
            }
        }
    };
    terminal::disable_raw_mode()?;

    Ok(proceed)
}

fn export_prefix() -> String {
    format!("life-{}", Local::now().format("%Y%m%d-%H%M%S"))
}

fn read_line() -> Result<String> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}
