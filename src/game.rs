use crate::entities::Agent;
use crate::grid::{CellState, Grid, Position};
use crate::logger::{create_stats_logger, Observation, StatsLogger};
use rand::distributions::{Distribution, Standard};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use thiserror::Error;

// Total random-placement attempts allowed per cell of capacity. Far above
// the coupon-collector expectation for filling a grid completely, so only a
// broken RNG or an impossible request ever exhausts it.
const PLACEMENT_ATTEMPT_FACTOR: usize = 64;

/// Errors surfaced by the simulation core.
#[derive(Debug, Error)]
pub enum GameError {
    /// The requested population does not fit on the grid. Reported before
    /// any world is built.
    #[error(
        "requested {requested} agents but a {rows}x{columns} grid only has {capacity} cells"
    )]
    Configuration {
        rows: usize,
        columns: usize,
        requested: usize,
        capacity: usize,
    },
    /// A placement addressed a cell outside the grid. Neighbor searches
    /// classify such positions as walls, so this only fires on a misused
    /// placement call.
    #[error("position ({row}, {column}) is outside the {rows}x{columns} grid")]
    OutOfBounds {
        row: i32,
        column: i32,
        rows: usize,
        columns: usize,
    },
    /// Random placement ran out of attempts. Practically unreachable for
    /// any grid that passed the capacity check.
    #[error("gave up placing agents after {attempts} random placement attempts")]
    PlacementTimeout { attempts: usize },
    /// Writing the run's statistics tables failed.
    #[error("failed to export run statistics")]
    Export(#[from] csv::Error),
}

/// Represents the direction an agent can move, feed, or spawn toward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpRight,
    UpLeft,
    DownRight,
    DownLeft,
}

impl Direction {
    /// The fixed enumeration order used by the feeding and spawn searches.
    /// Random movement samples uniformly instead of walking this order.
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::UpRight,
        Direction::UpLeft,
        Direction::DownRight,
        Direction::DownLeft,
    ];

    /// The position one step in this direction.
    pub(crate) fn apply(&self, pos: Position) -> Position {
        match self {
            Direction::Up => Position::new(pos.row - 1, pos.column),
            Direction::Down => Position::new(pos.row + 1, pos.column),
            Direction::Left => Position::new(pos.row, pos.column - 1),
            Direction::Right => Position::new(pos.row, pos.column + 1),
            Direction::UpRight => Position::new(pos.row - 1, pos.column + 1),
            Direction::UpLeft => Position::new(pos.row - 1, pos.column - 1),
            Direction::DownRight => Position::new(pos.row + 1, pos.column + 1),
            Direction::DownLeft => Position::new(pos.row + 1, pos.column - 1),
        }
    }
}

impl Distribution<Direction> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        match rng.gen_range(0..8) {
            0 => Direction::Up,
            1 => Direction::Down,
            2 => Direction::Left,
            3 => Direction::Right,
            4 => Direction::UpRight,
            5 => Direction::UpLeft,
            6 => Direction::DownRight,
            _ => Direction::DownLeft,
        }
    }
}

/// Represents the reason a run finished.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum FinishedReason {
    /// Every prey has been eaten.
    PreyExtinct,
    /// Every predator has starved.
    PredatorExtinct,
    /// The generation cap was reached with both species still alive.
    GenerationLimitReached,
}

/// Per-generation snapshot of the run's counters.
#[derive(Clone, Debug)]
pub struct GameState {
    /// The current generation. Generation 0 is the freshly built world.
    pub generation: usize,
    /// Live prey on the grid.
    pub prey: usize,
    /// Live predators on the grid.
    pub predators: usize,
    /// Prey born since the run started.
    pub prey_births: usize,
    /// Predators born since the run started.
    pub predator_births: usize,
    /// Prey eaten since the run started.
    pub predations: usize,
    /// Whether the run has finished.
    pub finished: bool,
    /// The reason the run finished. `None` while it is still going.
    pub finished_reason: Option<FinishedReason>,
}

/// Live populations and cumulative event counters for the current run.
#[derive(Clone, Debug, Default)]
pub struct PopulationTracker {
    pub prey: usize,
    pub predators: usize,
    pub prey_births: usize,
    pub predator_births: usize,
    pub predations: usize,
}

impl PopulationTracker {
    fn new(prey: usize, predators: usize) -> PopulationTracker {
        PopulationTracker {
            prey,
            predators,
            ..PopulationTracker::default()
        }
    }

    fn record_birth(&mut self, predator: bool) {
        if predator {
            self.predator_births += 1;
            self.predators += 1;
        } else {
            self.prey_births += 1;
            self.prey += 1;
        }
    }

    fn record_predation(&mut self) {
        self.predations += 1;
        self.prey = self.prey.saturating_sub(1);
    }

    fn record_starvation(&mut self) {
        self.predators = self.predators.saturating_sub(1);
    }

    // The sweep adjusts the live counts inline as agents are born, eaten,
    // and starved; the post-sweep census from the grid is authoritative.
    fn recount(&mut self, prey: usize, predators: usize) {
        self.prey = prey;
        self.predators = predators;
    }
}

/// The predator-prey simulation.
/// Main entry point for running a simulation.
pub struct Game {
    grid: Grid,
    layout: Option<String>,
    rows: usize,
    columns: usize,
    prey_count: usize,
    predator_count: usize,
    max_generations: usize,
    generation: usize,
    tracker: PopulationTracker,
    started: bool,
    finished: bool,
    finished_reason: Option<FinishedReason>,
    stats_logger: Box<dyn StatsLogger>,
    rng: StdRng,
}

impl Game {
    /// Creates a new game with randomly placed starting populations.
    ///
    /// # Arguments
    /// * `rows` - The number of grid rows.
    /// * `columns` - The number of grid columns.
    /// * `prey` - How many prey to place at the start of a run.
    /// * `predators` - How many predators to place at the start of a run.
    /// * `max_generations` - The generation cap after which a run finishes.
    /// * `seed` - The seed for the random number generator.
    /// * `export_prefix` - The path prefix for the exported statistics and
    ///   frame tables. If `None`, nothing will be exported.
    pub fn new(
        rows: usize,
        columns: usize,
        prey: usize,
        predators: usize,
        max_generations: usize,
        seed: u64,
        export_prefix: Option<String>,
    ) -> Result<Game, GameError> {
        let capacity = rows * columns;
        let requested = prey + predators;
        if requested > capacity {
            return Err(GameError::Configuration {
                rows,
                columns,
                requested,
                capacity,
            });
        }

        Ok(Game {
            grid: Grid::new(rows, columns),
            layout: None,
            rows,
            columns,
            prey_count: prey,
            predator_count: predators,
            max_generations,
            generation: 0,
            tracker: PopulationTracker::default(),
            started: false,
            finished: false,
            finished_reason: None,
            stats_logger: create_stats_logger(export_prefix, rows, columns),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Creates a new game from a text layout instead of random placement.
    /// Every run rebuilds the exact same world, which makes scenarios
    /// reproducible independently of the seed.
    ///
    /// # Arguments
    /// * `layout` - The world as a string: `rows N` and `cols N` lines
    ///   followed by one `m ...` line per row, with `.` for an empty cell,
    ///   `G` for a prey, and `L` for a predator.
    /// * `max_generations` - The generation cap after which a run finishes.
    /// * `seed` - The seed for the random number generator.
    /// * `export_prefix` - The path prefix for the exported statistics and
    ///   frame tables. If `None`, nothing will be exported.
    pub fn from_layout(
        layout: &str,
        max_generations: usize,
        seed: u64,
        export_prefix: Option<String>,
    ) -> Game {
        let grid = Grid::parse(layout);
        let (rows, columns) = grid.dimensions();
        let prey_count = grid.prey_count();
        let predator_count = grid.predator_count();

        Game {
            grid,
            layout: Some(layout.to_string()),
            rows,
            columns,
            prey_count,
            predator_count,
            max_generations,
            generation: 0,
            tracker: PopulationTracker::default(),
            started: false,
            finished: false,
            finished_reason: None,
            stats_logger: create_stats_logger(export_prefix, rows, columns),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Starts a run, (re)building the world.
    ///
    /// Must be called once before updating the game state. Calling it again
    /// tears the previous run down and builds a fresh world.
    pub fn start(&mut self) -> Result<GameState, GameError> {
        self.generation = 0;
        self.started = true;
        self.finished = false;
        self.finished_reason = None;
        self.stats_logger.clear();

        match &self.layout {
            Some(layout) => self.grid = Grid::parse(layout),
            None => {
                self.grid = Grid::new(self.rows, self.columns);
                self.populate()?;
            }
        }

        self.tracker =
            PopulationTracker::new(self.grid.prey_count(), self.grid.predator_count());
        tracing::debug!(
            rows = self.rows,
            columns = self.columns,
            prey = self.tracker.prey,
            predators = self.tracker.predators,
            "world built"
        );

        self.record_generation();

        Ok(self.game_state())
    }

    /// Runs one generation: every live agent moves (or feeds) and breeds
    /// exactly once, in a fixed row-major sweep.
    pub fn update(&mut self) -> GameState {
        if !self.started {
            panic!("Game has not started! Call `start` to start the game.");
        }

        if self.finished {
            panic!("Game is finished! Call `start` to start a new game.");
        }

        self.grid.reset_turn_guards();

        let (rows, columns) = self.grid.dimensions();
        for row in 0..rows {
            for column in 0..columns {
                let pos = Position::new(row as i32, column as i32);
                // The guard keeps an agent that relocated into a cell the
                // sweep has not visited yet, or a child spawned mid-sweep,
                // from acting twice in one generation.
                let ready = self
                    .grid
                    .agent(pos)
                    .is_some_and(|agent| !agent.turn_taken);
                if ready {
                    self.take_turn(pos);
                }
            }
        }

        self.tracker
            .recount(self.grid.prey_count(), self.grid.predator_count());
        self.generation += 1;
        self.record_generation();
        self.check_for_endgame();

        if self.finished {
            tracing::info!(
                generation = self.generation,
                reason = ?self.finished_reason,
                "run finished"
            );
        }

        self.game_state()
    }

    /// Draws the current grid to the console.
    pub fn draw(&self) {
        self.grid
            .draw(self.generation, self.tracker.prey, self.tracker.predators);
    }

    /// Writes the statistics and frame tables collected during the run.
    pub fn export(&self) -> Result<(), GameError> {
        self.stats_logger.save()
    }

    fn populate(&mut self) -> Result<(), GameError> {
        let capacity = self.rows * self.columns;
        let budget = PLACEMENT_ATTEMPT_FACTOR * capacity.max(1);
        let mut attempts = 0;

        for _ in 0..self.predator_count {
            self.place_randomly(Agent::predator(), budget, &mut attempts)?;
        }
        for _ in 0..self.prey_count {
            self.place_randomly(Agent::prey(), budget, &mut attempts)?;
        }

        Ok(())
    }

    fn place_randomly(
        &mut self,
        agent: Agent,
        budget: usize,
        attempts: &mut usize,
    ) -> Result<(), GameError> {
        loop {
            if *attempts >= budget {
                return Err(GameError::PlacementTimeout {
                    attempts: *attempts,
                });
            }
            *attempts += 1;

            let pos = Position::new(
                self.rng.gen_range(0..self.rows) as i32,
                self.rng.gen_range(0..self.columns) as i32,
            );
            if self.grid.state(pos) == CellState::Empty {
                self.grid.place(pos, agent)?;
                return Ok(());
            }
        }
    }

    fn take_turn(&mut self, pos: Position) {
        let predator = self
            .grid
            .agent(pos)
            .is_some_and(|agent| agent.is_predator());

        let current = if predator {
            match self.adjacent_prey(pos) {
                Some(target) => self.feed(pos, target),
                None => {
                    let moved = self.random_move(pos);
                    if self.starve(moved) {
                        // A starved predator is gone from the grid and takes
                        // no further part in the turn.
                        return;
                    }
                    moved
                }
            }
        } else {
            self.random_move(pos)
        };

        self.breed(current);

        if let Some(agent) = self.grid.agent_mut(current) {
            agent.turn_taken = true;
        }
    }

    /// The first prey neighbor in the fixed direction order, if any.
    fn adjacent_prey(&self, pos: Position) -> Option<Position> {
        Direction::ALL
            .iter()
            .map(|direction| direction.apply(pos))
            .find(|target| self.grid.state(*target) == CellState::Prey)
    }

    /// Relocates the predator onto the prey, consuming it.
    fn feed(&mut self, from: Position, to: Position) -> Position {
        self.grid.relocate(from, to);
        if let Some(agent) = self.grid.agent_mut(to) {
            agent.reset_starve_clock();
        }
        self.tracker.record_predation();
        to
    }

    /// One movement attempt toward a uniformly random direction. A blocked
    /// direction wastes the turn; there is no retry.
    fn random_move(&mut self, pos: Position) -> Position {
        let direction: Direction = self.rng.gen();
        let target = direction.apply(pos);

        if self.grid.state(target) == CellState::Empty {
            self.grid.relocate(pos, target);
            return target;
        }

        pos
    }

    /// Advances the agent's starvation clock; removes it when it starved.
    fn starve(&mut self, pos: Position) -> bool {
        let starved = match self.grid.agent_mut(pos) {
            Some(agent) => agent.tick_starve_clock(),
            None => return false,
        };

        if starved {
            self.grid.clear(pos);
            self.tracker.record_starvation();
        }

        starved
    }

    /// Advances the agent's breeding clock and, when a birth is due, spawns
    /// a child of the same species into the first empty neighbor in the
    /// fixed direction order. The clock resets whether or not a child could
    /// be placed.
    fn breed(&mut self, pos: Position) {
        let due = match self.grid.agent_mut(pos) {
            Some(agent) => agent.tick_breed_clock(),
            None => return,
        };
        if !due {
            return;
        }

        let predator = self
            .grid
            .agent(pos)
            .is_some_and(|agent| agent.is_predator());

        let open = Direction::ALL
            .iter()
            .map(|direction| direction.apply(pos))
            .find(|target| self.grid.state(*target) == CellState::Empty);

        if let Some(open) = open {
            let child = if predator {
                Agent::predator()
            } else {
                Agent::prey()
            };
            self.grid
                .place(open, child)
                .expect("an empty neighbor is inside the grid");
            self.tracker.record_birth(predator);
        }
    }

    fn record_generation(&mut self) {
        self.stats_logger.log_observation(Observation {
            generation: self.generation,
            prey: self.tracker.prey,
            predators: self.tracker.predators,
            prey_births: self.tracker.prey_births,
            predator_births: self.tracker.predator_births,
            predations: self.tracker.predations,
        });
        self.stats_logger.log_frame(self.grid.frame());
    }

    fn check_for_endgame(&mut self) {
        if self.tracker.prey == 0 {
            self.finished = true;
            self.finished_reason = Some(FinishedReason::PreyExtinct);

            return;
        }

        if self.tracker.predators == 0 {
            self.finished = true;
            self.finished_reason = Some(FinishedReason::PredatorExtinct);

            return;
        }

        if self.generation >= self.max_generations {
            self.finished = true;
            self.finished_reason = Some(FinishedReason::GenerationLimitReached);
        }
    }

    fn game_state(&self) -> GameState {
        GameState {
            generation: self.generation,
            prey: self.tracker.prey,
            predators: self.tracker.predators,
            prey_births: self.tracker.prey_births,
            predator_births: self.tracker.predator_births,
            predations: self.tracker.predations,
            finished: self.finished,
            finished_reason: self.finished_reason.clone(),
        }
    }
}
