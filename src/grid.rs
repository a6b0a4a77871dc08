use crate::entities::{Agent, Species};
use crate::game::GameError;
use crossterm::{
    cursor::Hide,
    execute,
    style::{Color, Print, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use regex::Regex;
use std::io::{stdout, Write};

/// A cell coordinate. Signed so that neighbor positions beyond the edges
/// are representable; the grid classifies those as [`CellState::Wall`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub row: i32,
    pub column: i32,
}

impl Position {
    pub fn new(row: i32, column: i32) -> Position {
        Position { row, column }
    }
}

/// What a position holds, as seen by the neighbor search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellState {
    Empty,
    Wall,
    Prey,
    Predator,
}

/// Fixed-size 2D space holding at most one agent per cell.
///
/// The grid exclusively owns its agents; removing an agent from its cell
/// drops it. There is no wraparound.
pub struct Grid {
    rows: usize,
    columns: usize,
    cells: Vec<Option<Agent>>,
}

impl Grid {
    pub fn new(rows: usize, columns: usize) -> Grid {
        let mut cells = Vec::with_capacity(rows * columns);
        cells.resize_with(rows * columns, || None);

        Grid {
            rows,
            columns,
            cells,
        }
    }

    /// Builds a grid from a text layout, e.g.:
    ///
    /// ```text
    /// rows 3
    /// cols 3
    /// m .G.
    /// m .L.
    /// m ...
    /// ```
    ///
    /// `G` is a prey, `L` a predator, `.` an empty cell. Panics on a
    /// malformed layout; layouts are authored, not user input.
    pub fn parse(layout: &str) -> Grid {
        let metadata = Regex::new(r"rows (\d+)\s+cols (\d+)")
            .unwrap()
            .captures(layout)
            .unwrap();

        let rows = metadata.get(1).unwrap().as_str().parse().unwrap();
        let columns = metadata.get(2).unwrap().as_str().parse().unwrap();

        let mut grid = Grid::new(rows, columns);

        Regex::new(r"m (.*)")
            .unwrap()
            .captures_iter(layout)
            .map(|captures| captures.get(1).unwrap().as_str().trim())
            .enumerate()
            .for_each(|(row, line)| {
                line.chars().enumerate().for_each(|(column, value)| {
                    let pos = Position::new(row as i32, column as i32);
                    match value {
                        '.' => {}
                        'G' => grid.put(pos, Agent::prey()),
                        'L' => grid.put(pos, Agent::predator()),
                        _ => panic!("Invalid layout character: {}", value),
                    }
                });
            });

        grid
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    /// Classifies a position: `Wall` when out of bounds, otherwise the
    /// occupant's species or `Empty`.
    pub fn state(&self, pos: Position) -> CellState {
        let Some(index) = self.index(pos) else {
            return CellState::Wall;
        };

        match &self.cells[index] {
            None => CellState::Empty,
            Some(agent) => match agent.species {
                Species::Prey => CellState::Prey,
                Species::Predator { .. } => CellState::Predator,
            },
        }
    }

    pub fn agent(&self, pos: Position) -> Option<&Agent> {
        self.index(pos).and_then(|index| self.cells[index].as_ref())
    }

    pub fn agent_mut(&mut self, pos: Position) -> Option<&mut Agent> {
        self.index(pos)
            .and_then(|index| self.cells[index].as_mut())
    }

    /// Writes an agent into a cell, overwriting any occupant. Callers that
    /// do not intend to overwrite must check [`Grid::state`] first; the
    /// overwrite is what makes feeding work.
    pub fn place(&mut self, pos: Position, agent: Agent) -> Result<(), GameError> {
        match self.index(pos) {
            Some(index) => {
                self.cells[index] = Some(agent);
                Ok(())
            }
            None => Err(GameError::OutOfBounds {
                row: pos.row,
                column: pos.column,
                rows: self.rows,
                columns: self.columns,
            }),
        }
    }

    /// Empties a cell. The position must be in bounds.
    pub fn clear(&mut self, pos: Position) {
        let index = self.checked_index(pos);
        self.cells[index] = None;
    }

    /// Removes and returns the occupant of a cell. The position must be in
    /// bounds.
    pub fn take(&mut self, pos: Position) -> Option<Agent> {
        let index = self.checked_index(pos);
        self.cells[index].take()
    }

    /// Moves the occupant of `from` into `to`, overwriting whatever `to`
    /// held. Both positions must be in bounds and `from` must be occupied.
    pub(crate) fn relocate(&mut self, from: Position, to: Position) {
        let agent = match self.take(from) {
            Some(agent) => agent,
            None => panic!("No agent to relocate at ({}, {})", from.row, from.column),
        };
        let index = self.checked_index(to);
        self.cells[index] = Some(agent);
    }

    fn put(&mut self, pos: Position, agent: Agent) {
        let index = self.checked_index(pos);
        self.cells[index] = Some(agent);
    }

    /// Clears every agent's turn guard ahead of a new sweep.
    pub(crate) fn reset_turn_guards(&mut self) {
        for agent in self.cells.iter_mut().flatten() {
            agent.turn_taken = false;
        }
    }

    // The census scans are linear over the whole grid. That is fine for the
    // grid sizes this simulation runs at; revisit if grids ever grow past a
    // few thousand cells.
    pub fn agents(&self) -> Vec<(&Agent, Position)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| {
                cell.as_ref().map(|agent| {
                    let row = (index / self.columns) as i32;
                    let column = (index % self.columns) as i32;
                    (agent, Position::new(row, column))
                })
            })
            .collect()
    }

    pub fn prey_count(&self) -> usize {
        self.agents()
            .into_iter()
            .filter(|(agent, _)| agent.is_prey())
            .count()
    }

    pub fn predator_count(&self) -> usize {
        self.agents()
            .into_iter()
            .filter(|(agent, _)| agent.is_predator())
            .count()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().flatten().count()
    }

    /// Row-major one-letter classification of every cell (`E`, `G`, `L`),
    /// the shape the frame export and replay consumers expect.
    pub fn frame(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|cell| match cell {
                None => "E".to_string(),
                Some(agent) => agent.species().letter().to_string(),
            })
            .collect()
    }

    /// Draws the grid to the console.
    pub fn draw(&self, generation: usize, prey: usize, predators: usize) {
        let mut stdout = stdout();

        execute!(
            stdout,
            Clear(ClearType::All),
            Hide,
            Print("Generation: "),
            Print(generation.to_string()),
            Print("\nPrey: "),
            Print(prey.to_string()),
            Print("  Predators: "),
            Print(predators.to_string()),
            Print("\n\n")
        )
        .unwrap();

        for row in 0..self.rows {
            for column in 0..self.columns {
                let agent = self.agent(Position::new(row as i32, column as i32));
                execute!(
                    stdout,
                    SetForegroundColor(
                        agent.map_or(Color::Reset, |agent| agent.species().color())
                    ),
                    Print(agent.map_or('.', |agent| agent.species().glyph())),
                    SetForegroundColor(Color::Reset)
                )
                .unwrap();
            }
            execute!(stdout, Print("\n")).unwrap();
        }

        execute!(
            stdout,
            Print("\n'O': prey  'X': predator\n")
        )
        .unwrap();

        stdout.flush().unwrap();
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.row < 0
            || pos.row as usize >= self.rows
            || pos.column < 0
            || pos.column as usize >= self.columns
        {
            return None;
        }

        Some(pos.row as usize * self.columns + pos.column as usize)
    }

    fn checked_index(&self, pos: Position) -> usize {
        match self.index(pos) {
            Some(index) => index,
            None => panic!(
                "Position ({}, {}) is outside the {}x{} grid",
                pos.row, pos.column, self.rows, self.columns
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_parsing_a_layout_the_grid_has_the_correct_dimensions() {
        let layout = "\
            rows 2
            cols 3
            m .G.
            m L..";
        let grid = Grid::parse(layout);

        assert_eq!(grid.dimensions(), (2, 3));
    }

    #[test]
    fn when_parsing_a_layout_each_cell_holds_the_correct_species() {
        let layout = "\
            rows 2
            cols 3
            m .G.
            m L..";
        let grid = Grid::parse(layout);

        assert_eq!(grid.state(Position::new(0, 0)), CellState::Empty);
        assert_eq!(grid.state(Position::new(0, 1)), CellState::Prey);
        assert_eq!(grid.state(Position::new(0, 2)), CellState::Empty);
        assert_eq!(grid.state(Position::new(1, 0)), CellState::Predator);
        assert_eq!(grid.state(Position::new(1, 1)), CellState::Empty);
    }

    #[test]
    fn when_classifying_positions_outside_the_grid_they_are_walls() {
        let grid = Grid::new(3, 3);

        assert_eq!(grid.state(Position::new(-1, 0)), CellState::Wall);
        assert_eq!(grid.state(Position::new(0, -1)), CellState::Wall);
        assert_eq!(grid.state(Position::new(3, 0)), CellState::Wall);
        assert_eq!(grid.state(Position::new(0, 3)), CellState::Wall);
    }

    #[test]
    fn when_placing_an_agent_it_occupies_the_cell() {
        let mut grid = Grid::new(2, 2);

        grid.place(Position::new(1, 1), Agent::prey()).unwrap();

        assert_eq!(grid.state(Position::new(1, 1)), CellState::Prey);
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn when_placing_an_agent_outside_the_grid_an_error_is_returned() {
        let mut grid = Grid::new(2, 2);

        let result = grid.place(Position::new(2, 0), Agent::prey());

        assert!(matches!(result, Err(GameError::OutOfBounds { .. })));
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn when_placing_onto_an_occupied_cell_the_occupant_is_overwritten() {
        let mut grid = Grid::new(2, 2);
        let pos = Position::new(0, 0);
        grid.place(pos, Agent::prey()).unwrap();

        grid.place(pos, Agent::predator()).unwrap();

        assert_eq!(grid.state(pos), CellState::Predator);
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn when_clearing_a_cell_it_becomes_empty() {
        let layout = "\
            rows 2
            cols 2
            m G.
            m ..";
        let mut grid = Grid::parse(layout);

        grid.clear(Position::new(0, 0));

        assert_eq!(grid.state(Position::new(0, 0)), CellState::Empty);
    }

    #[test]
    fn when_taking_an_agent_the_cell_empties_and_the_agent_is_returned() {
        let layout = "\
            rows 2
            cols 2
            m .L
            m ..";
        let mut grid = Grid::parse(layout);
        let id = grid.agent(Position::new(0, 1)).unwrap().id().to_string();

        let taken = grid.take(Position::new(0, 1));

        assert_eq!(taken.unwrap().id(), id);
        assert_eq!(grid.state(Position::new(0, 1)), CellState::Empty);
    }

    #[test]
    fn when_relocating_an_agent_it_keeps_its_identity_and_overwrites_the_target() {
        let layout = "\
            rows 1
            cols 3
            m LG.";
        let mut grid = Grid::parse(layout);
        let id = grid.agent(Position::new(0, 0)).unwrap().id().to_string();

        grid.relocate(Position::new(0, 0), Position::new(0, 1));

        assert_eq!(grid.state(Position::new(0, 0)), CellState::Empty);
        assert_eq!(grid.state(Position::new(0, 1)), CellState::Predator);
        assert_eq!(grid.agent(Position::new(0, 1)).unwrap().id(), id);
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn when_counting_species_the_live_populations_are_returned() {
        let layout = "\
            rows 3
            cols 3
            m G.L
            m .G.
            m G.L";
        let grid = Grid::parse(layout);

        assert_eq!(grid.prey_count(), 3);
        assert_eq!(grid.predator_count(), 2);
        assert_eq!(grid.occupied_count(), 5);
    }

    #[test]
    fn when_collecting_agents_their_positions_are_reported_in_row_major_order() {
        let layout = "\
            rows 2
            cols 3
            m G.L
            m ..G";
        let grid = Grid::parse(layout);

        let agents = grid.agents();

        assert_eq!(agents.len(), 3);
        assert!(agents[0].0.is_prey());
        assert_eq!(agents[0].1, Position::new(0, 0));
        assert!(agents[1].0.is_predator());
        assert_eq!(agents[1].1, Position::new(0, 2));
        assert!(agents[2].0.is_prey());
        assert_eq!(agents[2].1, Position::new(1, 2));
    }

    #[test]
    fn when_rendering_a_frame_each_cell_maps_to_its_classification_letter() {
        let layout = "\
            rows 2
            cols 3
            m G.L
            m ..G";
        let grid = Grid::parse(layout);

        assert_eq!(grid.frame(), vec!["G", "E", "L", "E", "E", "G"]);
    }

    #[test]
    fn when_resetting_turn_guards_every_agent_may_act_again() {
        let layout = "\
            rows 1
            cols 2
            m GL";
        let mut grid = Grid::parse(layout);

        grid.reset_turn_guards();

        assert!(!grid.agent(Position::new(0, 0)).unwrap().turn_taken);
        assert!(!grid.agent(Position::new(0, 1)).unwrap().turn_taken);
    }
}
