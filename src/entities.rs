use crossterm::style::Color;
use uuid::Uuid;

/// How many generations a prey waits between breeding attempts.
pub const PREY_BREED_CAP: usize = 3;
/// How many generations a predator waits between breeding attempts.
pub const PREDATOR_BREED_CAP: usize = 8;
/// How many generations a predator survives without feeding.
pub const PREDATOR_STARVE_CAP: usize = 3;

/// The species of an agent, fixed at creation.
///
/// Species-specific state lives on the variant: only predators carry a
/// starvation clock.
#[derive(Clone, Debug, PartialEq)]
pub enum Species {
    Prey,
    Predator { starve_cooldown: usize },
}

impl Species {
    pub fn breed_cap(&self) -> usize {
        match self {
            Species::Prey => PREY_BREED_CAP,
            Species::Predator { .. } => PREDATOR_BREED_CAP,
        }
    }

    /// Single-letter classification used in exported frames.
    pub fn letter(&self) -> &'static str {
        match self {
            Species::Prey => "G",
            Species::Predator { .. } => "L",
        }
    }

    /// Glyph used when drawing the grid to the console.
    pub fn glyph(&self) -> char {
        match self {
            Species::Prey => 'O',
            Species::Predator { .. } => 'X',
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Species::Prey => Color::Green,
            Species::Predator { .. } => Color::Red,
        }
    }
}

/// A single inhabitant of the grid.
///
/// The grid cell that holds the agent is the source of truth for its
/// location; positions are passed alongside agents wherever behavior needs
/// them.
#[derive(Clone, Debug)]
pub struct Agent {
    id: String,
    pub(crate) species: Species,
    pub(crate) breed_cooldown: usize,
    // Set once the agent has taken its turn (and at birth, so a child first
    // acts in the generation after it was spawned). Cleared at the start of
    // every sweep.
    pub(crate) turn_taken: bool,
}

impl Agent {
    pub fn prey() -> Agent {
        Agent::new(Species::Prey)
    }

    pub fn predator() -> Agent {
        Agent::new(Species::Predator {
            starve_cooldown: PREDATOR_STARVE_CAP,
        })
    }

    fn new(species: Species) -> Agent {
        let breed_cooldown = species.breed_cap();
        Agent {
            id: Uuid::new_v4().to_string(),
            species,
            breed_cooldown,
            turn_taken: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn species(&self) -> &Species {
        &self.species
    }

    pub fn is_prey(&self) -> bool {
        matches!(self.species, Species::Prey)
    }

    pub fn is_predator(&self) -> bool {
        matches!(self.species, Species::Predator { .. })
    }

    /// Advances the breeding clock by one turn.
    ///
    /// Returns `true` when the clock reached zero this turn; the clock is
    /// reset to the species cap either way, so a breeding attempt is
    /// consumed even when no child can be placed.
    pub(crate) fn tick_breed_clock(&mut self) -> bool {
        self.breed_cooldown -= 1;
        if self.breed_cooldown == 0 {
            self.breed_cooldown = self.species.breed_cap();
            return true;
        }
        false
    }

    /// Advances the starvation clock by one turn. Returns `true` when the
    /// predator starved. No-op for prey.
    pub(crate) fn tick_starve_clock(&mut self) -> bool {
        match &mut self.species {
            Species::Predator { starve_cooldown } => {
                *starve_cooldown -= 1;
                *starve_cooldown == 0
            }
            Species::Prey => false,
        }
    }

    /// Winds the starvation clock back to its cap after a successful feed.
    pub(crate) fn reset_starve_clock(&mut self) {
        if let Species::Predator { starve_cooldown } = &mut self.species {
            *starve_cooldown = PREDATOR_STARVE_CAP;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_creating_a_prey_the_breed_clock_starts_at_the_species_cap() {
        let prey = Agent::prey();

        assert!(prey.is_prey());
        assert_eq!(prey.breed_cooldown, PREY_BREED_CAP);
    }

    #[test]
    fn when_creating_a_predator_both_clocks_start_at_their_caps() {
        let predator = Agent::predator();

        assert!(predator.is_predator());
        assert_eq!(predator.breed_cooldown, PREDATOR_BREED_CAP);
        assert_eq!(
            predator.species,
            Species::Predator {
                starve_cooldown: PREDATOR_STARVE_CAP
            }
        );
    }

    #[test]
    fn when_creating_agents_each_gets_a_unique_id() {
        let first = Agent::prey();
        let second = Agent::prey();

        assert_eq!(first.id().len(), 36);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn when_an_agent_is_created_it_waits_for_the_next_generation() {
        assert!(Agent::prey().turn_taken);
        assert!(Agent::predator().turn_taken);
    }

    #[test]
    fn when_the_breed_clock_reaches_zero_it_resets_and_reports_a_due_birth() {
        let mut prey = Agent::prey();

        assert!(!prey.tick_breed_clock());
        assert!(!prey.tick_breed_clock());
        assert!(prey.tick_breed_clock());
        assert_eq!(prey.breed_cooldown, PREY_BREED_CAP);
    }

    #[test]
    fn when_the_starve_clock_reaches_zero_the_predator_is_starved() {
        let mut predator = Agent::predator();

        assert!(!predator.tick_starve_clock());
        assert!(!predator.tick_starve_clock());
        assert!(predator.tick_starve_clock());
    }

    #[test]
    fn when_a_predator_feeds_the_starve_clock_is_wound_back() {
        let mut predator = Agent::predator();
        predator.tick_starve_clock();
        predator.tick_starve_clock();

        predator.reset_starve_clock();

        assert_eq!(
            predator.species,
            Species::Predator {
                starve_cooldown: PREDATOR_STARVE_CAP
            }
        );
    }

    #[test]
    fn when_ticking_a_prey_starve_clock_nothing_happens() {
        let mut prey = Agent::prey();

        assert!(!prey.tick_starve_clock());
        assert!(!prey.tick_starve_clock());
        assert!(!prey.tick_starve_clock());
        assert!(!prey.tick_starve_clock());
    }
}
