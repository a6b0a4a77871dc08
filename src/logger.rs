use crate::game::GameError;
use serde::Serialize;

pub fn create_stats_logger(
    prefix: Option<String>,
    rows: usize,
    columns: usize,
) -> Box<dyn StatsLogger> {
    match prefix {
        None => Box::new(NoOpStatsLogger {}),
        Some(prefix) => Box::new(CsvStatsLogger::new(prefix, rows, columns)),
    }
}

/// Sink for the per-generation statistics and frame snapshots of a run.
pub trait StatsLogger: Send + Sync {
    #[allow(unused_variables)]
    fn log_observation(&mut self, observation: Observation) {}

    #[allow(unused_variables)]
    fn log_frame(&mut self, frame: Vec<String>) {}

    fn clear(&mut self) {}

    fn save(&self) -> Result<(), GameError> {
        Ok(())
    }
}

/// One row of the exported statistics table.
#[derive(Clone, Debug, Serialize)]
pub struct Observation {
    #[serde(rename = "Generation")]
    pub generation: usize,
    #[serde(rename = "Prey")]
    pub prey: usize,
    #[serde(rename = "Predator")]
    pub predators: usize,
    #[serde(rename = "PreyBreedCount")]
    pub prey_births: usize,
    #[serde(rename = "PredatorBreedCount")]
    pub predator_births: usize,
    #[serde(rename = "EatCount")]
    pub predations: usize,
}

struct NoOpStatsLogger;
impl StatsLogger for NoOpStatsLogger {}

/// Buffers a run's observations and frames and writes them out as two CSV
/// tables on save: `<prefix>-stats.csv` with one counter row per recorded
/// generation, and `<prefix>-frames.csv` with one classification letter per
/// cell under `(row-column)` headers.
struct CsvStatsLogger {
    prefix: String,
    rows: usize,
    columns: usize,
    observations: Vec<Observation>,
    frames: Vec<Vec<String>>,
}

impl CsvStatsLogger {
    pub fn new(prefix: String, rows: usize, columns: usize) -> CsvStatsLogger {
        CsvStatsLogger {
            prefix,
            rows,
            columns,
            observations: Vec::new(),
            frames: Vec::new(),
        }
    }

    fn save_observations(&self) -> Result<(), GameError> {
        let path = format!("{}-stats.csv", self.prefix);
        let mut writer = csv::Writer::from_path(&path)?;

        for observation in &self.observations {
            writer.serialize(observation)?;
        }
        writer.flush().map_err(csv::Error::from)?;

        tracing::info!(path, "statistics table written");
        Ok(())
    }

    fn save_frames(&self) -> Result<(), GameError> {
        let path = format!("{}-frames.csv", self.prefix);
        let mut writer = csv::Writer::from_path(&path)?;

        let mut header = Vec::with_capacity(self.rows * self.columns);
        for row in 0..self.rows {
            for column in 0..self.columns {
                header.push(format!("({}-{})", row, column));
            }
        }
        writer.write_record(&header)?;

        for frame in &self.frames {
            writer.write_record(frame)?;
        }
        writer.flush().map_err(csv::Error::from)?;

        tracing::info!(path, "frame table written");
        Ok(())
    }
}

impl StatsLogger for CsvStatsLogger {
    fn log_observation(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    fn log_frame(&mut self, frame: Vec<String>) {
        self.frames.push(frame);
    }

    fn clear(&mut self) {
        self.observations.clear();
        self.frames.clear();
    }

    fn save(&self) -> Result<(), GameError> {
        self.save_observations()?;
        self.save_frames()
    }
}
