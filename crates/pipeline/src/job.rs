//! Per-region job state
//!
//! A job is one (country, region, scenario) tuple. Its state is never
//! stored: it is recovered from which stage artifacts exist, so a run
//! interrupted anywhere resumes at the first missing artifact.

use crate::store::{ArtifactKey, ArtifactStore};
use std::fmt;

/// Identity of one region job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    pub iso3: String,
    pub gid_id: String,
    pub scenario: String,
}

impl JobKey {
    pub fn new(iso3: impl Into<String>, gid_id: impl Into<String>, scenario: impl Into<String>) -> Self {
        Self {
            iso3: iso3.into(),
            gid_id: gid_id.into(),
            scenario: scenario.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.iso3, self.gid_id, self.scenario)
    }
}

/// Stages of a region job, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobState {
    Pending,
    BoundaryReady,
    HazardClipped,
    HazardVectorized,
    PopulationReady,
    Overlaid,
    StatisticsWritten,
}

impl JobState {
    pub const ALL: [JobState; 7] = [
        JobState::Pending,
        JobState::BoundaryReady,
        JobState::HazardClipped,
        JobState::HazardVectorized,
        JobState::PopulationReady,
        JobState::Overlaid,
        JobState::StatisticsWritten,
    ];

    /// State reached after this one, `None` when finished
    pub fn next(self) -> Option<JobState> {
        let i = JobState::ALL.iter().position(|s| *s == self)?;
        JobState::ALL.get(i + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == JobState::StatisticsWritten
    }

    /// Artifact whose existence means this state has been reached
    pub fn gate(self, job: &JobKey) -> Option<ArtifactKey> {
        let (iso3, gid_id, scenario) = (job.iso3.clone(), job.gid_id.clone(), job.scenario.clone());
        let key = match self {
            JobState::Pending => return None,
            JobState::BoundaryReady => ArtifactKey::Regions { iso3 },
            JobState::HazardClipped => ArtifactKey::HazardRaster { iso3, scenario, gid_id },
            JobState::HazardVectorized => ArtifactKey::HazardVector { iso3, scenario, gid_id },
            JobState::PopulationReady => ArtifactKey::PopulationVector { iso3, gid_id },
            JobState::Overlaid => ArtifactKey::Exposure { iso3, scenario, gid_id },
            JobState::StatisticsWritten => ArtifactKey::RegionStats { iso3, scenario, gid_id },
        };
        Some(key)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "PENDING",
            JobState::BoundaryReady => "BOUNDARY_READY",
            JobState::HazardClipped => "HAZARD_CLIPPED",
            JobState::HazardVectorized => "HAZARD_VECTORIZED",
            JobState::PopulationReady => "POPULATION_READY",
            JobState::Overlaid => "OVERLAID",
            JobState::StatisticsWritten => "STATISTICS_WRITTEN",
        };
        f.write_str(name)
    }
}

/// Furthest state whose artifact, and those of every earlier state, exist
pub fn resume_state<S: ArtifactStore + ?Sized>(store: &S, job: &JobKey) -> JobState {
    let mut reached = JobState::Pending;
    while let Some(next) = reached.next() {
        match next.gate(job) {
            Some(key) if store.exists(&key) => reached = next,
            _ => break,
        }
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn job() -> JobKey {
        JobKey::new("BGD", "BGD.1_1", "rp100")
    }

    #[test]
    fn test_order() {
        assert_eq!(JobState::Pending.next(), Some(JobState::BoundaryReady));
        assert_eq!(JobState::Overlaid.next(), Some(JobState::StatisticsWritten));
        assert_eq!(JobState::StatisticsWritten.next(), None);
        assert!(JobState::HazardClipped < JobState::Overlaid);
        assert!(JobState::StatisticsWritten.is_terminal());
    }

    #[test]
    fn test_resume_from_artifacts() {
        let mut store = MemoryStore::new();
        let job = job();
        assert_eq!(resume_state(&store, &job), JobState::Pending);

        for state in [JobState::BoundaryReady, JobState::HazardClipped] {
            store.write_bytes(&state.gate(&job).unwrap(), b"x").unwrap();
        }
        assert_eq!(resume_state(&store, &job), JobState::HazardClipped);

        // A later artifact without its predecessor does not advance the job
        store
            .write_bytes(&JobState::Overlaid.gate(&job).unwrap(), b"x")
            .unwrap();
        assert_eq!(resume_state(&store, &job), JobState::HazardClipped);
    }

    #[test]
    fn test_population_gate_is_shared_across_scenarios() {
        let a = JobKey::new("BGD", "BGD.1_1", "rp100");
        let b = JobKey::new("BGD", "BGD.1_1", "rp1000");
        assert_eq!(
            JobState::PopulationReady.gate(&a),
            JobState::PopulationReady.gate(&b)
        );
        assert_ne!(JobState::HazardClipped.gate(&a), JobState::HazardClipped.gate(&b));
    }

    #[test]
    fn test_display() {
        assert_eq!(job().to_string(), "BGD/BGD.1_1/rp100");
        assert_eq!(JobState::HazardVectorized.to_string(), "HAZARD_VECTORIZED");
    }
}
