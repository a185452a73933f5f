use crate::model::RunPhase;
use std::time::Duration;

/// One row of the run timeline: the snapshot contents that become current
/// when the step applies, and how long the step stays current before the
/// next one does. The last step's dwell is unused.
#[derive(Debug, Clone, Copy)]
pub struct PhaseStep {
    pub phase: RunPhase,
    pub progress: u8,
    pub message: &'static str,
    pub items_processed: u32,
    pub items_total: u32,
    pub dwell: Duration,
}

/// The demo run timeline. Consecutive rows may share a phase: those are
/// mid-phase progress updates and carry their item counters forward
/// rather than resetting them.
pub const DEMO_SCHEDULE: &[PhaseStep] = &[
    PhaseStep {
        phase: RunPhase::Syncing,
        progress: 5,
        message: "Syncing community inventory from the builder feed...",
        items_processed: 0,
        items_total: 12,
        dwell: Duration::from_secs(2),
    },
    PhaseStep {
        phase: RunPhase::Scouting,
        progress: 20,
        message: "Scouting for competitors within the search radius...",
        items_processed: 0,
        items_total: 54,
        dwell: Duration::from_secs(3),
    },
    PhaseStep {
        phase: RunPhase::Scraping,
        progress: 45,
        message: "Running the headless scraper against competitor sites...",
        items_processed: 0,
        items_total: 2,
        dwell: Duration::from_secs(2),
    },
    PhaseStep {
        phase: RunPhase::Scraping,
        progress: 60,
        message: "Extracting specs and promotions...",
        items_processed: 1,
        items_total: 2,
        dwell: Duration::from_secs(2),
    },
    PhaseStep {
        phase: RunPhase::Scraping,
        progress: 75,
        message: "Scraping complete. Processing data...",
        items_processed: 2,
        items_total: 2,
        dwell: Duration::from_secs(1),
    },
    PhaseStep {
        phase: RunPhase::Analyzing,
        progress: 90,
        message: "Drafting coordinator notes...",
        items_processed: 0,
        items_total: 1,
        dwell: Duration::from_secs(2),
    },
    PhaseStep {
        phase: RunPhase::Completed,
        progress: 100,
        message: "CMA run complete",
        items_processed: 0,
        items_total: 0,
        dwell: Duration::ZERO,
    },
];

/// Total time from start until the final step applies.
pub fn total_duration(steps: &[PhaseStep]) -> Duration {
    steps
        .iter()
        .take(steps.len().saturating_sub(1))
        .map(|s| s.dwell)
        .sum()
}

/// Time from start until the first step of `phase` applies, or `None`
/// if the schedule never reaches it.
pub fn offset_of_phase(steps: &[PhaseStep], phase: RunPhase) -> Option<Duration> {
    let mut offset = Duration::ZERO;
    for step in steps {
        if step.phase == phase {
            return Some(offset);
        }
        offset += step.dwell;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_schedule_is_monotonic_and_terminates_at_full_progress() {
        for pair in DEMO_SCHEDULE.windows(2) {
            assert!(pair[0].progress < pair[1].progress);
            assert!(pair[0].phase.ordinal() <= pair[1].phase.ordinal());
        }
        let last = DEMO_SCHEDULE.last().unwrap();
        assert_eq!(last.phase, RunPhase::Completed);
        assert_eq!(last.progress, 100);
    }

    #[test]
    fn item_counters_stay_within_totals() {
        for step in DEMO_SCHEDULE {
            if step.items_total > 0 {
                assert!(step.items_processed <= step.items_total);
            }
        }
    }

    #[test]
    fn phase_offsets_accumulate_dwells() {
        assert_eq!(
            offset_of_phase(DEMO_SCHEDULE, RunPhase::Syncing),
            Some(Duration::ZERO)
        );
        assert_eq!(
            offset_of_phase(DEMO_SCHEDULE, RunPhase::Scraping),
            Some(Duration::from_secs(5))
        );
        assert_eq!(offset_of_phase(DEMO_SCHEDULE, RunPhase::Failed), None);
        assert_eq!(total_duration(DEMO_SCHEDULE), Duration::from_secs(12));
    }
}
