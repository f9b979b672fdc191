use crate::actions::catalog::ActionKind;
use crate::core::types::ZoneId;
use crate::jobs::job::{Job, JobDetail, JobKind, JobTarget, TargetKind};

/// Relocation directive, synthesised on demand and never cached
pub fn move_job(zone: &ZoneId) -> Job {
    Job::new(
        JobKind::Move,
        JobTarget::Zone(zone.clone()),
        TargetKind::ZoneName,
        ActionKind::Move,
        JobDetail::Movement,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::job::JobFamily;

    #[test]
    fn test_move_job_targets_zone() {
        let job = move_job(&ZoneId::from("W5N5"));
        assert_eq!(job.family(), JobFamily::Movement);
        assert_eq!(job.target, JobTarget::Zone(ZoneId::from("W5N5")));
        assert!(!job.is_taken);
    }
}
