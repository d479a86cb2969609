//! Seminar status derived from its three approvals, and the dates on which all three assigned
//! lecturers are available.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::models::{Approval, ApprovalStatus, Seminar, SeminarStatus};

/// Number of approval records every seminar carries (two advisors and one examiner)
pub const APPROVALS_PER_SEMINAR: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("seminar has {0} approval records instead of 3")]
    Integrity(usize),
}

/// Dates present in every one of the three lists, sorted ascending.
///
/// Each list is treated as a set. If there are not exactly three lists, or one of them is empty,
/// the result is empty.
pub fn common_dates(lists: &[&[NaiveDate]]) -> Vec<NaiveDate> {
    if lists.len() != APPROVALS_PER_SEMINAR || lists.iter().any(|l| l.is_empty()) {
        return Vec::new();
    }

    let mut common: BTreeSet<NaiveDate> = lists[0].iter().copied().collect();

    for list in &lists[1..] {
        let other: BTreeSet<NaiveDate> = list.iter().copied().collect();
        common = common.intersection(&other).copied().collect();
    }

    common.into_iter().collect()
}

/// Scheduling candidates for a seminar: empty until all three lecturers approved.
pub fn common_availability(approvals: &[&Approval]) -> Vec<NaiveDate> {
    let unanimous = approvals.len() == APPROVALS_PER_SEMINAR
        && approvals
            .iter()
            .all(|a| a.status == ApprovalStatus::Approved);

    if !unanimous {
        return Vec::new();
    }

    let lists: Vec<&[NaiveDate]> = approvals
        .iter()
        .map(|a| a.available_dates.as_slice())
        .collect();

    common_dates(&lists)
}

/// Rule table: any rejection wins, then unanimity, otherwise still waiting.
pub fn derive_status(approvals: &[&Approval]) -> Result<SeminarStatus, LifecycleError> {
    if approvals.len() != APPROVALS_PER_SEMINAR {
        return Err(LifecycleError::Integrity(approvals.len()));
    }

    let status = if approvals
        .iter()
        .any(|a| a.status == ApprovalStatus::Rejected)
    {
        SeminarStatus::NeedsRevision
    } else if approvals
        .iter()
        .all(|a| a.status == ApprovalStatus::Approved)
    {
        SeminarStatus::Approved
    } else {
        SeminarStatus::PendingVerification
    };

    Ok(status)
}

/// Recomputes the seminar status from its approvals and stores it on the seminar.
///
/// The `approved_at` stamp is only set on the first aggregation that yields `Approved`, so
/// running the aggregator again does not move it. Leaving `Approved` clears the stamp and any
/// admin verification, since the seminar has to go through the queue again.
pub fn apply_lifecycle(
    seminar: &mut Seminar,
    approvals: &[&Approval],
    now: DateTime<Utc>,
) -> Result<SeminarStatus, LifecycleError> {
    let status = derive_status(approvals)?;

    if status == SeminarStatus::Approved {
        if seminar.approved_at.is_none() {
            seminar.approved_at = Some(now);
        }
    } else {
        seminar.approved_at = None;
        seminar.verified_at = None;
        seminar.verified_by = None;
    }

    seminar.status = status;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalRole, SeminarType};
    use chrono::TimeZone;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn approval(role: ApprovalRole, status: ApprovalStatus, days: &[u32]) -> Approval {
        Approval {
            id: 0,
            seminar_id: 0,
            lecturer_id: 0,
            role,
            status,
            available_dates: days.iter().map(|d| date(*d)).collect(),
            comment: None,
            decided_at: None,
        }
    }

    fn three(statuses: [ApprovalStatus; 3]) -> Vec<Approval> {
        vec![
            approval(ApprovalRole::Advisor1, statuses[0], &[4, 5]),
            approval(ApprovalRole::Advisor2, statuses[1], &[5, 6]),
            approval(ApprovalRole::Examiner, statuses[2], &[5]),
        ]
    }

    fn seminar() -> Seminar {
        Seminar {
            id: 0,
            student_id: 10,
            advisor1_id: 1,
            advisor2_id: 2,
            examiner_id: 3,
            title: "Graph coloring heuristics".to_string(),
            seminar_type: SeminarType::Proposal,
            abstract_text: String::new(),
            status: SeminarStatus::PendingVerification,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            approved_at: None,
            verified_at: None,
            verified_by: None,
            cancellation: None,
        }
    }

    #[test]
    fn any_rejection_needs_revision() {
        use ApprovalStatus::*;

        let all = [Pending, Approved, Rejected];
        for a in all {
            for b in all {
                for c in all {
                    if ![a, b, c].contains(&Rejected) {
                        continue;
                    }
                    let approvals = three([a, b, c]);
                    let refs: Vec<&Approval> = approvals.iter().collect();
                    assert_eq!(derive_status(&refs), Ok(SeminarStatus::NeedsRevision));
                }
            }
        }
    }

    #[test]
    fn unanimous_approval_approves() {
        use ApprovalStatus::*;

        let approvals = three([Approved, Approved, Approved]);
        let refs: Vec<&Approval> = approvals.iter().collect();
        assert_eq!(derive_status(&refs), Ok(SeminarStatus::Approved));
    }

    #[test]
    fn pending_without_rejection_keeps_waiting() {
        use ApprovalStatus::*;

        let approvals = three([Approved, Pending, Approved]);
        let refs: Vec<&Approval> = approvals.iter().collect();
        assert_eq!(derive_status(&refs), Ok(SeminarStatus::PendingVerification));
    }

    #[test]
    fn missing_approval_is_an_integrity_error() {
        use ApprovalStatus::*;

        let approvals = three([Approved, Approved, Approved]);
        let refs: Vec<&Approval> = approvals.iter().take(2).collect();
        assert_eq!(derive_status(&refs), Err(LifecycleError::Integrity(2)));
        assert!(common_availability(&refs).is_empty());
    }

    #[test]
    fn approval_stamp_is_set_once() {
        use ApprovalStatus::*;

        let approvals = three([Approved, Approved, Approved]);
        let refs: Vec<&Approval> = approvals.iter().collect();
        let mut seminar = seminar();

        let first = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 3, 3, 9, 0, 0).unwrap();

        apply_lifecycle(&mut seminar, &refs, first).unwrap();
        apply_lifecycle(&mut seminar, &refs, second).unwrap();

        assert_eq!(seminar.status, SeminarStatus::Approved);
        assert_eq!(seminar.approved_at, Some(first));
    }

    #[test]
    fn leaving_approved_clears_verification() {
        use ApprovalStatus::*;

        let mut seminar = seminar();
        seminar.status = SeminarStatus::Approved;
        seminar.approved_at = Some(Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap());
        seminar.verified_at = seminar.approved_at;
        seminar.verified_by = Some(0);

        let approvals = three([Approved, Pending, Approved]);
        let refs: Vec<&Approval> = approvals.iter().collect();
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();

        apply_lifecycle(&mut seminar, &refs, now).unwrap();

        assert_eq!(seminar.status, SeminarStatus::PendingVerification);
        assert!(seminar.approved_at.is_none());
        assert!(seminar.verified_by.is_none());
    }

    #[test]
    fn common_dates_intersects_and_sorts() {
        let a = [date(9), date(3), date(5), date(3)];
        let b = [date(5), date(9), date(1)];
        let c = [date(9), date(5), date(5)];

        assert_eq!(common_dates(&[&a, &b, &c]), vec![date(5), date(9)]);
    }

    #[test]
    fn common_dates_is_commutative_and_idempotent() {
        let a = [date(1), date(2), date(3)];
        let b = [date(3), date(2)];
        let c = [date(2), date(3), date(4)];

        let expected = common_dates(&[&a, &b, &c]);
        assert_eq!(expected, vec![date(2), date(3)]);
        assert_eq!(common_dates(&[&c, &a, &b]), expected);
        assert_eq!(common_dates(&[&b, &c, &a]), expected);
        assert_eq!(common_dates(&[&a, &b, &c]), expected);
    }

    #[test]
    fn empty_list_yields_nothing() {
        let a = [date(1), date(2)];
        let b = [date(1), date(2)];

        assert!(common_dates(&[&a, &b, &[]]).is_empty());
        assert!(common_dates(&[&a, &b]).is_empty());
    }

    #[test]
    fn availability_requires_unanimity() {
        use ApprovalStatus::*;

        let pending = three([Approved, Pending, Approved]);
        let refs: Vec<&Approval> = pending.iter().collect();
        assert!(common_availability(&refs).is_empty());

        let approved = three([Approved, Approved, Approved]);
        let refs: Vec<&Approval> = approved.iter().collect();
        assert_eq!(common_availability(&refs), vec![date(5)]);
    }
}
