//! Pure transition rules for a service request.
//!
//! Nothing here touches the database: the persistent layer loads a
//! [`RequestState`], asks for a [`Step`] and writes the result back.

use models::service_request::{self, RequestStatus};

use crate::errors::ServiceError;

/// Which side of the exchange is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Owner,
    Requester,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestState {
    pub status: RequestStatus,
    pub owner_approved: bool,
    pub requester_approved: bool,
    pub owner_completed: bool,
    pub requester_completed: bool,
    pub proposed_minutes: Option<i64>,
    pub hours_owner_approved: bool,
    pub hours_requester_approved: bool,
    pub actual_minutes: Option<i64>,
}

impl From<&service_request::Model> for RequestState {
    fn from(m: &service_request::Model) -> Self {
        Self {
            status: m.status,
            owner_approved: m.owner_approved,
            requester_approved: m.requester_approved,
            owner_completed: m.owner_completed,
            requester_completed: m.requester_completed,
            proposed_minutes: m.proposed_minutes,
            hours_owner_approved: m.hours_owner_approved,
            hours_requester_approved: m.hours_requester_approved,
            actual_minutes: m.actual_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Repeat call; nothing to write.
    Unchanged,
    /// Flags changed, status did not.
    Updated,
    /// Status moved to the carried value.
    Advanced(RequestStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub state: RequestState,
    pub outcome: Outcome,
}

fn invalid(action: &str, from: RequestStatus) -> ServiceError {
    ServiceError::InvalidTransition(format!("cannot {action} a request that is {}", from.as_str()))
}

/// Owner's answer to a pending request. Capacity is checked by the caller.
pub fn set_status(state: RequestState, target: RequestStatus) -> Result<Step, ServiceError> {
    if !matches!(target, RequestStatus::Accepted | RequestStatus::Rejected) {
        return Err(ServiceError::Validation("status must be accepted or rejected".into()));
    }
    if state.status != RequestStatus::Pending {
        return Err(invalid("answer", state.status));
    }
    Ok(Step { state: RequestState { status: target, ..state }, outcome: Outcome::Advanced(target) })
}

pub fn approve_start(state: RequestState, party: Party) -> Result<Step, ServiceError> {
    let already = match party {
        Party::Owner => state.owner_approved,
        Party::Requester => state.requester_approved,
    };
    if already {
        return Ok(Step { state, outcome: Outcome::Unchanged });
    }
    if state.status != RequestStatus::Accepted {
        return Err(invalid("start", state.status));
    }
    let mut next = state;
    match party {
        Party::Owner => next.owner_approved = true,
        Party::Requester => next.requester_approved = true,
    }
    if next.owner_approved && next.requester_approved {
        next.status = RequestStatus::InProgress;
        return Ok(Step { state: next, outcome: Outcome::Advanced(RequestStatus::InProgress) });
    }
    Ok(Step { state: next, outcome: Outcome::Updated })
}

/// `Advanced(Completed)` is returned exactly once per request; the caller
/// settles the ledger on it.
pub fn mark_completed(state: RequestState, party: Party) -> Result<Step, ServiceError> {
    let already = match party {
        Party::Owner => state.owner_completed,
        Party::Requester => state.requester_completed,
    };
    if already {
        return Ok(Step { state, outcome: Outcome::Unchanged });
    }
    if state.status != RequestStatus::InProgress {
        return Err(invalid("complete", state.status));
    }
    let mut next = state;
    match party {
        Party::Owner => next.owner_completed = true,
        Party::Requester => next.requester_completed = true,
    }
    if next.owner_completed && next.requester_completed {
        next.status = RequestStatus::Completed;
        return Ok(Step { state: next, outcome: Outcome::Advanced(RequestStatus::Completed) });
    }
    Ok(Step { state: next, outcome: Outcome::Updated })
}

/// Convert a proposal in hours to whole minutes.
pub fn hours_to_minutes(hours: f64) -> Result<i64, ServiceError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(ServiceError::Validation("hours must be a positive number".into()));
    }
    let minutes = (hours * 60.0).round();
    if minutes < 1.0 || minutes > i64::MAX as f64 {
        return Err(ServiceError::Validation("hours out of range".into()));
    }
    Ok(minutes as i64)
}

/// A new proposal resets both approvals; the proposer does not implicitly agree.
pub fn propose_hours(state: RequestState, minutes: i64) -> Result<Step, ServiceError> {
    if state.status != RequestStatus::InProgress {
        return Err(invalid("negotiate hours on", state.status));
    }
    if minutes <= 0 {
        return Err(ServiceError::Validation("hours must be a positive number".into()));
    }
    let next = RequestState {
        proposed_minutes: Some(minutes),
        hours_owner_approved: false,
        hours_requester_approved: false,
        ..state
    };
    Ok(Step { state: next, outcome: Outcome::Updated })
}

/// Once both sides approved the current proposal it becomes the actual duration.
pub fn approve_hours(state: RequestState, party: Party) -> Result<Step, ServiceError> {
    let Some(proposed) = state.proposed_minutes else {
        return Err(ServiceError::Validation("no hours proposal to approve".into()));
    };
    let already = match party {
        Party::Owner => state.hours_owner_approved,
        Party::Requester => state.hours_requester_approved,
    };
    if already {
        return Ok(Step { state, outcome: Outcome::Unchanged });
    }
    if state.status != RequestStatus::InProgress {
        return Err(invalid("negotiate hours on", state.status));
    }
    let mut next = state;
    match party {
        Party::Owner => next.hours_owner_approved = true,
        Party::Requester => next.hours_requester_approved = true,
    }
    if next.hours_owner_approved && next.hours_requester_approved {
        next.actual_minutes = Some(proposed);
    }
    Ok(Step { state: next, outcome: Outcome::Updated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn accepted() -> RequestState {
        RequestState { status: RequestStatus::Accepted, ..RequestState::default() }
    }

    #[test]
    fn both_approvals_start_the_work() {
        let s = approve_start(accepted(), Party::Owner).unwrap();
        assert_eq!(s.outcome, Outcome::Updated);
        assert_eq!(s.state.status, RequestStatus::Accepted);
        let again = approve_start(s.state, Party::Owner).unwrap();
        assert_eq!(again.outcome, Outcome::Unchanged);
        let s = approve_start(s.state, Party::Requester).unwrap();
        assert_eq!(s.outcome, Outcome::Advanced(RequestStatus::InProgress));
    }

    #[test]
    fn approving_a_pending_request_is_invalid() {
        let err = approve_start(RequestState::default(), Party::Requester).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)));
    }

    #[test]
    fn set_status_only_from_pending() {
        let s = set_status(RequestState::default(), RequestStatus::Rejected).unwrap();
        assert_eq!(s.state.status, RequestStatus::Rejected);
        assert!(matches!(set_status(s.state, RequestStatus::Accepted), Err(ServiceError::InvalidTransition(_))));
        assert!(matches!(
            set_status(RequestState::default(), RequestStatus::Completed),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn repeat_completion_after_done_is_a_no_op() {
        let mut st = RequestState { status: RequestStatus::InProgress, ..RequestState::default() };
        st = mark_completed(st, Party::Owner).unwrap().state;
        let done = mark_completed(st, Party::Requester).unwrap();
        assert_eq!(done.outcome, Outcome::Advanced(RequestStatus::Completed));
        for party in [Party::Owner, Party::Requester] {
            assert_eq!(mark_completed(done.state, party).unwrap().outcome, Outcome::Unchanged);
        }
    }

    #[test]
    fn hours_agreement_needs_both_sides_of_the_latest_proposal() {
        let st = RequestState { status: RequestStatus::InProgress, ..RequestState::default() };
        assert!(matches!(approve_hours(st, Party::Owner), Err(ServiceError::Validation(_))));
        let st = propose_hours(st, 150).unwrap().state;
        let st = approve_hours(st, Party::Owner).unwrap().state;
        // A counter-proposal wipes the owner's approval.
        let st = propose_hours(st, 120).unwrap().state;
        assert!(!st.hours_owner_approved);
        let st = approve_hours(st, Party::Requester).unwrap().state;
        assert_eq!(st.actual_minutes, None);
        let st = approve_hours(st, Party::Owner).unwrap().state;
        assert_eq!(st.actual_minutes, Some(120));
    }

    #[test]
    fn hours_conversion_rejects_non_positive() {
        assert_eq!(hours_to_minutes(1.5).unwrap(), 90);
        assert!(hours_to_minutes(0.0).is_err());
        assert!(hours_to_minutes(-2.0).is_err());
        assert!(hours_to_minutes(f64::NAN).is_err());
        assert!(hours_to_minutes(0.001).is_err());
    }

    #[derive(Debug, Clone, Copy)]
    enum Action {
        Accept,
        Reject,
        Start(Party),
        Complete(Party),
        Propose(i64),
        ApproveHours(Party),
    }

    fn party() -> impl Strategy<Value = Party> {
        prop_oneof![Just(Party::Owner), Just(Party::Requester)]
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::Accept),
            Just(Action::Reject),
            party().prop_map(Action::Start),
            party().prop_map(Action::Complete),
            (1i64..600).prop_map(Action::Propose),
            party().prop_map(Action::ApproveHours),
        ]
    }

    fn apply(st: RequestState, a: Action) -> Result<Step, ServiceError> {
        match a {
            Action::Accept => set_status(st, RequestStatus::Accepted),
            Action::Reject => set_status(st, RequestStatus::Rejected),
            Action::Start(p) => approve_start(st, p),
            Action::Complete(p) => mark_completed(st, p),
            Action::Propose(m) => propose_hours(st, m),
            Action::ApproveHours(p) => approve_hours(st, p),
        }
    }

    fn allowed(from: RequestStatus, to: RequestStatus) -> bool {
        use RequestStatus::*;
        from == to
            || matches!(
                (from, to),
                (Pending, Accepted) | (Pending, Rejected) | (Accepted, InProgress) | (InProgress, Completed)
            )
    }

    proptest! {
        #[test]
        fn any_sequence_respects_the_state_graph(actions in proptest::collection::vec(action(), 0..40)) {
            let mut st = RequestState::default();
            let mut completions = 0;
            for a in actions {
                let before = st;
                match apply(st, a) {
                    Ok(step) => {
                        prop_assert!(allowed(before.status, step.state.status));
                        if step.outcome == Outcome::Unchanged {
                            prop_assert_eq!(step.state, before);
                        }
                        if step.outcome == Outcome::Advanced(RequestStatus::Completed) {
                            completions += 1;
                        }
                        st = step.state;
                    }
                    Err(_) => {}
                }
                if matches!(st.status, RequestStatus::InProgress | RequestStatus::Completed) {
                    prop_assert!(st.owner_approved && st.requester_approved);
                }
                if st.status == RequestStatus::Completed {
                    prop_assert!(st.owner_completed && st.requester_completed);
                }
                if st.actual_minutes.is_some() {
                    prop_assert!(st.status != RequestStatus::Pending && st.status != RequestStatus::Accepted);
                }
                if st.status.is_terminal() {
                    prop_assert!(before.status == st.status || !before.status.is_terminal());
                }
            }
            prop_assert!(completions <= 1);
        }
    }
}
