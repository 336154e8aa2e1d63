use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The fourteen states an order can occupy. The last six are terminal: once entered, every
/// further event on that order is logged and absorbed (I3) rather than acted on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Serialize, Deserialize)]
pub enum OrderState {
    Created,
    Submitting,
    Pending,
    PartialFilled,
    CancelSubmitting,
    Querying,
    RetryPending,
    ChasePending,
    Filled,
    Cancelled,
    PartialCancelled,
    CancelRejected,
    Rejected,
    Error,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled
                | OrderState::Cancelled
                | OrderState::PartialCancelled
                | OrderState::CancelRejected
                | OrderState::Rejected
                | OrderState::Error
        )
    }

    /// Whether this state still has a live order resting at the broker that a cancel request
    /// would target.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
            && !matches!(self, OrderState::RetryPending | OrderState::ChasePending | OrderState::Created)
    }
}

/// Every input the state machine can receive. Broker status codes are translated into these
/// before reaching the OSM (see [`crate::broker::translate_status`]); internal timers and the
/// retry loop also feed events directly.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Serialize, Deserialize)]
pub enum OrderEvent {
    Submit,
    Cancel,
    RtnPending,
    RtnAccepted,
    RtnRejected,
    RtnPartialFilled,
    RtnFilled,
    RtnCancelled,
    RtnPartialCancelled,
    RtnCancelRejected,
    RtnNotInQueue,
    TimeoutAck,
    TimeoutFill,
    TimeoutCancel,
    QueryOk,
    QueryFail,
    Retry,
    GiveUp,
}

/// Whether an unrecognised `(state, event)` pair raises an error or is silently logged and
/// ignored. Production runs `Tolerant`; the OSM's own test suite runs `Strict` so a transition
/// table regression fails loudly instead of drifting unnoticed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransitionMode {
    Strict,
    Tolerant,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UnhandledTransition {
    pub from: OrderState,
    pub event: OrderEvent,
}

impl std::fmt::Display for UnhandledTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no transition defined from {} on {}", self.from, self.event)
    }
}

impl std::error::Error for UnhandledTransition {}

/// Applies one event to `from`, returning the next state or an error describing the
/// unrecognised transition. In [`TransitionMode::Tolerant`] an unrecognised transition returns
/// `Ok(from)` unchanged (and the caller is expected to log it) instead of `Err`.
///
/// Terminal states absorb every event (I3): this is checked before the table lookup so adding
/// a new terminal state can never accidentally re-open it.
pub fn transition(from: OrderState, event: OrderEvent, mode: TransitionMode) -> Result<OrderState, UnhandledTransition> {
    use OrderEvent as E;
    use OrderState as S;

    if from.is_terminal() {
        return Ok(from);
    }

    let next = match (from, event) {
        (S::Created, E::Submit) => S::Submitting,

        (S::Submitting, E::RtnPending | E::RtnAccepted) => S::Pending,
        (S::Submitting, E::RtnRejected) => S::Rejected,
        (S::Submitting, E::RtnFilled) => S::Filled,
        (S::Submitting, E::TimeoutAck) => S::Querying,
        // Both promote_retry and resubmit_chase move to Submitting before attempting
        // broker.place_order, so a placement failure's give_up lands here, not on the state
        // the order was promoted from.
        (S::Submitting, E::GiveUp) => S::Error,

        (S::Pending, E::RtnPartialFilled) => S::PartialFilled,
        (S::Pending, E::RtnFilled) => S::Filled,
        (S::Pending, E::Cancel | E::TimeoutFill) => S::CancelSubmitting,

        (S::PartialFilled, E::RtnFilled) => S::Filled,
        (S::PartialFilled, E::Cancel | E::TimeoutFill) => S::CancelSubmitting,
        (S::PartialFilled, E::RtnNotInQueue) => S::PartialCancelled,

        // Cancel-while-fill race: a fill callback arriving during cancellation wins outright;
        // the cancel confirmation that follows lands on a terminal Filled and is absorbed.
        (S::CancelSubmitting, E::RtnFilled) => S::Filled,
        (S::CancelSubmitting, E::RtnCancelled) => S::Cancelled,
        (S::CancelSubmitting, E::RtnPartialCancelled) => S::PartialCancelled,
        (S::CancelSubmitting, E::TimeoutCancel) => S::Querying,

        (S::Querying, E::QueryOk) => S::RetryPending,
        (S::Querying, E::RtnFilled) => S::Filled,
        (S::Querying, E::RtnCancelled) => S::Cancelled,

        (S::RetryPending, E::Retry) => S::Submitting,
        (S::RetryPending, E::GiveUp) => S::Error,

        (S::ChasePending, E::Submit) => S::Submitting,

        _ => {
            return match mode {
                TransitionMode::Strict => Err(UnhandledTransition { from, event }),
                TransitionMode::Tolerant => Ok(from),
            }
        }
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderEvent as E;
    use OrderState as S;

    #[test]
    fn happy_path_full_fill() {
        let mut state = S::Created;
        for event in [E::Submit, E::RtnAccepted, E::RtnFilled] {
            state = transition(state, event, TransitionMode::Strict).unwrap();
        }
        assert_eq!(state, S::Filled);
    }

    #[test]
    fn cancel_while_fill_race_fill_wins() {
        let state = transition(S::CancelSubmitting, E::RtnFilled, TransitionMode::Strict).unwrap();
        assert_eq!(state, S::Filled);

        // a subsequent cancel confirmation on the now-terminal state is absorbed, not applied.
        let absorbed = transition(state, E::RtnCancelled, TransitionMode::Strict).unwrap();
        assert_eq!(absorbed, S::Filled);
    }

    #[test]
    fn terminal_states_absorb_every_event() {
        for terminal in [S::Filled, S::Cancelled, S::PartialCancelled, S::CancelRejected, S::Rejected, S::Error] {
            let result = transition(terminal, E::RtnFilled, TransitionMode::Strict).unwrap();
            assert_eq!(result, terminal);
        }
    }

    #[test]
    fn strict_mode_rejects_unknown_transition() {
        let result = transition(S::Created, E::RtnFilled, TransitionMode::Strict);
        assert!(result.is_err());
    }

    #[test]
    fn tolerant_mode_no_ops_unknown_transition() {
        let result = transition(S::Created, E::RtnFilled, TransitionMode::Tolerant).unwrap();
        assert_eq!(result, S::Created);
    }

    #[test]
    fn retry_pending_give_up_is_error() {
        let result = transition(S::RetryPending, E::GiveUp, TransitionMode::Strict).unwrap();
        assert_eq!(result, S::Error);
    }

    #[test]
    fn chase_pending_resubmits_on_submit() {
        let resubmitted = transition(S::ChasePending, E::Submit, TransitionMode::Strict).unwrap();
        assert_eq!(resubmitted, S::Submitting);
    }

    #[test]
    fn submitting_gives_up_on_broker_failure_after_a_promoted_resubmission() {
        // promote_retry and resubmit_chase both move to Submitting before the broker call, so a
        // placement failure's give_up is observed from here rather than from RetryPending or
        // ChasePending.
        let gave_up = transition(S::Submitting, E::GiveUp, TransitionMode::Strict).unwrap();
        assert_eq!(gave_up, S::Error);
    }

    #[test]
    fn partial_fill_then_cancel_then_not_in_queue() {
        let mut state = S::Created;
        for event in [E::Submit, E::RtnAccepted, E::RtnPartialFilled, E::Cancel] {
            state = transition(state, event, TransitionMode::Strict).unwrap();
        }
        assert_eq!(state, S::CancelSubmitting);
    }
}
