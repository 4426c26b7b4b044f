// libs/appointment-cell/src/services/lifecycle.rs
use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Status transition rules for appointments.
///
/// `scheduled` and `confirmed` are the two live states; `completed`,
/// `cancelled` and `no-show` are terminal and accept no further change.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Statuses the given status may move to.
    pub fn valid_transitions(&self, from: AppointmentStatus) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match from {
            Scheduled => &[Confirmed, Cancelled, NoShow],
            Confirmed => &[Completed, Cancelled, NoShow],
            Completed | Cancelled | NoShow => &[],
        }
    }

    /// Rejects any status move outside the transition table.
    pub fn validate_status_transition(
        &self,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if self.valid_transitions(from).contains(&to) {
            Ok(())
        } else {
            Err(AppointmentError::InvalidStatusTransition(from))
        }
    }

    /// Rejects edits to an appointment that has already reached a terminal
    /// status.
    pub fn ensure_mutable(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        if appointment.status.is_terminal() {
            return Err(AppointmentError::ValidationError(format!(
                "Appointment in status '{}' can no longer be modified",
                appointment.status
            )));
        }
        Ok(())
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn scheduled_transitions() {
        let svc = AppointmentLifecycleService::new();
        assert!(svc.validate_status_transition(Scheduled, Confirmed).is_ok());
        assert!(svc.validate_status_transition(Scheduled, Cancelled).is_ok());
        assert!(svc.validate_status_transition(Scheduled, NoShow).is_ok());
        // Completion requires confirmation first.
        assert!(svc.validate_status_transition(Scheduled, Completed).is_err());
        assert!(svc.validate_status_transition(Scheduled, Scheduled).is_err());
    }

    #[test]
    fn confirmed_transitions() {
        let svc = AppointmentLifecycleService::new();
        assert!(svc.validate_status_transition(Confirmed, Completed).is_ok());
        assert!(svc.validate_status_transition(Confirmed, Cancelled).is_ok());
        assert!(svc.validate_status_transition(Confirmed, NoShow).is_ok());
        assert!(svc.validate_status_transition(Confirmed, Scheduled).is_err());
    }

    #[test]
    fn terminal_statuses_accept_nothing() {
        let svc = AppointmentLifecycleService::new();
        for terminal in [Completed, Cancelled, NoShow] {
            assert!(svc.valid_transitions(terminal).is_empty());
            for target in [Scheduled, Confirmed, Completed, Cancelled, NoShow] {
                assert!(svc.validate_status_transition(terminal, target).is_err());
            }
        }
    }

    #[test]
    fn invalid_transition_reports_current_status() {
        let svc = AppointmentLifecycleService::new();
        match svc.validate_status_transition(Cancelled, Confirmed) {
            Err(AppointmentError::InvalidStatusTransition(from)) => assert_eq!(from, Cancelled),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
