// 📝 Form State - Per-view state for the "add rule from transaction" dialog
// No process-wide state; one instance per open dialog, reset on close

use crate::merge::normalize_condition;

/// Inline message when required fields are missing
pub const MISSING_FIELDS_MESSAGE: &str = "Please select a category and enter a condition";

/// Why a submit attempt did not start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitBlocked {
    /// A previous submit is still running; the control stays disabled
    InFlight,
    /// Category or condition is blank
    MissingFields,
}

/// The validated inputs a started submit carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub category: String,
    pub condition: String,
}

/// State of one open add-rule dialog.
///
/// Opening from a transaction pre-fills the category and a normalized
/// copy of the description. While a submit is in flight further submits
/// are refused; a failed submit keeps the field values so the user can
/// retry, a successful one closes and resets everything.
#[derive(Debug, Clone, Default)]
pub struct AddRuleForm {
    pub selected_category: String,
    pub condition: String,
    pub error: Option<String>,
    in_flight: bool,
    open: bool,
}

impl AddRuleForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the dialog seeded from a transaction
    pub fn open_for(&mut self, category: Option<&str>, description: &str) {
        self.open = true;
        self.selected_category = category.unwrap_or("").to_string();
        self.condition = normalize_condition(description);
        self.error = None;
        self.in_flight = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Validate and mark the submit as started. Refuses while one is
    /// already running so a double click cannot create a second rule.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, SubmitBlocked> {
        if self.in_flight {
            return Err(SubmitBlocked::InFlight);
        }
        if self.selected_category.is_empty() || self.condition.trim().is_empty() {
            self.error = Some(MISSING_FIELDS_MESSAGE.to_string());
            return Err(SubmitBlocked::MissingFields);
        }

        self.in_flight = true;
        self.error = None;
        Ok(SubmitRequest {
            category: self.selected_category.clone(),
            condition: self.condition.trim().to_string(),
        })
    }

    /// Record a failed submit; field values stay intact for retry
    pub fn fail_submit(&mut self, message: impl Into<String>) {
        self.in_flight = false;
        self.error = Some(message.into());
    }

    /// Record a successful submit and close the dialog
    pub fn complete_submit(&mut self) {
        self.in_flight = false;
        self.close();
    }

    /// Reset every field and close
    pub fn close(&mut self) {
        *self = AddRuleForm::default();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_prefills_normalized_condition() {
        let mut form = AddRuleForm::new();
        form.open_for(Some("Food & Dining"), "UPI/SWIGGY*ORDER-4417");

        assert!(form.is_open());
        assert_eq!(form.selected_category, "Food & Dining");
        assert_eq!(form.condition, "upiswiggyorder4417");
        assert!(form.error.is_none());
    }

    #[test]
    fn test_missing_fields_blocked_with_message() {
        let mut form = AddRuleForm::new();
        form.open_for(None, "SOMETHING");
        // category missing
        assert_eq!(form.begin_submit(), Err(SubmitBlocked::MissingFields));
        assert_eq!(form.error.as_deref(), Some(MISSING_FIELDS_MESSAGE));
        assert!(!form.is_in_flight());

        // condition missing
        form.selected_category = "Travel".to_string();
        form.condition = "   ".to_string();
        assert_eq!(form.begin_submit(), Err(SubmitBlocked::MissingFields));
    }

    #[test]
    fn test_double_submit_refused() {
        let mut form = AddRuleForm::new();
        form.open_for(Some("Travel"), "UBER TRIP");

        let request = form.begin_submit().unwrap();
        assert_eq!(request.category, "Travel");
        assert_eq!(request.condition, "uber trip");
        assert!(form.is_in_flight());

        assert_eq!(form.begin_submit(), Err(SubmitBlocked::InFlight));
    }

    #[test]
    fn test_failed_submit_keeps_fields_for_retry() {
        let mut form = AddRuleForm::new();
        form.open_for(Some("Travel"), "UBER TRIP");
        form.begin_submit().unwrap();

        form.fail_submit("Failed to save rule. Please try again.");
        assert!(form.is_open());
        assert!(!form.is_in_flight());
        assert_eq!(form.selected_category, "Travel");
        assert_eq!(form.condition, "uber trip");
        assert!(form.error.is_some());

        // retry works now
        assert!(form.begin_submit().is_ok());
    }

    #[test]
    fn test_successful_submit_resets_and_closes() {
        let mut form = AddRuleForm::new();
        form.open_for(Some("Travel"), "UBER TRIP");
        form.begin_submit().unwrap();
        form.complete_submit();

        assert!(!form.is_open());
        assert!(form.selected_category.is_empty());
        assert!(form.condition.is_empty());
        assert!(form.error.is_none());
    }

    #[test]
    fn test_close_resets_everything() {
        let mut form = AddRuleForm::new();
        form.open_for(Some("Travel"), "UBER TRIP");
        form.error = Some("boom".to_string());
        form.close();

        assert!(!form.is_open());
        assert!(form.condition.is_empty());
        assert!(form.error.is_none());
    }
}
