use chrono::{DateTime, Local, NaiveDate, Utc};
use furio_executor::StepReport;
use furio_scheduler::ScheduleState;
use serde::Serialize;
use uuid::Uuid;

/// Title of the report for `date`, as `Furio Report dd/mm/yyyy`.
pub fn report_title(date: NaiveDate) -> String {
    format!("Furio Report {}", date.format("%d/%m/%Y"))
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub run_id: Uuid,
    pub title: String,
    /// When the run was fired; the title date is taken from it.
    pub fired_at: DateTime<Utc>,
    /// When the report was assembled, after every step settled.
    pub generated_at: DateTime<Utc>,
    /// Name of the policy that ran.
    pub policy: String,
    pub steps: Vec<StepReport>,
    /// Schedule after this run, absent for one-off runs.
    pub schedule: Option<ScheduleState>,
    /// Token price as returned by the price source.
    pub price: Option<serde_json::Value>,
}

impl ActionReport {
    pub fn new(
        policy: impl Into<String>,
        steps: Vec<StepReport>,
        schedule: Option<ScheduleState>,
        fired_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            title: report_title(fired_at.with_timezone(&Local).date_naive()),
            fired_at,
            generated_at: Utc::now(),
            policy: policy.into(),
            steps,
            schedule,
            price: None,
        }
    }

    /// Subject line for delivery.
    pub fn subject(&self) -> String {
        match self.title.strip_prefix("Furio Report ") {
            Some(date) => format!("Furio Report: {}", date),
            None => self.title.clone(),
        }
    }

    /// Attach `explorer_url`/<hash> links to every successful write.
    pub fn link_transactions(&mut self, explorer_url: &str) {
        for step in &mut self.steps {
            for outcome in &mut step.batch.outcomes {
                outcome.link_transaction(explorer_url);
            }
        }
    }

    pub fn failure_count(&self) -> usize {
        self.steps.iter().map(|s| s.batch.failures()).sum()
    }

    /// Pretty JSON body.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use furio_executor::{Account, AccountOutcome, BatchReport, OutcomeStatus, SigningKey};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn step() -> StepReport {
        let a = Account::new(1, "0xFdD831b51DCdA2be256Edf12Cd81C6Af79b6D7Df", SigningKey::new("k"));
        let b = Account::new(2, "0x70997970C51812dc3A010C7d01b50e0d17dc79C8", SigningKey::new("k"));
        let ok = AccountOutcome {
            index: 1,
            wallet: a.mask(),
            status: OutcomeStatus::Success {
                balance: dec!(120.5),
                tx_reference: "0xabc".to_string(),
                confirmed: true,
                readings: BTreeMap::new(),
            },
            tries: 2,
            explorer_link: None,
            attempts: Vec::new(),
        };
        StepReport {
            name: "vault-compound".to_string(),
            call: "vault.compound".to_string(),
            batch: BatchReport::new(vec![
                ok,
                AccountOutcome::failure(&b, "confirmation timed out after 1200s"),
            ]),
            average_target: Some("100 FUR".to_string()),
        }
    }

    #[test]
    fn test_title_format() {
        let date = NaiveDate::from_ymd_opt(2022, 7, 4).unwrap();
        assert_eq!(report_title(date), "Furio Report 04/07/2022");
    }

    #[test]
    fn test_subject_from_title() {
        let mut report = ActionReport::new("compound", Vec::new(), None, Utc::now());
        report.title = report_title(NaiveDate::from_ymd_opt(2022, 12, 25).unwrap());
        assert_eq!(report.subject(), "Furio Report: 25/12/2022");
    }

    #[test]
    fn test_title_uses_fire_date_not_completion() {
        let fired_at = Local
            .with_ymd_and_hms(2022, 7, 4, 23, 55, 0)
            .unwrap()
            .with_timezone(&Utc);
        let report = ActionReport::new("compound", Vec::new(), None, fired_at);

        assert_eq!(report.title, "Furio Report 04/07/2022");
        assert_eq!(report.fired_at, fired_at);
        assert!(report.generated_at > fired_at);
    }

    #[test]
    fn test_links_point_at_successful_writes() {
        let mut report = ActionReport::new("compound", vec![step()], None, Utc::now());
        report.link_transactions("https://bscscan.com/tx");

        let outcomes = &report.steps[0].batch.outcomes;
        assert_eq!(
            outcomes[0].explorer_link.as_deref(),
            Some("https://bscscan.com/tx/0xabc")
        );
        assert!(outcomes[1].explorer_link.is_none());

        let json: serde_json::Value =
            serde_json::from_str(&report.to_pretty_json().unwrap()).unwrap();
        assert_eq!(
            json["steps"][0]["outcomes"][0]["explorer_link"],
            "https://bscscan.com/tx/0xabc"
        );
        assert!(json["steps"][0]["outcomes"][1].get("explorer_link").is_none());
    }

    #[test]
    fn test_json_shape() {
        let report = ActionReport::new("compound", vec![step()], None, Utc::now());
        let json: serde_json::Value =
            serde_json::from_str(&report.to_pretty_json().unwrap()).unwrap();

        let step = &json["steps"][0];
        assert_eq!(step["call"], "vault.compound");
        assert_eq!(step["average_balance"], "120.5");
        assert_eq!(step["average_target"], "100 FUR");
        assert_eq!(step["outcomes"][0]["wallet"], "0xFdD...b6D7Df");
        assert_eq!(step["outcomes"][0]["status"], "success");
        assert_eq!(step["outcomes"][1]["status"], "failure");
        assert_eq!(step["outcomes"][1]["wallet"], "0x709...dc79C8");
        assert!(json["price"].is_null());
        assert_eq!(report.failure_count(), 1);
    }

    #[test]
    fn test_report_never_contains_full_address() {
        let report = ActionReport::new("compound", vec![step()], None, Utc::now());
        let text = report.to_pretty_json().unwrap();
        assert!(!text.contains("0xFdD831b51DCdA2be256Edf12Cd81C6Af79b6D7Df"));
        assert!(!text.contains("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"));
    }
}
