//! Step submissions and their local validation.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::state::OnboardingStep;
use crate::error::OnboardingError;

/// Form data submitted for one onboarding step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum StepSubmission {
    Verify {
        code: String,
    },
    Referral {
        #[serde(default)]
        code: Option<String>,
    },
    BeeName {
        name: String,
    },
    Country {
        code: String,
    },
    Phone {
        number: String,
    },
    TaxInfo {
        tax_id: String,
    },
    Agreements {
        terms: bool,
        privacy: bool,
        risk_disclosure: bool,
    },
}

impl StepSubmission {
    /// The step this submission belongs to.
    pub fn step(&self) -> OnboardingStep {
        match self {
            Self::Verify { .. } => OnboardingStep::Verify,
            Self::Referral { .. } => OnboardingStep::Referral,
            Self::BeeName { .. } => OnboardingStep::BeeName,
            Self::Country { .. } => OnboardingStep::Country,
            Self::Phone { .. } => OnboardingStep::Phone,
            Self::TaxInfo { .. } => OnboardingStep::TaxInfo,
            Self::Agreements { .. } => OnboardingStep::Agreements,
        }
    }
}

/// Format checks run before anything is sent to the backend.
#[derive(Debug, Clone)]
pub struct StepValidator {
    verify_code: Regex,
    bee_name: Regex,
    country: Regex,
    phone: Regex,
    tax_id: Regex,
}

impl Default for StepValidator {
    fn default() -> Self {
        Self {
            verify_code: Regex::new(r"^[0-9]{6}$").unwrap(),
            bee_name: Regex::new(r"^[A-Za-z0-9_-]{3,20}$").unwrap(),
            country: Regex::new(r"^[A-Z]{2}$").unwrap(),
            phone: Regex::new(r"^\+[1-9][0-9]{6,14}$").unwrap(),
            tax_id: Regex::new(r"^[A-Za-z0-9-]{4,20}$").unwrap(),
        }
    }
}

impl StepValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a submission and return it in normalized form.
    pub fn validate(&self, submission: StepSubmission) -> Result<StepSubmission, OnboardingError> {
        match submission {
            StepSubmission::Verify { code } => {
                let code = code.trim().to_string();
                if !self.verify_code.is_match(&code) {
                    return Err(OnboardingError::invalid("code", "must be 6 digits"));
                }
                Ok(StepSubmission::Verify { code })
            }
            StepSubmission::Referral { code } => {
                let code = code
                    .map(|c| c.trim().to_uppercase())
                    .filter(|c| !c.is_empty());
                Ok(StepSubmission::Referral { code })
            }
            StepSubmission::BeeName { name } => {
                let name = name.trim().to_string();
                if !self.bee_name.is_match(&name) {
                    return Err(OnboardingError::invalid(
                        "name",
                        "must be 3-20 letters, digits, '_' or '-'",
                    ));
                }
                Ok(StepSubmission::BeeName { name })
            }
            StepSubmission::Country { code } => {
                let code = code.trim().to_ascii_uppercase();
                if !self.country.is_match(&code) {
                    return Err(OnboardingError::invalid(
                        "country",
                        "must be a two-letter ISO 3166-1 code",
                    ));
                }
                Ok(StepSubmission::Country { code })
            }
            StepSubmission::Phone { number } => {
                let number: String = number
                    .chars()
                    .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
                    .collect();
                if !self.phone.is_match(&number) {
                    return Err(OnboardingError::invalid(
                        "phone",
                        "must be in international format, e.g. +14155550100",
                    ));
                }
                Ok(StepSubmission::Phone { number })
            }
            StepSubmission::TaxInfo { tax_id } => {
                let tax_id = tax_id.trim().to_string();
                if !self.tax_id.is_match(&tax_id) {
                    return Err(OnboardingError::invalid(
                        "tax_id",
                        "must be 4-20 letters, digits or '-'",
                    ));
                }
                Ok(StepSubmission::TaxInfo { tax_id })
            }
            StepSubmission::Agreements {
                terms,
                privacy,
                risk_disclosure,
            } => {
                let missing: Vec<&str> = [
                    ("terms", terms),
                    ("privacy", privacy),
                    ("risk_disclosure", risk_disclosure),
                ]
                .into_iter()
                .filter(|(_, accepted)| !accepted)
                .map(|(name, _)| name)
                .collect();
                if !missing.is_empty() {
                    return Err(OnboardingError::invalid(
                        "agreements",
                        format!("not accepted: {}", missing.join(", ")),
                    ));
                }
                Ok(StepSubmission::Agreements {
                    terms,
                    privacy,
                    risk_disclosure,
                })
            }
        }
    }
}
