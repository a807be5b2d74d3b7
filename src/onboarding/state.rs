//! Onboarding steps and the fixed step ↔ route table.

use serde::{Deserialize, Serialize};

/// The steps of the onboarding flow, in their fixed order.
///
/// Progresses linearly: Verify → Referral → BeeName → Country → Phone →
/// TaxInfo → Agreements → Complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnboardingStep {
    Verify,
    Referral,
    BeeName,
    Country,
    Phone,
    TaxInfo,
    Agreements,
    Complete,
}

/// Number of defined steps.
pub const STEP_COUNT: u8 = 8;

/// Step number → route. Index `n - 1` holds the route of step `n`.
const ROUTES: [(OnboardingStep, &str); STEP_COUNT as usize] = [
    (OnboardingStep::Verify, "/onboarding/verify"),
    (OnboardingStep::Referral, "/onboarding/referral"),
    (OnboardingStep::BeeName, "/onboarding/bee-name"),
    (OnboardingStep::Country, "/onboarding/country"),
    (OnboardingStep::Phone, "/onboarding/phone"),
    (OnboardingStep::TaxInfo, "/onboarding/tax-info"),
    (OnboardingStep::Agreements, "/onboarding/agreements"),
    (OnboardingStep::Complete, "/onboarding/complete"),
];

impl OnboardingStep {
    pub const FIRST: OnboardingStep = OnboardingStep::Verify;
    pub const LAST: OnboardingStep = OnboardingStep::Complete;

    /// 1-based position in the flow.
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    /// Step for a 1-based number, if one is defined.
    pub fn from_number(n: u8) -> Option<Self> {
        let index = usize::from(n.checked_sub(1)?);
        ROUTES.get(index).map(|(step, _)| *step)
    }

    pub fn route(self) -> &'static str {
        ROUTES[usize::from(self.number() - 1)].1
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn prev(self) -> Option<Self> {
        Self::from_number(self.number() - 1)
    }

    /// Whether this is the final step of the flow.
    pub fn is_terminal(self) -> bool {
        self == Self::LAST
    }

    pub fn all() -> impl Iterator<Item = OnboardingStep> {
        ROUTES.iter().map(|(step, _)| *step)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::Referral => "referral",
            Self::BeeName => "bee-name",
            Self::Country => "country",
            Self::Phone => "phone",
            Self::TaxInfo => "tax-info",
            Self::Agreements => "agreements",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Route of a step.
pub fn step_to_route(step: OnboardingStep) -> &'static str {
    step.route()
}

/// Step mapped to a route, or `None` for routes outside the flow.
///
/// Query strings, fragments and a trailing slash are ignored.
pub fn route_to_step(route: &str) -> Option<OnboardingStep> {
    let path = route
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    ROUTES
        .iter()
        .find(|(_, r)| *r == path)
        .map(|(step, _)| *step)
}
