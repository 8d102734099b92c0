//! Three-stage booking form: passenger details, payment, confirmation.
//!
//! Every transition is a pure function of the current state and an event.
//! Rejected events return a [`WizardError`] and leave the caller's state
//! untouched, which is how "disabled" controls surface to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    BookingConfirmation, PassengerField, PassengerInfo, PassengerTitle, PaymentMethod,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Details,
    Payment,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub flight_id: String,
    pub passengers: Vec<PassengerInfo>,
    pub payment_method: PaymentMethod,
    pub agree_terms: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWizard {
    pub step: WizardStep,
    pub draft: BookingDraft,
    pub processing: bool,
    pub confirmation: Option<BookingConfirmation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    UpdatePassenger {
        index: usize,
        field: PassengerField,
        value: String,
    },
    Continue,
    Back,
    SelectPaymentMethod(PaymentMethod),
    SetAgreeTerms(bool),
    BeginPayment,
    PaymentSucceeded { reference: String },
    PaymentCancelled,
    PaymentFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("action not available at the {0:?} step")]
    WrongStep(WizardStep),
    #[error("passenger {0} does not exist")]
    UnknownPassenger(usize),
    #[error("invalid passenger title: {0}")]
    InvalidTitle(String),
    #[error("every passenger needs first name, last name, email, phone and date of birth")]
    DetailsIncomplete,
    #[error("terms of service must be accepted before paying")]
    TermsNotAccepted,
    #[error("a payment is already in progress")]
    PaymentInFlight,
    #[error("no payment is in progress")]
    NotProcessing,
}

/// Gate for the continue action: all required fields are non-empty.
pub fn details_complete(passengers: &[PassengerInfo]) -> bool {
    passengers.iter().all(PassengerInfo::is_complete)
}

/// Largest party the booking form accepts.
pub const MAX_PASSENGERS: usize = 9;

impl BookingWizard {
    /// Opens a wizard with one default passenger record per seat. The count
    /// is clamped to `1..=MAX_PASSENGERS`.
    pub fn open(flight_id: impl Into<String>, passengers: usize) -> Self {
        Self {
            step: WizardStep::Details,
            draft: BookingDraft {
                flight_id: flight_id.into(),
                passengers: vec![PassengerInfo::default(); passengers.clamp(1, MAX_PASSENGERS)],
                payment_method: PaymentMethod::default(),
                agree_terms: false,
            },
            processing: false,
            confirmation: None,
        }
    }

    pub fn passenger_count(&self) -> usize {
        self.draft.passengers.len()
    }

    pub fn lead_passenger(&self) -> &PassengerInfo {
        // open() guarantees at least one passenger
        &self.draft.passengers[0]
    }

    pub fn can_continue(&self) -> bool {
        self.step == WizardStep::Details && details_complete(&self.draft.passengers)
    }

    pub fn can_pay(&self) -> bool {
        self.step == WizardStep::Payment && self.draft.agree_terms && !self.processing
    }

    pub fn total_amount(&self, unit_price: i64) -> i64 {
        unit_price * self.passenger_count() as i64
    }

    /// Amount in minor currency units (kobo, cents).
    pub fn amount_minor(&self, unit_price: i64) -> i64 {
        self.total_amount(unit_price) * 100
    }

    pub fn apply(&self, event: WizardEvent) -> Result<Self, WizardError> {
        let mut next = self.clone();

        match event {
            WizardEvent::UpdatePassenger {
                index,
                field,
                value,
            } => {
                next.expect_step(WizardStep::Details)?;
                let passenger = next
                    .draft
                    .passengers
                    .get_mut(index)
                    .ok_or(WizardError::UnknownPassenger(index))?;
                set_field(passenger, field, value)?;
            }
            WizardEvent::Continue => {
                next.expect_step(WizardStep::Details)?;
                if !details_complete(&next.draft.passengers) {
                    return Err(WizardError::DetailsIncomplete);
                }
                next.step = WizardStep::Payment;
            }
            WizardEvent::Back => {
                next.expect_step(WizardStep::Payment)?;
                if next.processing {
                    return Err(WizardError::PaymentInFlight);
                }
                next.step = WizardStep::Details;
            }
            WizardEvent::SelectPaymentMethod(method) => {
                next.expect_step(WizardStep::Payment)?;
                if next.processing {
                    return Err(WizardError::PaymentInFlight);
                }
                next.draft.payment_method = method;
            }
            WizardEvent::SetAgreeTerms(agree) => {
                next.expect_step(WizardStep::Payment)?;
                if next.processing {
                    return Err(WizardError::PaymentInFlight);
                }
                next.draft.agree_terms = agree;
            }
            WizardEvent::BeginPayment => {
                next.expect_step(WizardStep::Payment)?;
                if next.processing {
                    return Err(WizardError::PaymentInFlight);
                }
                if !next.draft.agree_terms {
                    return Err(WizardError::TermsNotAccepted);
                }
                next.processing = true;
            }
            WizardEvent::PaymentSucceeded { reference } => {
                next.expect_processing()?;
                next.processing = false;
                next.step = WizardStep::Confirm;
                next.confirmation = Some(BookingConfirmation {
                    passengers: next.draft.passengers.clone(),
                    payment_complete: true,
                    booking_reference: reference,
                });
            }
            WizardEvent::PaymentCancelled | WizardEvent::PaymentFailed => {
                next.expect_processing()?;
                next.processing = false;
            }
        }

        Ok(next)
    }

    fn expect_step(&self, step: WizardStep) -> Result<(), WizardError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WizardError::WrongStep(self.step))
        }
    }

    fn expect_processing(&self) -> Result<(), WizardError> {
        if self.step == WizardStep::Payment && self.processing {
            Ok(())
        } else {
            Err(WizardError::NotProcessing)
        }
    }
}

fn set_field(
    passenger: &mut PassengerInfo,
    field: PassengerField,
    value: String,
) -> Result<(), WizardError> {
    match field {
        PassengerField::Title => {
            passenger.title =
                PassengerTitle::parse(&value).ok_or(WizardError::InvalidTitle(value))?;
        }
        PassengerField::FirstName => passenger.first_name = value,
        PassengerField::LastName => passenger.last_name = value,
        PassengerField::Email => passenger.email = value,
        PassengerField::Phone => passenger.phone = value,
        PassengerField::DateOfBirth => passenger.date_of_birth = value,
        PassengerField::SpecialAssistance => {
            passenger.special_assistance = if value.trim().is_empty() {
                None
            } else {
                Some(value)
            };
        }
    }
    Ok(())
}
