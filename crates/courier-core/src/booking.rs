//! # Booking State Machine
//!
//! Pure transition rules for a booking. The database layer loads a booking
//! inside a transaction, asks this module what is allowed, then writes.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PENDING ─► SEARCHING_DRIVER ─► DRIVER_ASSIGNED ─► DRIVER_ARRIVED      │
//! │                                                        │                │
//! │            DELIVERED ◄── IN_TRANSIT ◄── PICKUP_DONE ◄──┘                │
//! │            (terminal)                                                   │
//! │                                                                         │
//! │  Any non-terminal state ──► CANCELLED (terminal)                        │
//! │                                                                         │
//! │  Forward moves may skip states. Nothing leaves a terminal state.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Booking, BookingStatus, PaymentMethod, PaymentStatus};
use crate::DEFAULT_ASSIGNED_ETA_MINUTES;

// =============================================================================
// Transition Table
// =============================================================================

impl BookingStatus {
    /// All states in lifecycle order, `Cancelled` last.
    pub const ALL: [BookingStatus; 8] = [
        BookingStatus::Pending,
        BookingStatus::SearchingDriver,
        BookingStatus::DriverAssigned,
        BookingStatus::DriverArrived,
        BookingStatus::PickupDone,
        BookingStatus::InTransit,
        BookingStatus::Delivered,
        BookingStatus::Cancelled,
    ];

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Delivered | BookingStatus::Cancelled)
    }

    /// Position on the delivery chain. `None` for `Cancelled`, which sits
    /// beside the chain rather than on it.
    fn chain_position(self) -> Option<u8> {
        match self {
            BookingStatus::Pending => Some(0),
            BookingStatus::SearchingDriver => Some(1),
            BookingStatus::DriverAssigned => Some(2),
            BookingStatus::DriverArrived => Some(3),
            BookingStatus::PickupDone => Some(4),
            BookingStatus::InTransit => Some(5),
            BookingStatus::Delivered => Some(6),
            BookingStatus::Cancelled => None,
        }
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.chain_position(), next.chain_position()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }

    /// Whether a driver must be on the booking before entering this state.
    pub fn requires_driver(self) -> bool {
        matches!(
            self,
            BookingStatus::DriverAssigned
                | BookingStatus::DriverArrived
                | BookingStatus::PickupDone
                | BookingStatus::InTransit
        )
    }

    /// Human-readable phase shown to the requester.
    pub fn phase_message(self) -> &'static str {
        match self {
            BookingStatus::Pending => "Booking received, waiting to be processed",
            BookingStatus::SearchingDriver => "Searching for a nearby driver",
            BookingStatus::DriverAssigned => "Driver is on the way to the pickup location",
            BookingStatus::DriverArrived => "Driver has arrived at the pickup location",
            BookingStatus::PickupDone => "Goods picked up",
            BookingStatus::InTransit => "On the way to the delivery location",
            BookingStatus::Delivered => "Delivered",
            BookingStatus::Cancelled => "Booking cancelled",
        }
    }
}

// =============================================================================
// OTP
// =============================================================================

/// Random four-digit delivery OTP, zero padded.
pub fn generate_otp() -> String {
    let n: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("{:04}", n)
}

/// Checks the shape of a submitted OTP.
pub fn validate_otp(otp: &str) -> Result<(), ValidationError> {
    let otp = otp.trim();
    if otp.is_empty() {
        return Err(ValidationError::Required {
            field: "otp".to_string(),
        });
    }
    if otp.len() != 4 || !otp.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "otp".to_string(),
            reason: "must be 4 digits".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Access
// =============================================================================

/// Only the requester.
pub fn ensure_requester(booking: &Booking, user_id: &str) -> CoreResult<()> {
    if booking.user_id == user_id {
        Ok(())
    } else {
        Err(CoreError::forbidden("Booking", &booking.id))
    }
}

/// The requester or the assigned driver's user.
pub fn ensure_participant(
    booking: &Booking,
    user_id: &str,
    driver_user_id: Option<&str>,
) -> CoreResult<()> {
    if booking.user_id == user_id || driver_user_id == Some(user_id) {
        Ok(())
    } else {
        Err(CoreError::forbidden("Booking", &booking.id))
    }
}

// =============================================================================
// Guards
// =============================================================================

fn ensure_not_terminal(booking: &Booking) -> CoreResult<()> {
    match booking.status {
        BookingStatus::Delivered => Err(CoreError::AlreadyDelivered(booking.id.clone())),
        BookingStatus::Cancelled => Err(CoreError::AlreadyCancelled(booking.id.clone())),
        _ => Ok(()),
    }
}

/// Checks an OTP-gated delivery confirmation.
pub fn check_verify_delivery(booking: &Booking, otp: &str) -> CoreResult<()> {
    ensure_not_terminal(booking)?;
    validate_otp(otp)?;
    if booking.delivery_otp != otp.trim() {
        return Err(CoreError::InvalidOtp);
    }
    Ok(())
}

/// Checks a generic status update. `driver_known` is true when a driver is
/// already on the booking or supplied with the update.
pub fn check_status_update(
    booking: &Booking,
    next: BookingStatus,
    driver_known: bool,
) -> CoreResult<()> {
    ensure_not_terminal(booking)?;
    if !booking.status.can_transition_to(next) {
        return Err(CoreError::InvalidTransition {
            from: booking.status,
            to: next,
        });
    }
    if next.requires_driver() && !driver_known {
        return Err(CoreError::DriverRequired);
    }
    Ok(())
}

/// Payment status once the booking is delivered: cash is collected at the
/// door, everything else was settled beforehand.
pub fn payment_status_on_delivery(booking: &Booking) -> PaymentStatus {
    match booking.payment_method {
        PaymentMethod::Cash => PaymentStatus::Completed,
        PaymentMethod::Wallet | PaymentMethod::Card => booking.payment_status,
    }
}

/// What a cancellation has to do besides flipping the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelPlan {
    /// Amount to return to the requester's wallet.
    pub refund: Option<Money>,
}

/// Checks a cancellation and works out the refund.
pub fn plan_cancel(booking: &Booking) -> CoreResult<CancelPlan> {
    if booking.is_terminal() {
        return Err(CoreError::NotCancellable {
            booking_id: booking.id.clone(),
            status: booking.status,
        });
    }

    let refund = match (booking.payment_method, booking.payment_status) {
        (PaymentMethod::Wallet, PaymentStatus::Completed) => Some(booking.charge_amount()),
        _ => None,
    };

    Ok(CancelPlan { refund })
}

/// Checks that a booking can still be paid from the wallet.
pub fn check_payable(booking: &Booking) -> CoreResult<Money> {
    if booking.payment_status == PaymentStatus::Completed {
        return Err(CoreError::AlreadyPaid(booking.id.clone()));
    }
    if booking.status == BookingStatus::Cancelled
        || booking.payment_status == PaymentStatus::Refunded
    {
        return Err(CoreError::NotPayable(booking.id.clone()));
    }
    Ok(booking.working_price())
}

/// Checks that a promo code can still be attached to the booking.
///
/// An invoiced booking has its price fixed, so it takes no further discount.
pub fn check_discountable(booking: &Booking, invoiced: bool) -> CoreResult<()> {
    if invoiced || booking.is_terminal() || booking.payment_status != PaymentStatus::Pending {
        return Err(CoreError::NotPayable(booking.id.clone()));
    }
    if booking.promo_code.is_some() {
        return Err(CoreError::PromoAlreadyApplied(booking.id.clone()));
    }
    Ok(())
}

// =============================================================================
// ETA Projection
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EtaProjection {
    pub status: BookingStatus,
    pub eta_minutes: Option<i64>,
    pub message: String,
}

/// Maps the current status to a phase message and ETA. No side effects.
pub fn project_eta(booking: &Booking) -> EtaProjection {
    let eta_minutes = match booking.status {
        BookingStatus::DriverAssigned => {
            Some(booking.eta_minutes.unwrap_or(DEFAULT_ASSIGNED_ETA_MINUTES))
        }
        BookingStatus::DriverArrived | BookingStatus::Delivered | BookingStatus::Cancelled => {
            Some(0)
        }
        _ => booking.eta_minutes.or(Some(booking.duration_minutes)),
    };

    EtaProjection {
        status: booking.status,
        eta_minutes,
        message: booking.status.phase_message().to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn booking(status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: "b-1".into(),
            user_id: "u-1".into(),
            pickup_address_id: "a-1".into(),
            delivery_address_id: "a-2".into(),
            driver_id: None,
            vehicle_type: "bike".into(),
            scheduled_at: None,
            estimated_price_cents: 10_000,
            discount_cents: 0,
            final_price_cents: None,
            promo_code: None,
            distance_meters: 5_000,
            duration_minutes: 25,
            eta_minutes: None,
            status,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Pending,
            delivery_otp: "0427".into(),
            delivery_proof_url: None,
            cancel_reason: None,
            created_at: now,
            delivered_at: None,
            cancelled_at: None,
            updated_at: now,
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for next in BookingStatus::ALL {
            assert!(!BookingStatus::Delivered.can_transition_to(next));
            assert!(!BookingStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_cancel_reachable_from_every_open_state() {
        for from in BookingStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(from.can_transition_to(BookingStatus::Cancelled), "{:?}", from);
        }
    }

    #[test]
    fn test_chain_only_moves_forward() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::SearchingDriver));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::DriverAssigned));
        assert!(BookingStatus::InTransit.can_transition_to(BookingStatus::Delivered));
        assert!(!BookingStatus::InTransit.can_transition_to(BookingStatus::PickupDone));
        assert!(!BookingStatus::PickupDone.can_transition_to(BookingStatus::PickupDone));
    }

    #[test]
    fn test_otp_shape() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert!(validate_otp(&otp).is_ok(), "{}", otp);
        }
        assert!(validate_otp("").is_err());
        assert!(validate_otp("12a4").is_err());
        assert!(validate_otp("12345").is_err());
    }

    #[test]
    fn test_verify_delivery_guards() {
        let open = booking(BookingStatus::InTransit);
        assert!(check_verify_delivery(&open, "0427").is_ok());
        assert!(matches!(
            check_verify_delivery(&open, "1111"),
            Err(CoreError::InvalidOtp)
        ));
        assert!(matches!(
            check_verify_delivery(&booking(BookingStatus::Delivered), "0427"),
            Err(CoreError::AlreadyDelivered(_))
        ));
        assert!(matches!(
            check_verify_delivery(&booking(BookingStatus::Cancelled), "0427"),
            Err(CoreError::AlreadyCancelled(_))
        ));
    }

    #[test]
    fn test_status_update_requires_driver() {
        let pending = booking(BookingStatus::Pending);
        assert!(matches!(
            check_status_update(&pending, BookingStatus::DriverAssigned, false),
            Err(CoreError::DriverRequired)
        ));
        assert!(check_status_update(&pending, BookingStatus::DriverAssigned, true).is_ok());
        assert!(check_status_update(&pending, BookingStatus::SearchingDriver, false).is_ok());
    }

    #[test]
    fn test_cash_completes_on_delivery_card_untouched() {
        let cash = booking(BookingStatus::InTransit);
        assert_eq!(payment_status_on_delivery(&cash), PaymentStatus::Completed);

        let mut card = booking(BookingStatus::InTransit);
        card.payment_method = PaymentMethod::Card;
        assert_eq!(payment_status_on_delivery(&card), PaymentStatus::Pending);
    }

    #[test]
    fn test_cancel_plan_refunds_paid_wallet_bookings_only() {
        let mut paid = booking(BookingStatus::DriverAssigned);
        paid.payment_method = PaymentMethod::Wallet;
        paid.payment_status = PaymentStatus::Completed;
        paid.final_price_cents = Some(9_000);
        assert_eq!(
            plan_cancel(&paid).unwrap().refund,
            Some(Money::from_cents(9_000))
        );

        let unpaid = booking(BookingStatus::Pending);
        assert_eq!(plan_cancel(&unpaid).unwrap().refund, None);

        assert!(matches!(
            plan_cancel(&booking(BookingStatus::Delivered)),
            Err(CoreError::NotCancellable { .. })
        ));
    }

    #[test]
    fn test_discount_window() {
        let open = booking(BookingStatus::Pending);
        assert!(check_discountable(&open, false).is_ok());
        assert!(matches!(
            check_discountable(&open, true),
            Err(CoreError::NotPayable(_))
        ));

        let mut promoted = booking(BookingStatus::DriverAssigned);
        promoted.promo_code = Some("SAVE10".into());
        assert!(matches!(
            check_discountable(&promoted, false),
            Err(CoreError::PromoAlreadyApplied(_))
        ));

        assert!(matches!(
            check_discountable(&booking(BookingStatus::Delivered), false),
            Err(CoreError::NotPayable(_))
        ));
    }

    #[test]
    fn test_eta_projection() {
        let mut b = booking(BookingStatus::DriverAssigned);
        assert_eq!(project_eta(&b).eta_minutes, Some(DEFAULT_ASSIGNED_ETA_MINUTES));
        b.eta_minutes = Some(7);
        assert_eq!(project_eta(&b).eta_minutes, Some(7));

        assert_eq!(project_eta(&booking(BookingStatus::DriverArrived)).eta_minutes, Some(0));
        assert_eq!(project_eta(&booking(BookingStatus::Cancelled)).eta_minutes, Some(0));

        let transit = booking(BookingStatus::InTransit);
        assert_eq!(project_eta(&transit).eta_minutes, Some(25));
        assert_eq!(project_eta(&transit).message, "On the way to the delivery location");
    }

    #[test]
    fn test_participant_access() {
        let b = booking(BookingStatus::Pending);
        assert!(ensure_requester(&b, "u-1").is_ok());
        assert!(ensure_requester(&b, "u-2").is_err());
        assert!(ensure_participant(&b, "driver-user", Some("driver-user")).is_ok());
        assert!(ensure_participant(&b, "stranger", Some("driver-user")).is_err());
    }
}
