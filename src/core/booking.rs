//! Booking business logic - Validates the pickup form and writes the booking.
//!
//! All checks run locally before the insert: a signed-in user, the required
//! fields, a positive weight, a known time slot and a pickup date that is not in the
//! past. On today's date the slot must not have ended yet. The pickup instant is
//! the chosen date combined with the start time parsed from the slot label,
//! interpreted in the configured pickup zone.
//!
//! On success the form is reset and the user's cached booking list is dropped. On a
//! backend rejection the form is left untouched so the user can retry.

use crate::{
    cache::{QueryCache, QueryKey},
    core::{dashboard, location::Place, session::AuthUser},
    entities::{BookingStatus, booking},
    errors::{Error, Result},
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::{Set, prelude::*};
use tracing::{info, warn};

/// The four daily pickup windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSlot {
    /// 9 AM to 12 PM
    Morning,
    /// 12 PM to 3 PM
    Midday,
    /// 3 PM to 6 PM
    Afternoon,
    /// 6 PM to 8 PM
    Evening,
}

impl TimeSlot {
    /// Every slot in display order.
    pub const ALL: [Self; 4] = [Self::Morning, Self::Midday, Self::Afternoon, Self::Evening];

    /// Label shown in the form and submitted back.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Morning => "9:00 AM - 12:00 PM",
            Self::Midday => "12:00 PM - 3:00 PM",
            Self::Afternoon => "3:00 PM - 6:00 PM",
            Self::Evening => "6:00 PM - 8:00 PM",
        }
    }

    /// Looks a slot up by its label, ignoring surrounding whitespace.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|slot| slot.label() == label)
    }
}

/// Parses the start time of a slot label such as `"9:00 AM - 12:00 PM"`.
pub fn parse_slot_start(label: &str) -> Result<NaiveTime> {
    parse_slot_bound(label, 0, "start")
}

/// Parses the end time of a slot label.
pub fn parse_slot_end(label: &str) -> Result<NaiveTime> {
    parse_slot_bound(label, 1, "end")
}

fn parse_slot_bound(label: &str, index: usize, which: &str) -> Result<NaiveTime> {
    let bound = label.split('-').nth(index).unwrap_or_default().trim();
    NaiveTime::parse_from_str(bound, "%I:%M %p").map_err(|e| Error::Validation {
        field: "preferred time",
        message: format!("cannot read {which} time from {label:?}: {e}"),
    })
}

fn local_instant(
    date: NaiveDate,
    time: NaiveTime,
    offset: FixedOffset,
) -> Result<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| Error::Validation {
            field: "preferred time",
            message: format!("{date} {time} is not a single instant"),
        })
}

/// Combines a date and a slot label into one pickup instant.
pub fn pickup_instant(
    date: NaiveDate,
    slot_label: &str,
    offset: FixedOffset,
) -> Result<DateTime<Utc>> {
    if TimeSlot::from_label(slot_label).is_none() {
        return Err(Error::Validation {
            field: "preferred time",
            message: format!("unknown time slot {slot_label:?}"),
        });
    }
    local_instant(date, parse_slot_start(slot_label)?, offset)
}

/// Raw pickup form input, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingForm {
    /// Selected category id
    pub category_id: String,
    /// Estimated weight in kg
    pub estimated_weight: String,
    /// Pickup address, typed or filled from the location picker
    pub address: String,
    /// Preferred date as `YYYY-MM-DD`
    pub preferred_date: String,
    /// Preferred slot label
    pub preferred_time: String,
    /// Optional notes
    pub notes: String,
}

/// Form input after local validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidBooking {
    /// Category being picked up
    pub category_id: Uuid,
    /// Estimated weight in kg, positive
    pub estimated_weight: f64,
    /// Trimmed pickup address
    pub address: String,
    /// Pickup instant
    pub pickup_time: DateTime<Utc>,
    /// Notes, `None` when blank
    pub notes: Option<String>,
}

impl BookingForm {
    /// Checks the form without touching the backend.
    ///
    /// # Errors
    /// * `Error::MissingFields` naming every empty required field
    /// * `Error::Validation` for a malformed weight, category, date or slot, a date
    ///   before today or a slot that ended before `now`
    pub fn validate(&self, now: DateTime<Utc>, offset: FixedOffset) -> Result<ValidBooking> {
        let required = [
            ("category", &self.category_id),
            ("estimated weight", &self.estimated_weight),
            ("address", &self.address),
            ("preferred date", &self.preferred_date),
            ("preferred time", &self.preferred_time),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingFields { fields: missing });
        }

        let estimated_weight = parse_weight(&self.estimated_weight)?;

        let category_id =
            Uuid::parse_str(self.category_id.trim()).map_err(|e| Error::Validation {
                field: "category",
                message: e.to_string(),
            })?;

        let date = NaiveDate::parse_from_str(self.preferred_date.trim(), "%Y-%m-%d").map_err(
            |e| Error::Validation {
                field: "preferred date",
                message: e.to_string(),
            },
        )?;
        if date < now.with_timezone(&offset).date_naive() {
            return Err(Error::Validation {
                field: "preferred date",
                message: format!("{date} is in the past"),
            });
        }

        let pickup_time = pickup_instant(date, &self.preferred_time, offset)?;
        let slot_end = local_instant(date, parse_slot_end(&self.preferred_time)?, offset)?;
        if slot_end <= now {
            return Err(Error::Validation {
                field: "preferred time",
                message: format!("{} on {date} has already ended", self.preferred_time.trim()),
            });
        }

        let notes = self.notes.trim();
        Ok(ValidBooking {
            category_id,
            estimated_weight,
            address: self.address.trim().to_string(),
            pickup_time,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        })
    }

    /// Fills the address from a resolved place.
    pub fn apply_place(&mut self, place: &Place) {
        self.address.clone_from(&place.address);
    }

    /// Clears every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn parse_weight(raw: &str) -> Result<f64> {
    let invalid = |message: String| Error::Validation {
        field: "estimated weight",
        message,
    };
    let weight: f64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(format!("{raw:?} is not a number")))?;
    if !weight.is_finite() || weight <= 0.0 {
        return Err(invalid(format!("{raw:?} must be greater than zero")));
    }
    Ok(weight)
}

/// Validates `form` and inserts a pending booking for the signed-in user.
///
/// Returns the new booking id. The insert is only attempted after every local
/// check passed.
///
/// # Errors
/// * `Error::Auth` when `session` is `None`; the caller should send the user to login
/// * validation errors from [`BookingForm::validate`]
/// * `Error::Write` when the backend rejects the insert; `form` is preserved
pub async fn submit_booking(
    db: &DatabaseConnection,
    cache: &QueryCache,
    session: Option<&AuthUser>,
    form: &mut BookingForm,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<Uuid> {
    let user = session.ok_or(Error::Auth)?;
    let valid = form.validate(now, offset)?;

    let booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        category_id: Set(valid.category_id),
        estimated_weight: Set(valid.estimated_weight),
        actual_weight: Set(None),
        final_amount: Set(None),
        pickup_address: Set(valid.address),
        pickup_time: Set(valid.pickup_time),
        notes: Set(valid.notes),
        status: Set(BookingStatus::Pending),
        collector_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let inserted = booking.insert(db).await.map_err(|e| {
        warn!("Booking insert rejected for user {}: {e}", user.id);
        Error::write(&e)
    })?;

    info!(
        "Created booking {} for user {}: {} kg at {}",
        inserted.id, user.id, inserted.estimated_weight, inserted.pickup_time
    );

    form.reset();
    cache
        .invalidate(&QueryKey::new(dashboard::USER_BOOKINGS_OPERATION, &user.id)?)
        .await;

    Ok(inserted.id)
}
