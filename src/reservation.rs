use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// A booked facility slot. Owned by the [`crate::store::ReservationStore`],
/// the screens only ever read it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: String,
    pub facility_name: String,
    #[serde(with = "iso_date")]
    pub purchased_date: Date,
    pub reservation_time: String,
    pub reservation_pax: NonZeroU32,
}

impl Reservation {
    /// Purchase date as zero padded `YYYY-MM-DD`.
    pub fn date_label(&self) -> String {
        self.purchased_date
            .format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_else(|_| {
                format!(
                    "{:04}-{:02}-{:02}",
                    self.purchased_date.year(),
                    u8::from(self.purchased_date.month()),
                    self.purchased_date.day()
                )
            })
    }

    pub fn detail_lines(&self) -> [String; 5] {
        [
            format!("Reservation ID: {}", self.id),
            format!("Facility: {}", self.facility_name),
            format!("Date: {}", self.date_label()),
            format!("Slot: {}", self.reservation_time),
            format!("No Of Pax: {}", self.reservation_pax),
        ]
    }
}
