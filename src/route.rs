use std::{
    fmt::Display,
    str::FromStr,
    time::{Duration, Instant},
};

use color_eyre::eyre::{self, eyre};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    MainMenu,
    ReservationList,
    ReservationQr { allow_cancel: bool, id: String },
}

impl FromStr for Route {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.splitn(3, '/').collect::<Vec<_>>().as_slice() {
            ["main-menu"] => Ok(Route::MainMenu),
            ["reservations"] => Ok(Route::ReservationList),
            ["reservation", view_cancel, id] if !id.is_empty() => Ok(Route::ReservationQr {
                // Anything but an explicit "yes" shows the reservation read only.
                // The id is the rest of the path and may contain '/'.
                allow_cancel: *view_cancel == "yes",
                id: (*id).to_owned(),
            }),
            _ => Err(eyre!("Unknown route `{}`", s)),
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::MainMenu => f.write_str("main-menu"),
            Route::ReservationList => f.write_str("reservations"),
            Route::ReservationQr { allow_cancel, id } => write!(
                f,
                "reservation/{}/{}",
                if *allow_cancel { "yes" } else { "no" },
                id
            ),
        }
    }
}

/// What a screen can ask of the application hosting it.
pub trait Host {
    fn navigate(&mut self, route: Route);
    fn notify(&mut self, message: &str);
}

/// A short lived message shown over the current screen.
#[derive(Debug)]
pub struct Toast {
    pub message: String,
    pub expires: Instant,
}

impl Toast {
    pub fn new(message: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            message: message.into(),
            expires: Instant::now() + lifetime,
        }
    }

    pub fn expired(&self, now: Instant) -> bool {
        now >= self.expires
    }
}
