//! Reservation detail screen: shows a single reservation with its QR code and
//! lets the user cancel it (behind a confirmation dialog) or leave.

use std::sync::Arc;

use color_eyre::eyre::{self, Context};
use crossterm::event::KeyCode;
use qrcode::{render::unicode, QrCode};
use tokio::sync::watch;

use super::confirm_dialog::{Answer, Dialog};
use crate::{
    reservation::Reservation,
    route::{Host, Route},
    store::ReservationStore,
};

pub const CANCELLED_MESSAGE: &str = "Reservation cancelled!";
pub const QR_NOTE: &str = "Note: Please present your QR code at the counter.";

pub type OnDone = Box<dyn FnMut(&str) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Cancel,
    Done,
}

impl Button {
    pub fn label(self) -> &'static str {
        match self {
            Button::Cancel => "Cancel",
            Button::Done => "Done",
        }
    }
}

/// Everything the screen shows while a reservation is loaded.
pub struct DetailView<'a> {
    pub lines: [String; 5],
    pub qr: Option<&'a str>,
    pub buttons: &'static [Button],
    pub focus: Button,
}

pub struct ReservationQrScreen<S> {
    reservation_id: String,
    allow_cancel: bool,
    store: Arc<S>,
    watch: watch::Receiver<Option<Reservation>>,
    current: Option<Reservation>,
    dialog: Dialog,
    focus: usize,
    qr: Option<String>,
    on_done: Option<OnDone>,
}

pub fn render_qr(payload: &str) -> eyre::Result<String> {
    Ok(QrCode::new(payload)
        .wrap_err_with(|| format!("Could not encode `{}` as a QR code", payload))?
        .render::<unicode::Dense1x2>()
        .build())
}

impl<S: ReservationStore> ReservationQrScreen<S> {
    pub fn new(
        reservation_id: impl Into<String>,
        allow_cancel: bool,
        store: Arc<S>,
        qr_prefix: &str,
    ) -> Self {
        let reservation_id = reservation_id.into();
        let mut watch = store.observe(&reservation_id);
        let current = watch.borrow_and_update().clone();
        let qr = match render_qr(&format!("{}{}", qr_prefix, reservation_id)) {
            Ok(qr) => Some(qr),
            Err(error) => {
                tracing::error!(?error, "QR code unavailable");
                None
            }
        };

        Self {
            reservation_id,
            allow_cancel,
            store,
            watch,
            current,
            dialog: Dialog::default(),
            focus: 0,
            qr,
            on_done: None,
        }
    }

    pub fn with_on_done(mut self, on_done: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_done = Some(Box::new(on_done));
        self
    }

    pub fn reservation_id(&self) -> &str {
        &self.reservation_id
    }

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    fn take_latest(&mut self) {
        self.current = self.watch.borrow_and_update().clone();
        if self.current.is_none() {
            tracing::debug!(id = %self.reservation_id, "Reservation went away");
        }
    }

    /// Pulls the latest value the store pushed. Returns whether it changed.
    pub fn refresh(&mut self) -> bool {
        match self.watch.has_changed() {
            Ok(true) => {
                self.take_latest();
                true
            }
            _ => false,
        }
    }

    /// Waits for the store to push a new value and takes it. Returns `false`
    /// once the store has gone away and nothing more will arrive.
    pub async fn changed(&mut self) -> bool {
        if self.watch.changed().await.is_err() {
            return false;
        }
        self.take_latest();
        true
    }

    /// The dialog only counts while there is a reservation under it.
    pub fn dialog_shown(&self) -> bool {
        self.dialog.is_visible() && self.current.is_some()
    }

    fn buttons(&self) -> &'static [Button] {
        if self.allow_cancel {
            &[Button::Cancel, Button::Done]
        } else {
            &[Button::Done]
        }
    }

    /// `None` while there is nothing to show.
    pub fn view(&self) -> Option<DetailView<'_>> {
        let reservation = self.current.as_ref()?;
        let buttons = self.buttons();
        Some(DetailView {
            lines: reservation.detail_lines(),
            qr: self.qr.as_deref(),
            buttons,
            focus: buttons[self.focus.min(buttons.len() - 1)],
        })
    }

    /// Opens the confirmation dialog. Nothing is deleted yet.
    pub fn cancel(&mut self) {
        if !self.allow_cancel || self.current.is_none() {
            return;
        }
        self.dialog.open();
    }

    pub fn decline(&mut self) {
        if self.dialog.is_visible() {
            tracing::debug!(id = %self.reservation_id, "Cancellation declined");
            self.dialog.close();
        }
    }

    /// Deletes the reservation and leaves for the reservation list. The store
    /// gives no feedback on the deletion, so this always reports success.
    pub fn confirm(&mut self, host: &mut dyn Host) {
        if !self.dialog.is_visible() {
            return;
        }
        tracing::info!(id = %self.reservation_id, "Cancelling reservation");
        self.store.delete_by_id(&self.reservation_id);
        host.notify(CANCELLED_MESSAGE);
        host.navigate(Route::ReservationList);
        self.dialog.close();
    }

    pub fn done(&mut self, host: &mut dyn Host) {
        tracing::info!(id = %self.reservation_id, "Done viewing reservation");
        host.navigate(Route::MainMenu);
        if let Some(on_done) = self.on_done.as_mut() {
            on_done(&self.reservation_id);
        }
    }

    pub fn key(&mut self, code: KeyCode, host: &mut dyn Host) {
        if self.dialog_shown() {
            match self.dialog.key(code) {
                Some(Answer::Yes) => self.confirm(host),
                Some(Answer::No) => self.decline(),
                None => {}
            }
            return;
        }
        let Some((count, focused)) = self.view().map(|v| (v.buttons.len(), v.focus)) else {
            return;
        };
        match code {
            KeyCode::Left => self.focus = self.focus.min(count - 1).saturating_sub(1),
            KeyCode::Right | KeyCode::Tab => self.focus = (self.focus + 1).min(count - 1),
            KeyCode::Enter => match focused {
                Button::Cancel => self.cancel(),
                Button::Done => self.done(host),
            },
            KeyCode::Char('c') => self.cancel(),
            KeyCode::Char('d') => self.done(host),
            _ => {}
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;
    use crate::{reservation::tests::wave_pool, store::MemoryStore};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Delete(String),
        Notify(String),
        Navigate(Route),
    }

    pub type Calls = Arc<Mutex<Vec<Call>>>;

    /// Records deletions and optionally drops them on the floor.
    pub struct RecordingStore {
        pub inner: MemoryStore,
        pub calls: Calls,
        pub lose_deletes: bool,
    }

    impl ReservationStore for RecordingStore {
        fn observe(&self, id: &str) -> watch::Receiver<Option<Reservation>> {
            self.inner.observe(id)
        }

        fn delete_by_id(&self, id: &str) {
            self.calls.lock().unwrap().push(Call::Delete(id.to_owned()));
            if !self.lose_deletes {
                self.inner.delete_by_id(id);
            }
        }

        fn list(&self) -> Vec<Reservation> {
            self.inner.list()
        }
    }

    pub struct RecordingHost(pub Calls);

    impl Host for RecordingHost {
        fn navigate(&mut self, route: Route) {
            self.0.lock().unwrap().push(Call::Navigate(route));
        }

        fn notify(&mut self, message: &str) {
            self.0.lock().unwrap().push(Call::Notify(message.to_owned()));
        }
    }

    pub fn fixture(
        allow_cancel: bool,
        lose_deletes: bool,
    ) -> (ReservationQrScreen<RecordingStore>, RecordingHost, Calls) {
        let calls = Calls::default();
        let inner = MemoryStore::new();
        inner.insert(wave_pool());
        let store = Arc::new(RecordingStore {
            inner,
            calls: calls.clone(),
            lose_deletes,
        });
        let screen = ReservationQrScreen::new("R1", allow_cancel, store, "");
        (screen, RecordingHost(calls.clone()), calls)
    }

    #[test]
    fn missing_reservation_shows_nothing() {
        for allow_cancel in [true, false] {
            let store = Arc::new(MemoryStore::new());
            let mut screen = ReservationQrScreen::new("ghost", allow_cancel, store, "");
            assert!(screen.view().is_none());
            screen.cancel();
            assert!(!screen.dialog().is_visible());
        }
    }

    #[test]
    fn shows_details_with_cancel() {
        let (screen, _, _) = fixture(true, false);
        let view = screen.view().unwrap();
        assert_eq!(
            view.lines,
            [
                "Reservation ID: R1",
                "Facility: Wave Pool",
                "Date: 2024-05-01",
                "Slot: 10:00-11:00",
                "No Of Pax: 4",
            ]
        );
        assert_eq!(view.buttons, [Button::Cancel, Button::Done]);
        assert!(view.qr.is_some_and(|qr| !qr.is_empty()));
    }

    #[test]
    fn view_only_has_no_cancel() {
        let (mut screen, mut host, calls) = fixture(false, false);
        let view = screen.view().unwrap();
        assert_eq!(view.lines[0], "Reservation ID: R1");
        assert_eq!(view.buttons, [Button::Done]);

        screen.cancel();
        screen.key(KeyCode::Char('c'), &mut host);
        screen.key(KeyCode::Left, &mut host);
        screen.key(KeyCode::Enter, &mut host);
        assert!(!screen.dialog().is_visible());
        // Enter on the only button is Done
        assert_eq!(
            *calls.lock().unwrap(),
            [Call::Navigate(Route::MainMenu)]
        );
    }

    #[test]
    fn cancel_only_opens_the_dialog() {
        let (mut screen, _, calls) = fixture(true, false);
        assert!(!screen.dialog().is_visible());
        screen.cancel();
        assert!(screen.dialog().is_visible());
        assert!(calls.lock().unwrap().is_empty());
        assert!(screen.view().is_some());
    }

    #[test]
    fn decline_has_no_side_effects() {
        let (mut screen, mut host, calls) = fixture(true, false);
        screen.cancel();
        screen.key(KeyCode::Char('n'), &mut host);
        assert!(!screen.dialog().is_visible());
        assert!(calls.lock().unwrap().is_empty());
        assert!(screen.view().is_some());
    }

    #[test]
    fn confirm_deletes_notifies_then_navigates() {
        let (mut screen, mut host, calls) = fixture(true, false);
        screen.cancel();
        screen.confirm(&mut host);
        assert!(!screen.dialog().is_visible());
        assert_eq!(
            *calls.lock().unwrap(),
            [
                Call::Delete("R1".to_owned()),
                Call::Notify(CANCELLED_MESSAGE.to_owned()),
                Call::Navigate(Route::ReservationList),
            ]
        );

        assert!(screen.refresh());
        assert!(screen.view().is_none());
    }

    #[test]
    fn confirm_reports_success_even_if_delete_is_lost() {
        let (mut screen, mut host, calls) = fixture(true, true);
        screen.cancel();
        screen.key(KeyCode::Char('y'), &mut host);
        assert!(!screen.dialog().is_visible());
        assert_eq!(calls.lock().unwrap().len(), 3);
        assert!(!screen.refresh());
        assert!(screen.view().is_some());
    }

    #[test]
    fn confirm_while_hidden_does_nothing() {
        let (mut screen, mut host, calls) = fixture(true, false);
        screen.confirm(&mut host);
        screen.decline();
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn done_navigates_to_main_menu_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (screen, mut host, calls) = fixture(true, false);
        let counter = hits.clone();
        let mut screen = screen.with_on_done(move |id| {
            assert_eq!(id, "R1");
            counter.fetch_add(1, Ordering::SeqCst);
        });

        screen.key(KeyCode::Char('d'), &mut host);
        assert_eq!(*calls.lock().unwrap(), [Call::Navigate(Route::MainMenu)]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!screen.dialog().is_visible());
        assert!(screen.view().is_some());
    }

    #[test]
    fn focus_moves_between_buttons() {
        let (mut screen, mut host, calls) = fixture(true, false);
        assert_eq!(screen.view().unwrap().focus, Button::Cancel);
        screen.key(KeyCode::Right, &mut host);
        assert_eq!(screen.view().unwrap().focus, Button::Done);
        screen.key(KeyCode::Left, &mut host);
        screen.key(KeyCode::Enter, &mut host);
        assert!(screen.dialog().is_visible());

        // keys go to the dialog now
        screen.key(KeyCode::Char('d'), &mut host);
        assert!(calls.lock().unwrap().is_empty());
        screen.key(KeyCode::Esc, &mut host);
        assert!(!screen.dialog().is_visible());
    }

    #[test]
    fn follows_store_updates() {
        let (mut screen, _, _) = fixture(true, false);
        let mut moved = wave_pool();
        moved.reservation_time = "14:00-15:00".to_owned();
        screen.store.inner.insert(moved);

        assert_eq!(screen.view().unwrap().lines[3], "Slot: 10:00-11:00");
        assert!(screen.refresh());
        assert_eq!(screen.view().unwrap().lines[3], "Slot: 14:00-15:00");

        screen.store.inner.delete_by_id("R1");
        assert!(screen.refresh());
        assert!(screen.view().is_none());
    }

    #[test]
    fn dialog_over_deleted_reservation_takes_no_keys() {
        let (mut screen, mut host, calls) = fixture(true, false);
        screen.cancel();
        screen.store.inner.delete_by_id("R1");
        assert!(screen.refresh());

        assert!(screen.dialog().is_visible());
        assert!(!screen.dialog_shown());
        screen.key(KeyCode::Char('y'), &mut host);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn changed_wakes_when_the_store_deletes() {
        let (mut screen, _, _) = fixture(true, false);
        let store = screen.store.clone();
        tokio::spawn(async move { store.inner.delete_by_id("R1") });

        assert!(screen.changed().await);
        assert!(screen.view().is_none());
    }

    #[test]
    fn qr_encodes_payload() {
        let qr = render_qr("https://funpark.example/checkin/R1").unwrap();
        assert!(qr.lines().count() > 10);
    }
}
