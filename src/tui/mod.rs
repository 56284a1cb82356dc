use std::{
    io::{stdout, BufWriter, Write},
    sync::Arc,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    QueueableCommand,
};
use futures_util::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::Span,
    widgets::{Clear, ListState, Paragraph, Widget},
    Frame, Terminal,
};
use tokio::{signal, sync::watch::Receiver};

use self::{
    log_pane::{LogPane, LogScroll},
    main_menu::{MainMenu, MenuItem},
    qr_screen::ReservationQrScreen,
    qr_view::QrView,
    reservations_list::{clamp_selection, ReservationsList},
};
use crate::{
    route::{Host, Route, Toast},
    store::ReservationStore,
    Config,
};

pub mod confirm_dialog;
pub mod log_pane;
mod main_menu;
pub mod qr_screen;
mod qr_view;
mod reservations_list;

enum Screen<S> {
    MainMenu(ListState),
    ReservationList(ListState),
    ReservationQr(ReservationQrScreen<S>),
}

/// Resolves when the open reservation screen gets a new value from the store.
async fn screen_changed<S: ReservationStore>(screen: &mut Screen<S>) {
    if let Screen::ReservationQr(screen) = screen {
        if screen.changed().await {
            return;
        }
    }
    std::future::pending::<()>().await
}

/// Requests a screen makes while handling a key, applied once it is done.
#[derive(Default)]
struct Outbox {
    routes: Vec<Route>,
    toasts: Vec<String>,
}

impl Host for Outbox {
    fn navigate(&mut self, route: Route) {
        self.routes.push(route);
    }

    fn notify(&mut self, message: &str) {
        self.toasts.push(message.to_owned());
    }
}

struct TuiState<S> {
    store: Arc<S>,
    config: Arc<Config>,
    screen: Screen<S>,
    toast: Option<Toast>,
    log: LogPane,
    log_scroll: LogScroll,
    quit: bool,
}

impl<S: ReservationStore> TuiState<S> {
    fn new(store: Arc<S>, config: Arc<Config>, log: LogPane, start: Route) -> Self {
        let mut state = TuiState {
            store,
            config,
            screen: Screen::MainMenu(ListState::default()),
            toast: None,
            log,
            log_scroll: None,
            quit: false,
        };
        state.navigate(start);
        state
    }

    fn navigate(&mut self, route: Route) {
        tracing::debug!(%route, "Navigating");
        self.screen = match route {
            Route::MainMenu => Screen::MainMenu(ListState::default().with_selected(Some(0))),
            Route::ReservationList => Screen::ReservationList(ListState::default()),
            Route::ReservationQr { allow_cancel, id } => Screen::ReservationQr(
                ReservationQrScreen::new(
                    id,
                    allow_cancel,
                    self.store.clone(),
                    &self.config.qr_prefix,
                )
                .with_on_done(|id| tracing::debug!(id, "Left reservation")),
            ),
        };
    }

    fn show_toast(&mut self, message: String) {
        self.toast = Some(Toast::new(
            message,
            Duration::from_millis(self.config.toast_ms),
        ));
    }

    fn apply(&mut self, outbox: Outbox) {
        for message in outbox.toasts {
            self.show_toast(message);
        }
        for route in outbox.routes {
            self.navigate(route);
        }
    }

    fn dialog_open(&self) -> bool {
        matches!(&self.screen, Screen::ReservationQr(screen) if screen.dialog_shown())
    }

    fn key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit = true;
                return;
            }
            KeyCode::Char('q') if !self.dialog_open() => {
                self.quit = true;
                return;
            }
            KeyCode::PageUp => return self.log.scroll_up(&mut self.log_scroll, 5),
            KeyCode::PageDown => return self.log.scroll_down(&mut self.log_scroll, 5),
            _ => {}
        }

        let mut outbox = Outbox::default();
        match &mut self.screen {
            Screen::MainMenu(list) => match key.code {
                KeyCode::Up => list.select(Some(list.selected().unwrap_or(0).saturating_sub(1))),
                KeyCode::Down => list.select(Some(
                    (list.selected().unwrap_or(0) + 1).min(MenuItem::ALL.len() - 1),
                )),
                KeyCode::Enter => match MenuItem::selected(list) {
                    MenuItem::Reservations => outbox.navigate(Route::ReservationList),
                    MenuItem::Quit => self.quit = true,
                },
                _ => {}
            },
            Screen::ReservationList(list) => {
                let reservations = self.store.list();
                clamp_selection(list, reservations.len());
                let selected = list.selected().and_then(|i| reservations.get(i));
                match key.code {
                    KeyCode::Up => list.select(list.selected().map(|s| s.saturating_sub(1))),
                    KeyCode::Down => list.select(list.selected().map(|s| s + 1)),
                    KeyCode::Enter | KeyCode::Char('v') => {
                        if let Some(reservation) = selected {
                            outbox.navigate(Route::ReservationQr {
                                allow_cancel: key.code == KeyCode::Enter,
                                id: reservation.id.clone(),
                            });
                        }
                    }
                    KeyCode::Esc => outbox.navigate(Route::MainMenu),
                    _ => {}
                }
            }
            Screen::ReservationQr(screen) => {
                if key.code == KeyCode::Esc && !screen.dialog_shown() {
                    tracing::debug!(id = screen.reservation_id(), "Back to reservations");
                    outbox.navigate(Route::ReservationList);
                } else {
                    screen.key(key.code, &mut outbox);
                }
            }
        }
        self.apply(outbox);
    }

    fn tick(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|t| t.expired(now)) {
            self.toast = None;
        }
        if let Screen::ReservationQr(screen) = &mut self.screen {
            screen.refresh();
        }
    }
}

pub async fn tui<S: ReservationStore>(
    store: Arc<S>,
    mut store_rx: Receiver<()>,
    config: Arc<Config>,
    log: LogPane,
    mut log_rx: Receiver<()>,
    start: Route,
) -> std::io::Result<()> {
    enable_raw_mode()?;
    let mut tui_state = TuiState::new(store, config, log, start);
    let mut stdout = BufWriter::new(stdout().lock());
    stdout.queue(EnterAlternateScreen)?.flush()?;

    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut event_stream = crossterm::event::EventStream::new();
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::pin!(ctrl_c);
    tokio::pin!(terminate);

    terminal.clear()?;
    while !tui_state.quit {
        tui_state.tick(Instant::now());
        terminal.draw(|frame| ui(frame, &mut tui_state))?;

        let toast_expiry = tui_state.toast.as_ref().map(|t| t.expires);
        let toast_timer = async {
            match toast_expiry {
                Some(at) => tokio::time::sleep_until(at.into()).await,
                None => std::future::pending().await,
            }
        };

        let mut event = None;
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = &mut terminate => break,
            _ = log_rx.changed() => {},
            _ = store_rx.changed() => {},
            _ = screen_changed(&mut tui_state.screen) => {},
            _ = toast_timer => {},
            e = event_stream.next() => event = e,
        }

        if let Some(event::Event::Key(key)) = event.transpose()? {
            tui_state.key(key);
        }
    }

    tracing::info!("Shutting down");
    disable_raw_mode()?;
    terminal
        .backend_mut()
        .queue(LeaveAlternateScreen)?
        .flush()?;

    Ok(())
}

fn ui<S: ReservationStore>(frame: &mut Frame, tui_state: &mut TuiState<S>) {
    let log_height = if tui_state.config.show_log { 8 } else { 0 };
    let split = Layout::new(
        ratatui::layout::Direction::Vertical,
        [
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(log_height),
        ],
    )
    .split(frame.size());

    match &mut tui_state.screen {
        Screen::MainMenu(list) => frame.render_widget(MainMenu(list), split[0]),
        Screen::ReservationList(list) => {
            let reservations = tui_state.store.list();
            frame.render_widget(ReservationsList(&reservations, list), split[0])
        }
        Screen::ReservationQr(screen) => frame.render_widget(QrView(&*screen), split[0]),
    }

    if let Some(toast) = &tui_state.toast {
        frame.render_widget(ToastView(toast), split[0]);
    }

    frame.render_widget(
        Paragraph::new(help_line(&tui_state.screen).dim()),
        split[1],
    );

    if tui_state.config.show_log {
        frame.render_stateful_widget(&tui_state.log, split[2], &mut tui_state.log_scroll);
    }
}

fn help_line<S: ReservationStore>(screen: &Screen<S>) -> &'static str {
    match screen {
        Screen::MainMenu(_) => "↑/↓ select  Enter open  q quit",
        Screen::ReservationList(_) => "↑/↓ select  Enter open  v view only  Esc back  q quit",
        Screen::ReservationQr(screen) if screen.dialog_shown() => {
            "y yes  n/Esc no  ←/→ + Enter choose"
        }
        Screen::ReservationQr(_) => "←/→ select  Enter press  c cancel  d done  Esc back  q quit",
    }
}

struct ToastView<'a>(&'a Toast);

impl<'a> Widget for ToastView<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::prelude::Buffer) {
        let width = (self.0.message.chars().count() as u16 + 4).min(area.width);
        let toast = Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + area.height.saturating_sub(3),
            width,
            height: 1.min(area.height),
        };
        Clear.render(toast, buf);
        Paragraph::new(Span::styled(
            self.0.message.as_str(),
            Style::new().fg(Color::White).bg(Color::DarkGray),
        ))
        .alignment(Alignment::Center)
        .style(Style::new().bg(Color::DarkGray))
        .render(toast, buf);
    }
}
