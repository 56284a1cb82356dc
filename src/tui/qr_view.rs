use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph, Widget},
};

use super::{
    confirm_dialog::ConfirmDialog,
    qr_screen::{ReservationQrScreen, QR_NOTE},
};
use crate::store::ReservationStore;

const ORANGE: Color = Color::Rgb(0xff, 0xa5, 0x00);

pub struct QrView<'a, S>(pub &'a ReservationQrScreen<S>);

impl<'a, S: ReservationStore> Widget for QrView<'a, S> {
    fn render(self, area: Rect, buf: &mut ratatui::prelude::Buffer)
    where
        Self: Sized,
    {
        let Some(view) = self.0.view() else {
            return;
        };
        let [title, facility, date, slot, pax] = view.lines;
        let qr = view.qr.unwrap_or("[ QR code unavailable ]");

        let split = Layout::new(
            ratatui::layout::Direction::Vertical,
            [
                Constraint::Length(2),
                Constraint::Length(qr.lines().count() as u16),
                Constraint::Length(2),
                Constraint::Length(6),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ],
        )
        .split(area);

        Paragraph::new(Span::styled(title, Style::new().bold()))
            .alignment(Alignment::Center)
            .render(split[0], buf);
        Paragraph::new(qr)
            .alignment(Alignment::Center)
            .render(split[1], buf);
        Paragraph::new(QR_NOTE)
            .alignment(Alignment::Center)
            .render(split[2], buf);
        Paragraph::new(vec![
            Line::from(Span::styled(facility, Style::new().bold())),
            Line::from(date),
            Line::from(slot),
            Line::from(pax),
        ])
        .block(
            Block::new()
                .borders(Borders::all())
                .padding(Padding::horizontal(1)),
        )
        .render(split[3], buf);

        let mut buttons = Vec::new();
        for button in view.buttons {
            let style = Style::new().fg(Color::White).bg(ORANGE);
            let style = if *button == view.focus {
                style.add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                style
            };
            buttons.push(Span::styled(format!("  {:^8}  ", button.label()), style));
            buttons.push(Span::raw("      "));
        }
        buttons.pop();
        Paragraph::new(Line::from(buttons))
            .alignment(Alignment::Center)
            .render(split[5], buf);

        ConfirmDialog(self.0.dialog()).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    use super::*;
    use crate::{
        route::Route,
        store::MemoryStore,
        tui::{
            confirm_dialog::MESSAGE,
            qr_screen::tests::{fixture, Call},
        },
    };

    fn draw<S: ReservationStore>(screen: &ReservationQrScreen<S>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 40)).unwrap();
        terminal
            .draw(|frame| frame.render_widget(QrView(screen), frame.size()))
            .unwrap();
        text(terminal.backend().buffer())
    }

    fn text(buf: &Buffer) -> String {
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn renders_reservation_with_cancel() {
        let (screen, _, _) = fixture(true, false);
        let rendered = draw(&screen);
        for expected in [
            "Reservation ID: R1",
            "Facility: Wave Pool",
            "Date: 2024-05-01",
            "Slot: 10:00-11:00",
            "No Of Pax: 4",
            QR_NOTE,
            "Cancel",
            "Done",
        ] {
            assert!(rendered.contains(expected), "missing {expected:?}\n{rendered}");
        }
    }

    #[test]
    fn read_only_hides_cancel() {
        let (screen, _, _) = fixture(false, false);
        let rendered = draw(&screen);
        assert!(rendered.contains("Facility: Wave Pool"));
        assert!(rendered.contains("Done"));
        assert!(!rendered.contains("Cancel"));
    }

    #[test]
    fn absent_reservation_is_blank() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let screen = ReservationQrScreen::new("R404", true, store, "");
        assert!(draw(&screen).trim().is_empty());
    }

    #[test]
    fn dialog_overlays_the_details() {
        let (mut screen, mut host, calls) = fixture(true, false);
        screen.cancel();
        assert!(draw(&screen).contains(MESSAGE));

        screen.key(crossterm::event::KeyCode::Char('y'), &mut host);
        assert!(calls
            .lock()
            .unwrap()
            .contains(&Call::Navigate(Route::ReservationList)));
        screen.refresh();
        assert!(draw(&screen).trim().is_empty());
    }
}
