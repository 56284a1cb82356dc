use ratatui::{
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListState, Paragraph, StatefulWidget, Widget, Wrap},
};

use crate::reservation::Reservation;

pub struct ReservationsList<'a>(pub &'a [Reservation], pub &'a mut ListState);

/// Keeps the selection inside the list, or clears it when the list is empty.
pub fn clamp_selection(state: &mut ListState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(i), len) if i >= len => state.select(Some(len - 1)),
        _ => {}
    }
}

impl<'a> Widget for ReservationsList<'a> {
    fn render(self, area: ratatui::prelude::Rect, buf: &mut ratatui::prelude::Buffer)
    where
        Self: Sized,
    {
        let block = Block::new().title("My Reservations").borders(Borders::all());
        if self.0.is_empty() {
            return Paragraph::new("No reservations yet")
                .block(block)
                .wrap(Wrap { trim: false })
                .render(area, buf);
        }

        let items: Vec<_> = self
            .0
            .iter()
            .map(|r| {
                format!(
                    "{} - {} ({} {}, {} pax)",
                    r.id,
                    r.facility_name,
                    r.date_label(),
                    r.reservation_time,
                    r.reservation_pax
                )
            })
            .collect();

        clamp_selection(self.1, items.len());
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::new().add_modifier(Modifier::REVERSED))
            .highlight_symbol(">> ");

        StatefulWidget::render(list, area, buf, self.1);
    }
}
