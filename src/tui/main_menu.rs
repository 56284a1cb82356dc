use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListState, StatefulWidget, Widget},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Reservations,
    Quit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 2] = [MenuItem::Reservations, MenuItem::Quit];

    fn label(self) -> &'static str {
        match self {
            MenuItem::Reservations => "Reservations",
            MenuItem::Quit => "Quit",
        }
    }

    pub fn selected(state: &ListState) -> MenuItem {
        MenuItem::ALL[state.selected().unwrap_or(0).min(MenuItem::ALL.len() - 1)]
    }
}

pub struct MainMenu<'a>(pub &'a mut ListState);

impl<'a> Widget for MainMenu<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::prelude::Buffer) {
        if self.0.selected().is_none() {
            self.0.select(Some(0));
        }
        let list = List::new(MenuItem::ALL.map(MenuItem::label))
            .block(Block::new().title("Fun Park").borders(Borders::all()))
            .highlight_style(Style::new().add_modifier(Modifier::REVERSED))
            .highlight_symbol(">> ");
        StatefulWidget::render(list, area, buf, self.0);
    }
}
