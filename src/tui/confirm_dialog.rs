use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

pub const MESSAGE: &str = "Confirm want to delete reservation?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    No,
    Yes,
}

/// Modal gate in front of the cancel action. Starts out hidden and only
/// leaves `Visible` through an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialog {
    #[default]
    Hidden,
    Visible { focus: Answer },
}

impl Dialog {
    pub fn is_visible(&self) -> bool {
        matches!(self, Dialog::Visible { .. })
    }

    pub fn open(&mut self) {
        *self = Dialog::Visible { focus: Answer::No };
    }

    pub fn close(&mut self) {
        *self = Dialog::Hidden;
    }

    /// Maps a key press to an answer. Does not change visibility, the owner
    /// decides what an answer means and closes the dialog afterwards.
    pub fn key(&mut self, code: KeyCode) -> Option<Answer> {
        let Dialog::Visible { focus } = self else {
            return None;
        };
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(Answer::Yes),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Answer::No),
            KeyCode::Enter => Some(*focus),
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                *focus = match *focus {
                    Answer::No => Answer::Yes,
                    Answer::Yes => Answer::No,
                };
                None
            }
            _ => None,
        }
    }
}

pub struct ConfirmDialog<'a>(pub &'a Dialog);

impl<'a> Widget for ConfirmDialog<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::prelude::Buffer) {
        let Dialog::Visible { focus } = *self.0 else {
            return;
        };

        let width = 44.min(area.width);
        let height = 7.min(area.height);
        let popup = Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        };
        Clear.render(popup, buf);

        let button = |label: &'static str, answer: Answer| {
            let style = Style::new().fg(Color::White).bg(Color::Blue);
            if answer == focus {
                Span::styled(label, style.add_modifier(Modifier::REVERSED | Modifier::BOLD))
            } else {
                Span::styled(label, style)
            }
        };

        Paragraph::new(vec![
            Line::from(""),
            Line::from(MESSAGE.bold()),
            Line::from(""),
            Line::from(vec![
                button(" [N]o ", Answer::No),
                Span::raw("    "),
                button(" [Y]es ", Answer::Yes),
            ]),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::new()
                .title(" Cancel reservation ")
                .title_alignment(Alignment::Center)
                .borders(Borders::all())
                .border_style(Style::new().fg(Color::Rgb(0xff, 0xa5, 0x00))),
        )
        .render(popup, buf);
    }
}
