use std::{fmt::Display, ops::Range, sync::Arc};

use ratatui::{
    layout::{Margin, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarState, StatefulWidget, Widget, Wrap},
};
use tokio::sync::watch::Sender;
use tracing::{field::Visit, Level, Subscriber};
use tracing_subscriber::{
    fmt::{FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
};

pub struct LogBuffer {
    pub lines: boxcar::Vec<Line<'static>>,
    pub notifier: Sender<()>,
}

/// Tracing event formatter that keeps every event as a styled line so the UI
/// can show it in a scrollable pane. Each event pokes `notifier` so the UI
/// loop redraws.
#[derive(Clone)]
pub struct LogPane(pub Arc<LogBuffer>);

impl LogPane {
    pub fn new(notifier: Sender<()>) -> Self {
        LogPane(Arc::new(LogBuffer {
            lines: boxcar::Vec::default(),
            notifier,
        }))
    }

    pub fn len(&self) -> usize {
        self.0.lines.count()
    }

    pub fn text(&self, range: Range<usize>) -> Text<'static> {
        Text::from(
            range
                .map_while(|i| self.0.lines.get(i).cloned())
                .collect::<Vec<_>>(),
        )
    }
}

fn push_scope<C, N>(line: &mut Line<'static>, ctx: &tracing_subscriber::fmt::FmtContext<'_, C, N>)
where
    C: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    let Some(scope) = ctx.event_scope() else {
        return;
    };
    let mut seen = false;
    for span in scope.from_root() {
        seen = true;
        line.spans
            .push(Span::styled(span.metadata().name(), Style::new().bold()));
        let ext = span.extensions();
        if let Some(fields) = ext.get::<FormattedFields<N>>().filter(|f| !f.is_empty()) {
            line.spans.push(Span::styled("{", Style::new().bold()));
            line.spans.push(Span::raw(fields.to_string()));
            line.spans.push(Span::styled("}", Style::new().bold()));
        }
        line.spans.push(Span::styled(":", Style::new().dim()));
    }
    if seen {
        line.spans.push(Span::raw(" "));
    }
}

impl<C, N> FormatEvent<C, N> for LogPane
where
    C: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, C, N>,
        _writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let mut line = Line::from(Span::styled(
            format!("{:>5} ", meta.level()),
            Style::new().fg(level_color(meta.level())),
        ));
        push_scope(&mut line, ctx);
        line.spans.push(Span::styled(
            format!("{}: ", meta.target()),
            Style::new().dim(),
        ));
        event.record(&mut LineVisitor(&mut line));

        self.0.lines.push(line);
        self.0.notifier.send_replace(());
        Ok(())
    }
}

/// Scroll position of the pane, `None` follows the tail.
pub type LogScroll = Option<usize>;

impl<'a> StatefulWidget for &'a LogPane {
    type State = LogScroll;

    fn render(self, area: Rect, buf: &mut ratatui::prelude::Buffer, state: &mut Self::State) {
        Block::new()
            .title("Log")
            .borders(Borders::all())
            .border_style(if state.is_some() {
                Style::new().dim().green()
            } else {
                Style::new()
            })
            .render(area, buf);
        let inner = area.inner(&Margin::new(1, 1));
        let len = self.len();
        let end = state.map_or(len, |s| s.min(len));

        let mut scroll_bar_state = ScrollbarState::new(len).position(end.saturating_sub(1));
        let paragraph = Paragraph::new(self.text(end.saturating_sub(inner.height as usize)..end))
            .wrap(Wrap { trim: false });
        // Wrapped lines can take more rows than we have, keep the newest visible
        let overflow = (paragraph.line_count(inner.width) as u16).saturating_sub(inner.height);
        paragraph.scroll((overflow, 0)).render(inner, buf);
        Scrollbar::new(ratatui::widgets::ScrollbarOrientation::VerticalRight).render(
            area,
            buf,
            &mut scroll_bar_state,
        );
    }
}

impl LogPane {
    pub fn scroll_up(&self, state: &mut LogScroll, by: usize) {
        let pos = state.get_or_insert(self.len());
        *pos = pos.saturating_sub(by);
    }

    pub fn scroll_down(&self, state: &mut LogScroll, by: usize) {
        if let Some(pos) = *state {
            let pos = pos.saturating_add(by);
            *state = (pos < self.len()).then_some(pos);
        }
    }
}

struct ErrorSources<'a>(&'a (dyn std::error::Error + 'static));

impl<'a> Display for ErrorSources<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        let mut curr = Some(self.0);
        while let Some(err) = curr {
            list.entry(&format_args!("{}", err));
            curr = err.source();
        }
        list.finish()
    }
}

struct LineVisitor<'a>(&'a mut Line<'static>);

impl<'a> LineVisitor<'a> {
    fn field(&mut self, name: &str, value: String) {
        self.0
            .spans
            .push(Span::styled(name.to_owned(), Style::new().italic()));
        self.0.spans.push(Span::raw(format!("={} ", value)));
    }
}

impl<'a> Visit for LineVisitor<'a> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0.spans.push(Span::raw(format!("{} ", value)));
        } else {
            self.record_debug(field, &value)
        }
    }

    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        match value.source() {
            Some(source) => self.field(
                field.name(),
                format!("{}, sources: {}", value, ErrorSources(source)),
            ),
            None => self.field(field.name(), value.to_string()),
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.0.spans.push(Span::raw(format!("{:?} ", value))),
            // already covered by the metadata
            name if name.starts_with("log.") => {}
            name => self.field(name.strip_prefix("r#").unwrap_or(name), format!("{:?}", value)),
        }
    }
}

fn level_color(level: &Level) -> Color {
    match *level {
        Level::ERROR => Color::LightRed,
        Level::WARN => Color::LightYellow,
        Level::INFO => Color::LightGreen,
        Level::DEBUG => Color::LightBlue,
        Level::TRACE => Color::LightCyan,
    }
}
