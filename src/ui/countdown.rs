use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use spotter::countdown::{RestCountdown, Urgency};

/// Rest timer box: colored by urgency, flashing in the last ten seconds
pub struct CountdownWidget {
    countdown: RestCountdown,
}

impl CountdownWidget {
    pub fn new(countdown: RestCountdown) -> Self {
        Self { countdown }
    }

    pub fn style(&self) -> Style {
        let color = match self.countdown.urgency() {
            Urgency::Normal => Color::Green,
            Urgency::Warning => Color::Yellow,
            Urgency::Critical => Color::Red,
        };
        let style = Style::default().fg(color).add_modifier(Modifier::BOLD);
        if self.countdown.pulse_on() {
            style.add_modifier(Modifier::REVERSED)
        } else {
            style
        }
    }
}

impl Widget for CountdownWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = self.style();
        let lines = vec![
            Line::from(Span::styled(self.countdown.label(), style)),
            Line::from(Span::styled(
                self.countdown.urgency().to_string(),
                Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
            )),
        ];

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Rest")
                    .border_style(Style::default().fg(style.fg.unwrap_or(Color::Reset))),
            )
            .render(area, buf);
    }
}
