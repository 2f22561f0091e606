pub mod countdown;
pub mod screen;

use chrono::Local;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};
use spotter::selectors::{overall_progress, workout_duration};

use crate::App;

pub const HORIZONTAL_MARGIN: u16 = 2;
pub const VERTICAL_MARGIN: u16 = 1;

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(app.machine.state()).render(app, f);
}

/// Workout name, elapsed minutes and the overall progress gauge
pub fn render_header(app: &App, f: &mut Frame, area: Rect) {
    let ctx = app.machine.context();
    let progress = overall_progress(ctx);
    let minutes = workout_duration(ctx, Local::now());

    let title = format!(
        " {} · {} min · {} ",
        ctx.workout_name,
        minutes,
        app.machine.state()
    );

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent(progress.percentage.min(100) as u16)
        .label(format!(
            "{}/{} sets ({}%)",
            progress.completed, progress.total, progress.percentage
        ));

    f.render_widget(gauge, area);
}

pub fn render_legend(text: &str, f: &mut Frame, area: Rect) {
    let legend = Paragraph::new(Span::styled(
        text.to_string(),
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(legend, area);
}

/// A single centered, emphasized message (paused, cancelled)
pub fn render_banner(text: &str, color: Color, f: &mut Frame, area: Rect) {
    let banner = Paragraph::new(Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(color)
            .add_modifier(Modifier::BOLD | Modifier::ITALIC),
    )))
    .alignment(Alignment::Center);
    f.render_widget(banner, area);
}

/// `✓` done, `✗` skipped, `▸` current, `·` pending
pub fn set_marks(app: &App) -> String {
    let ctx = app.machine.context();
    let Some(exercise) = ctx.exercises.get(ctx.current_exercise_index) else {
        return String::new();
    };

    (0..exercise.sets as usize)
        .map(|idx| {
            let recorded = ctx
                .completed_sets
                .get(&exercise.id)
                .and_then(|flags| flags.get(idx).copied());
            match recorded {
                Some(true) => "✓",
                Some(false) => "✗",
                None if idx == ctx.current_set_index => "▸",
                None => "·",
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
