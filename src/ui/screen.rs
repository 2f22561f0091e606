use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Wrap},
    Frame,
};
use spotter::countdown::RestCountdown;
use spotter::selectors::{
    can_move_next, can_move_previous, current_exercise, current_exercise_progress,
    overall_progress,
};
use spotter::{ExercisePhase, SessionState};

use crate::ui::{
    countdown::CountdownWidget, render_banner, render_header, render_legend, set_marks,
    HORIZONTAL_MARGIN, VERTICAL_MARGIN,
};
use crate::App;

/// A UI Screen boundary: one per session state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Workout overview before starting
pub struct OverviewScreen;

impl Screen for OverviewScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let ctx = app.machine.context();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3), // title
                Constraint::Min(0),    // exercise table
                Constraint::Length(1), // legend
            ])
            .split(f.area());

        let title = Paragraph::new(ctx.workout_name.clone())
            .block(Block::default().borders(Borders::ALL).title("Workout"))
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let rows: Vec<Row> = ctx
            .exercises
            .iter()
            .enumerate()
            .map(|(idx, exercise)| {
                let rest = ctx.rest_after(idx);
                Row::new(vec![
                    Cell::from(format!("{}", idx + 1)),
                    Cell::from(exercise.name.clone()),
                    Cell::from(exercise.target_summary()),
                    Cell::from(format!("{}s", rest)),
                ])
            })
            .collect();

        let header = Row::new(vec!["#", "Exercise", "Target", "Rest"]).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let table = Table::new(
            rows,
            &[
                Constraint::Length(3),
                Constraint::Percentage(40),
                Constraint::Percentage(40),
                Constraint::Length(6),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} sets total", overall_progress(ctx).total)),
        );
        f.render_widget(table, chunks[1]);

        render_legend("(enter) start / (esc)ape", f, chunks[2]);
    }
}

/// Active set: targets, editable draft, set marks
pub struct ExerciseScreen;

impl Screen for ExerciseScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let ctx = app.machine.context();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3), // overall progress
                Constraint::Min(6),    // exercise
                Constraint::Length(3), // exercise progress
                Constraint::Length(1), // legend
            ])
            .split(f.area());

        render_header(app, f, chunks[0]);

        let Some(exercise) = current_exercise(ctx) else {
            return;
        };

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from(Span::styled(
                format!(
                    "{} of {}: {}",
                    ctx.current_exercise_index + 1,
                    ctx.exercises.len(),
                    exercise.name
                ),
                bold.fg(Color::Magenta),
            )),
            Line::from(format!(
                "Set {} of {}   target {}",
                (ctx.current_set_index + 1).min(exercise.sets as usize),
                exercise.sets,
                exercise.target_summary()
            )),
            Line::from(Span::styled(set_marks(app), bold)),
            Line::from(""),
            Line::from(vec![
                Span::styled("reps ", Style::default().add_modifier(Modifier::DIM)),
                Span::styled(
                    app.draft.reps.map_or("-".to_string(), |r| r.to_string()),
                    bold.fg(Color::Green),
                ),
                Span::styled("   weight ", Style::default().add_modifier(Modifier::DIM)),
                Span::styled(
                    app.draft
                        .weight
                        .map_or("bodyweight".to_string(), |w| format!("{w}kg")),
                    bold.fg(Color::Green),
                ),
            ]),
        ];

        if let Some(instructions) = &exercise.instructions {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                instructions.clone(),
                Style::default().add_modifier(Modifier::ITALIC),
            )));
        }

        let body = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Exercise"))
            .wrap(Wrap { trim: true });
        f.render_widget(body, chunks[1]);

        let set_gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Magenta))
            .ratio(current_exercise_progress(ctx));
        f.render_widget(set_gauge, chunks[2]);

        let legend = navigation_legend(app, "(enter) done / (x) skip / +- reps / [] weight");
        render_legend(&legend, f, chunks[3]);
    }
}

/// Between sets
pub struct RestScreen;

impl Screen for RestScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let ctx = app.machine.context();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3), // overall progress
                Constraint::Min(0),    // padding
                Constraint::Length(4), // countdown
                Constraint::Length(1), // up next
                Constraint::Min(0),    // padding
                Constraint::Length(1), // legend
            ])
            .split(f.area());

        render_header(app, f, chunks[0]);

        let countdown = RestCountdown::new(ctx.rest_timer_seconds, app.pulse_phase);
        let centered = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(20),
                Constraint::Min(0),
            ])
            .split(chunks[2]);
        f.render_widget(CountdownWidget::new(countdown), centered[1]);

        if let Some(next) = current_exercise(ctx) {
            let up_next = Paragraph::new(format!(
                "up next: {} set {} of {}",
                next.name,
                ctx.current_set_index + 1,
                next.sets
            ))
            .alignment(Alignment::Center);
            f.render_widget(up_next, chunks[3]);
        }

        render_legend(&navigation_legend(app, "(s)kip rest"), f, chunks[5]);
    }
}

pub struct PausedScreen;

impl Screen for PausedScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(f.area());

        render_header(app, f, chunks[0]);
        render_banner("PAUSED - press space to resume", Color::Yellow, f, chunks[2]);
        render_legend("(space) resume / (e)nd / (esc) cancel", f, chunks[4]);
    }
}

/// Finished or ended early, waiting for the save
pub struct CompletingScreen;

impl Screen for CompletingScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let ctx = app.machine.context();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(f.area());

        render_header(app, f, chunks[0]);

        let rows: Vec<Row> = ctx
            .exercises
            .iter()
            .map(|exercise| {
                let done = (0..exercise.sets as usize)
                    .filter(|idx| ctx.is_set_completed(&exercise.id, *idx))
                    .count();
                Row::new(vec![
                    Cell::from(exercise.name.clone()),
                    Cell::from(format!("{}/{}", done, exercise.sets)),
                ])
            })
            .collect();
        let table = Table::new(rows, &[Constraint::Percentage(70), Constraint::Percentage(30)])
            .header(
                Row::new(vec!["Exercise", "Sets"]).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
            )
            .block(Block::default().borders(Borders::ALL).title("Workout complete"));
        f.render_widget(table, chunks[1]);

        let (status, style) = if ctx.is_loading {
            ("saving...".to_string(), Style::default().fg(Color::Cyan))
        } else if let Some(error) = &ctx.error {
            (
                format!("save failed: {error}"),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )
        } else {
            (String::new(), Style::default())
        };
        f.render_widget(
            Paragraph::new(Span::styled(status, style)).alignment(Alignment::Center),
            chunks[2],
        );

        let legend = if ctx.error.is_some() {
            "(enter) retry save / (esc) discard"
        } else {
            "(enter) save / (esc) discard"
        };
        render_legend(legend, f, chunks[3]);
    }
}

/// Saved session summary
pub struct SummaryScreen;

impl Screen for SummaryScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(f.area());

        let Some(result) = &app.result else {
            render_banner("Workout saved", Color::Green, f, chunks[1]);
            render_legend("(esc)ape", f, chunks[2]);
            return;
        };

        let rows: Vec<Row> = result
            .exercises
            .iter()
            .map(|exercise| {
                let skipped = exercise
                    .sets
                    .iter()
                    .filter(|s| !s.completed)
                    .map(|s| s.set_number)
                    .join(",");
                Row::new(vec![
                    Cell::from(exercise.name.clone()),
                    Cell::from(format!("{}/{}", exercise.completed_sets(), exercise.target_sets)),
                    Cell::from(format!("{:.1}", exercise.volume())),
                    Cell::from(skipped),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            &[
                Constraint::Percentage(40),
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Min(0),
            ],
        )
        .header(
            Row::new(vec!["Exercise", "Sets", "Volume", "Not done"]).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} saved", result.workout_name)),
        );
        f.render_widget(table, chunks[0]);

        let stats = Paragraph::new(Span::styled(
            format!(
                "{} min   {}% sets   {:.1} kg volume",
                result.duration_minutes,
                result.progress.percentage,
                result.total_volume()
            ),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        f.render_widget(stats, chunks[1]);

        render_legend("(esc)ape", f, chunks[2]);
    }
}

pub struct CancelledScreen;

impl Screen for CancelledScreen {
    fn render(&self, _app: &App, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(f.area());

        render_banner("Workout cancelled, nothing was saved", Color::Red, f, chunks[1]);
        render_legend("(esc)ape", f, chunks[2]);
    }
}

/// Legend line with the navigation keys that are currently allowed
fn navigation_legend(app: &App, prefix: &str) -> String {
    let ctx = app.machine.context();
    let mut parts = vec![prefix.to_string()];
    if can_move_previous(ctx) {
        parts.push("(p)rev".to_string());
    }
    if can_move_next(ctx) {
        parts.push("(n)ext".to_string());
    }
    parts.push("(space) pause / (e)nd / (esc) cancel".to_string());
    parts.join(" / ")
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: SessionState) -> Box<dyn Screen> {
    match state {
        SessionState::Idle => Box::new(OverviewScreen),
        SessionState::Exercising(ExercisePhase::Performing) => Box::new(ExerciseScreen),
        SessionState::Exercising(ExercisePhase::Resting) => Box::new(RestScreen),
        SessionState::Paused => Box::new(PausedScreen),
        SessionState::Completing => Box::new(CompletingScreen),
        SessionState::Completed => Box::new(SummaryScreen),
        SessionState::Cancelled => Box::new(CancelledScreen),
    }
}
