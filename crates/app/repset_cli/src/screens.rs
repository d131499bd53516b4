//! Plain-text screen rendering.

use repset_core::models::Profile;
use repset_core::workouts::WorkoutRoutine;

pub fn render_profile(profile: &Profile) -> String {
    let avatar = profile.avatar_address.as_deref().unwrap_or("(none)");
    format!("Welcome back, {}!\navatar: {avatar}", profile.nickname)
}

pub fn render_routine(routine: &WorkoutRoutine) -> String {
    let mut out = format!("{}\n{}\n", routine.title, routine.focus);
    if let Some(rounds) = routine.rounds {
        out.push_str(&format!("{rounds} rounds of:\n"));
    }
    for exercise in &routine.exercises {
        out.push_str(&format!(
            "  {:<40} {} x {}\n",
            exercise.name, exercise.sets, exercise.reps
        ));
    }
    out
}

pub fn render_catalog(catalog: &[WorkoutRoutine]) -> String {
    let mut out = String::from("Workouts:\n");
    for routine in catalog {
        out.push_str(&format!("  {:<12} {}\n", routine.kind.slug(), routine.title));
    }
    out
}
