//! Static workout catalog.
//!
//! The routines are hard-coded content, not user data; they never touch the
//! stores.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four routine kinds offered on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkoutKind {
    Push,
    Pull,
    Legs,
    FullBody,
}

impl WorkoutKind {
    pub const ALL: [WorkoutKind; 4] = [
        WorkoutKind::Push,
        WorkoutKind::Pull,
        WorkoutKind::Legs,
        WorkoutKind::FullBody,
    ];

    /// URL- and CLI-friendly identifier.
    pub fn slug(self) -> &'static str {
        match self {
            WorkoutKind::Push => "push",
            WorkoutKind::Pull => "pull",
            WorkoutKind::Legs => "legs",
            WorkoutKind::FullBody => "full-body",
        }
    }
}

impl fmt::Display for WorkoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Error for unrecognized workout slugs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown workout: {0}")]
pub struct UnknownWorkout(pub String);

impl FromStr for WorkoutKind {
    type Err = UnknownWorkout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| UnknownWorkout(s.to_string()))
    }
}

/// One exercise line in a routine table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: u8,
    /// Free-form rep prescription ("8-10", "Till Failure", "30 sec").
    pub reps: String,
}

/// A complete display routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRoutine {
    pub kind: WorkoutKind,
    pub title: String,
    pub focus: String,
    /// Suggested rounds through the list, where the routine defines any.
    pub rounds: Option<u8>,
    pub exercises: Vec<Exercise>,
}

fn exercise(name: &str, sets: u8, reps: &str) -> Exercise {
    Exercise {
        name: name.to_string(),
        sets,
        reps: reps.to_string(),
    }
}

/// The routine for one workout kind.
pub fn routine(kind: WorkoutKind) -> WorkoutRoutine {
    match kind {
        WorkoutKind::Push => WorkoutRoutine {
            kind,
            title: "Push Day".to_string(),
            focus: "Focus on chest, shoulders, and triceps with these compound movements. \
                    Remember to warm up properly and maintain good form throughout."
                .to_string(),
            rounds: Some(5),
            exercises: vec![
                exercise("Machine over-head shoulder press", 3, "10"),
                exercise("Over head dumbbell press", 3, "10"),
                exercise("Inclined dumbbell press", 3, "10"),
                exercise("Flat dumbbell press", 3, "6-8"),
                exercise("Machine-chest press", 3, "10"),
            ],
        },
        WorkoutKind::Pull => WorkoutRoutine {
            kind,
            title: "Pull Day".to_string(),
            focus: "Back and biceps: vertical and horizontal pulling, then curls."
                .to_string(),
            rounds: None,
            exercises: vec![
                exercise("Pull-ups", 3, "8-12"),
                exercise("Seated Rows", 3, "8-10"),
                exercise("Lat Pulldown", 3, "8-10"),
                exercise("Bicep Hammer Curls", 3, "10-12"),
            ],
        },
        WorkoutKind::Legs => WorkoutRoutine {
            kind,
            title: "Leg Day".to_string(),
            focus: "Quads, hamstrings, and glutes; go heavy on the compounds first."
                .to_string(),
            rounds: None,
            exercises: vec![
                exercise("Squats", 4, "8-10"),
                exercise("Leg Press", 3, "10-12"),
                exercise("Romanian Deadlifts", 3, "8-10"),
                exercise("Walking Lunges", 3, "12-15"),
            ],
        },
        WorkoutKind::FullBody => WorkoutRoutine {
            kind,
            title: "Full Body".to_string(),
            focus: "One heavy compound per movement pattern, finished with a carry."
                .to_string(),
            rounds: None,
            exercises: vec![
                exercise("Bench Press", 4, "4-6"),
                exercise("Pull-ups", 3, "Till Failure"),
                exercise("Squats", 3, "4-6"),
                exercise("Farmer's Walk", 2, "30 sec"),
            ],
        },
    }
}

/// All routines, in dashboard order.
pub fn catalog() -> Vec<WorkoutRoutine> {
    WorkoutKind::ALL.into_iter().map(routine).collect()
}
