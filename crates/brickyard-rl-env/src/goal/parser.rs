//! Goal string grammar.
//!
//! A goal is a sequence of two-character tokens, bottom level first:
//! `1b` one block, `2b` two blocks side by side, `1l` brick, `1r` triangle,
//! `2r` roof. `"2b1l2r"` is two ground blocks bridged by a brick with a
//! roof on top.

use std::fmt;
use std::str::FromStr;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use brickyard_rl_core::{RLError, Result};

use super::CategoryCounts;
use crate::scene::ObjectKind;

/// One token of the goal grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalToken {
    /// `1b`
    OneBlock,
    /// `2b`
    TwoBlocks,
    /// `1l`
    Brick,
    /// `1r`
    Triangle,
    /// `2r`
    Roof,
}

/// How many objects a level holds and how it rests on the level below
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelShape {
    /// One small object
    Single,
    /// Two small objects side by side
    Double,
    /// One long object meant to bridge two supports
    Spanning,
}

impl GoalToken {
    /// Every token, in grammar order
    pub const ALL: [GoalToken; 5] = [
        Self::OneBlock,
        Self::TwoBlocks,
        Self::Brick,
        Self::Triangle,
        Self::Roof,
    ];

    /// Two-character code
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::OneBlock => "1b",
            Self::TwoBlocks => "2b",
            Self::Brick => "1l",
            Self::Triangle => "1r",
            Self::Roof => "2r",
        }
    }

    /// Placement shape of the level
    #[must_use]
    pub fn shape(self) -> LevelShape {
        match self {
            Self::OneBlock | Self::Triangle => LevelShape::Single,
            Self::TwoBlocks => LevelShape::Double,
            Self::Brick | Self::Roof => LevelShape::Spanning,
        }
    }

    /// Kind of every object on the level
    #[must_use]
    pub fn kind(self) -> ObjectKind {
        match self {
            Self::OneBlock | Self::TwoBlocks => ObjectKind::Cube,
            Self::Brick => ObjectKind::Brick,
            Self::Triangle => ObjectKind::Triangle,
            Self::Roof => ObjectKind::Roof,
        }
    }

    /// Number of objects on the level
    #[must_use]
    pub fn object_count(self) -> usize {
        match self.shape() {
            LevelShape::Double => 2,
            LevelShape::Single | LevelShape::Spanning => 1,
        }
    }
}

impl fmt::Display for GoalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GoalToken {
    type Err = RLError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == s)
            .ok_or_else(|| RLError::MalformedGoal {
                goal: s.to_string(),
                reason: format!("unknown token '{s}'"),
            })
    }
}

/// Resolved horizontal position(s) of a level
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// One object
    Single(Point2<f64>),
    /// Two objects
    Pair(Point2<f64>, Point2<f64>),
}

impl Placement {
    /// Every resolved point
    #[must_use]
    pub fn points(&self) -> Vec<Point2<f64>> {
        match *self {
            Self::Single(p) => vec![p],
            Self::Pair(a, b) => vec![a, b],
        }
    }
}

/// One vertical layer of the target structure
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    token: GoalToken,
    height: usize,
    below: Option<usize>,
    placement: Option<Placement>,
}

impl Level {
    /// Token of this level
    #[must_use]
    pub fn token(&self) -> GoalToken {
        self.token
    }

    /// Layer index, zero at the table
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Index of the supporting level, `None` for the bottom
    #[must_use]
    pub fn below(&self) -> Option<usize> {
        self.below
    }

    /// Resolved position(s), once generated
    #[must_use]
    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    pub(crate) fn resolve(&mut self, placement: Placement) -> Result<()> {
        if self.placement.is_some() {
            return Err(RLError::Environment(format!(
                "level {} ('{}') is already resolved",
                self.height, self.token
            )));
        }
        self.placement = Some(placement);
        Ok(())
    }
}

/// Ordered levels of a goal, bottom first
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    levels: Vec<Level>,
}

impl Stack {
    /// Levels, bottom first
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub(crate) fn level_mut(&mut self, index: usize) -> Option<&mut Level> {
        self.levels.get_mut(index)
    }

    /// Number of levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the stack has no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Token sequence, bottom first
    #[must_use]
    pub fn tokens(&self) -> Vec<GoalToken> {
        self.levels.iter().map(Level::token).collect()
    }

    /// Whether every level has a placement
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.levels.iter().all(|l| l.placement.is_some())
    }

    /// Objects implied per category
    #[must_use]
    pub fn counts(&self) -> CategoryCounts {
        let mut counts = CategoryCounts::default();
        for level in &self.levels {
            counts.add(level.token.kind(), level.token.object_count());
        }
        counts
    }
}

/// A parsed goal: the stack plus the objects it consumes
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGoal {
    /// Source string
    pub goal: String,
    /// Levels, unresolved
    pub stack: Stack,
    /// Objects per category the structure uses
    pub counts: CategoryCounts,
}

/// Parse a goal string into a stack of unresolved levels
pub fn parse_goal(goal: &str) -> Result<ParsedGoal> {
    let malformed = |reason: String| RLError::MalformedGoal {
        goal: goal.to_string(),
        reason,
    };

    if !goal.is_ascii() {
        return Err(malformed("goal must be ASCII".to_string()));
    }
    if goal.len() % 2 != 0 {
        return Err(malformed(format!("odd length {}", goal.len())));
    }

    let mut levels = Vec::with_capacity(goal.len() / 2);
    for (height, chunk) in goal.as_bytes().chunks(2).enumerate() {
        // ASCII was checked above, so every chunk is valid UTF-8
        let code = std::str::from_utf8(chunk).map_err(|e| malformed(e.to_string()))?;
        let token = code
            .parse::<GoalToken>()
            .map_err(|_| malformed(format!("unknown token '{code}' at level {height}")))?;

        levels.push(Level {
            token,
            height,
            below: height.checked_sub(1),
            placement: None,
        });
    }

    let stack = Stack { levels };
    let counts = stack.counts();
    Ok(ParsedGoal {
        goal: goal.to_string(),
        stack,
        counts,
    })
}

impl FromStr for ParsedGoal {
    type Err = RLError;

    fn from_str(s: &str) -> Result<Self> {
        parse_goal(s)
    }
}
