use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::roster::{Player, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatCategory {
    PassingYards,
    PassingTouchdowns,
    RushingYards,
    RushingTouchdowns,
    ReceivingYards,
    ReceivingTouchdowns,
}

impl StatCategory {
    pub fn label(self) -> &'static str {
        match self {
            StatCategory::PassingYards => "Pass Yds",
            StatCategory::PassingTouchdowns => "Pass TD",
            StatCategory::RushingYards => "Rush Yds",
            StatCategory::RushingTouchdowns => "Rush TD",
            StatCategory::ReceivingYards => "Rec Yds",
            StatCategory::ReceivingTouchdowns => "Rec TD",
        }
    }

    fn line_bucket(self) -> &'static [f64] {
        match self {
            StatCategory::PassingYards => &[224.5, 249.5, 274.5, 299.5],
            StatCategory::PassingTouchdowns => &[1.5, 2.5],
            StatCategory::RushingYards => &[54.5, 64.5, 75.5, 89.5],
            StatCategory::RushingTouchdowns => &[0.5],
            StatCategory::ReceivingYards => &[49.5, 64.5, 79.5],
            StatCategory::ReceivingTouchdowns => &[0.5],
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Over => "Over",
            Direction::Under => "Under",
        }
    }
}

/// A player statistic paired with a line and an over/under side. Immutable for
/// the lifetime of a run; windows and reports hold clones of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropLine {
    pub player: Player,
    pub category: StatCategory,
    pub line: f64,
    pub direction: Direction,
}

impl fmt::Display for PropLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.player.name,
            self.direction.label(),
            self.line,
            self.category.label()
        )
    }
}

pub fn templates(position: Position) -> &'static [StatCategory] {
    match position {
        Position::QB => &[StatCategory::PassingYards, StatCategory::PassingTouchdowns],
        Position::RB => &[StatCategory::RushingYards, StatCategory::RushingTouchdowns],
        Position::WR | Position::TE => &[
            StatCategory::ReceivingYards,
            StatCategory::ReceivingTouchdowns,
        ],
    }
}

pub fn generate_prop<R: Rng + ?Sized>(player: &Player, rng: &mut R) -> PropLine {
    let options = templates(player.position);
    let category = *options.choose(rng).unwrap_or(&options[0]);
    let bucket = category.line_bucket();
    let line = *bucket.choose(rng).unwrap_or(&bucket[0]);
    let direction = if rng.gen_bool(0.5) {
        Direction::Over
    } else {
        Direction::Under
    };
    PropLine {
        player: player.clone(),
        category,
        line,
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn player(position: Position) -> Player {
        Player {
            name: "Test Player".to_string(),
            team: "TST".to_string(),
            position,
        }
    }

    #[test]
    fn props_follow_position_templates() {
        let mut rng = StdRng::seed_from_u64(7);
        for pos in [Position::QB, Position::RB, Position::WR, Position::TE] {
            for _ in 0..50 {
                let prop = generate_prop(&player(pos), &mut rng);
                assert!(templates(pos).contains(&prop.category));
                assert!(prop.category.line_bucket().contains(&prop.line));
            }
        }
    }

    #[test]
    fn both_directions_appear() {
        let mut rng = StdRng::seed_from_u64(11);
        let dirs: Vec<Direction> = (0..64)
            .map(|_| generate_prop(&player(Position::RB), &mut rng).direction)
            .collect();
        assert!(dirs.contains(&Direction::Over));
        assert!(dirs.contains(&Direction::Under));
    }
}
