use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
}

impl Position {
    pub fn label(self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub team: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub abbr: String,
    pub roster: Vec<Player>,
}

impl Team {
    pub fn player(&self, name: &str) -> Option<&Player> {
        self.roster.iter().find(|p| p.name == name)
    }

    pub fn first_at(&self, position: Position) -> Option<&Player> {
        self.roster.iter().find(|p| p.position == position)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    pub home: Team,
    pub away: Team,
}

impl Matchup {
    pub fn label(&self) -> String {
        format!("{} @ {}", self.away.abbr, self.home.abbr)
    }

    /// Default pair of tracked players: the home quarterback and the away
    /// team's first non-quarterback skill player.
    pub fn default_tracked(&self) -> Option<[Player; 2]> {
        let a = self.home.first_at(Position::QB)?.clone();
        let b = self
            .away
            .roster
            .iter()
            .find(|p| p.position != Position::QB)?
            .clone();
        Some([a, b])
    }

    pub fn all_players(&self) -> impl Iterator<Item = &Player> {
        self.home.roster.iter().chain(self.away.roster.iter())
    }
}

pub fn catalog() -> Vec<Team> {
    vec![
        team(
            "Kansas City Chiefs",
            "KC",
            &[
                ("Patrick Mahomes", Position::QB),
                ("Isiah Pacheco", Position::RB),
                ("Travis Kelce", Position::TE),
                ("Rashee Rice", Position::WR),
            ],
        ),
        team(
            "Buffalo Bills",
            "BUF",
            &[
                ("Josh Allen", Position::QB),
                ("James Cook", Position::RB),
                ("Khalil Shakir", Position::WR),
                ("Dalton Kincaid", Position::TE),
            ],
        ),
        team(
            "Philadelphia Eagles",
            "PHI",
            &[
                ("Jalen Hurts", Position::QB),
                ("Saquon Barkley", Position::RB),
                ("A.J. Brown", Position::WR),
                ("Dallas Goedert", Position::TE),
            ],
        ),
        team(
            "San Francisco 49ers",
            "SF",
            &[
                ("Brock Purdy", Position::QB),
                ("Christian McCaffrey", Position::RB),
                ("George Kittle", Position::TE),
                ("Brandon Aiyuk", Position::WR),
            ],
        ),
    ]
}

pub fn find_team(abbr: &str) -> Option<Team> {
    let key = abbr.trim().to_ascii_uppercase();
    catalog().into_iter().find(|t| t.abbr == key)
}

/// Pairs up the catalog into home/away matchups in listing order.
pub fn matchups() -> Vec<Matchup> {
    let teams = catalog();
    let mut out = Vec::new();
    for (i, home) in teams.iter().enumerate() {
        for away in teams.iter().skip(i + 1) {
            out.push(Matchup {
                home: home.clone(),
                away: away.clone(),
            });
        }
    }
    out
}

fn team(name: &str, abbr: &str, players: &[(&str, Position)]) -> Team {
    Team {
        name: name.to_string(),
        abbr: abbr.to_string(),
        roster: players
            .iter()
            .map(|(player, position)| Player {
                name: player.to_string(),
                team: abbr.to_string(),
                position: *position,
            })
            .collect(),
    }
}
