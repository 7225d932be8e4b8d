use url::Url;

use crate::models::errors::LiveError;

/// Typed upstream endpoints. Each variant maps to one endpoint class with
/// its own response schema (see `schema.rs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Players, teams, gameweeks and the total player population.
    Bootstrap,
    /// Raw per-player stats for one gameweek.
    LiveEvent { gameweek: u32 },
    /// A manager's season summary.
    Entry { manager_id: i64 },
    /// A manager's picks for one gameweek.
    EntryPicks { manager_id: i64, gameweek: u32 },
    /// One page of a classic league's standings.
    LeagueStandings { league_id: i64, page: u32 },
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Endpoint::Bootstrap => "bootstrap-static/".to_string(),
            Endpoint::LiveEvent { gameweek } => format!("event/{}/live/", gameweek),
            Endpoint::Entry { manager_id } => format!("entry/{}/", manager_id),
            Endpoint::EntryPicks {
                manager_id,
                gameweek,
            } => format!("entry/{}/event/{}/picks/", manager_id, gameweek),
            Endpoint::LeagueStandings { league_id, page } => format!(
                "leagues-classic/{}/standings/?page_standings={}",
                league_id, page
            ),
        }
    }

    pub fn url(&self, base: &Url) -> Result<Url, LiveError> {
        base.join(&self.path())
            .map_err(|e| LiveError::ValidationError(format!("bad upstream url: {}", e)))
    }

    /// Key for the short-TTL response cache.
    pub fn cache_key(&self) -> String {
        format!("upstream:{}", self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_stable() {
        assert_eq!(Endpoint::Bootstrap.path(), "bootstrap-static/");
        assert_eq!(Endpoint::LiveEvent { gameweek: 7 }.path(), "event/7/live/");
        assert_eq!(
            Endpoint::EntryPicks {
                manager_id: 42,
                gameweek: 7
            }
            .path(),
            "entry/42/event/7/picks/"
        );
    }

    #[test]
    fn urls_join_against_base() {
        let base = Url::parse("https://fantasy.example.com/api/").unwrap();
        let url = Endpoint::Entry { manager_id: 9 }.url(&base).unwrap();
        assert_eq!(url.as_str(), "https://fantasy.example.com/api/entry/9/");
    }
}
