//! Tunables for a session.

use std::time::Duration;

/// Topics offered by `RequestRandomTheme` when none are configured.
pub const DEFAULT_THEME_PRESETS: &[&str] = &[
    "How much you would enjoy it as a birthday present",
    "How scary a movie monster is",
    "How popular a food is at a barbecue",
    "How useful an item is on a desert island",
    "How strong an animal is",
    "How exciting a sport is to watch",
    "How expensive something feels",
    "How hard a job would be for a robot",
    "How romantic a place is for a first date",
    "How much a superpower would help in daily life",
    "How cute an animal is",
    "How famous a person is",
    "How spicy a dish is",
    "How embarrassing it would be to be caught doing it",
    "How much you need it when you travel",
    "How likely it is to make a child cry",
    "How tasty a snack is at midnight",
    "How cool a vehicle is",
    "How relaxing a hobby is",
    "How healthy a breakfast is",
];

/// Session-level settings. Override field by field from `Default`.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Secret a spectator must supply to run an emergency reset.
    pub reset_secret: String,
    /// Most chat messages kept.
    pub chat_capacity: usize,
    /// Chat messages older than this are dropped.
    pub chat_retention: Duration,
    /// Delay between the last connection leaving and the full wipe.
    pub empty_room_grace: Duration,
    /// Pause between a failed wolf-mode reveal and the first ballot.
    pub vote_announce_pause: Duration,
    /// Pause before a restarted round 1 or a runoff opens.
    pub vote_round_pause: Duration,
    pub theme_presets: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reset_secret: "admin".to_string(),
            chat_capacity: 100,
            chat_retention: Duration::from_secs(5 * 60 * 60),
            empty_room_grace: Duration::from_secs(10),
            vote_announce_pause: Duration::from_secs(3),
            vote_round_pause: Duration::from_secs(3),
            theme_presets: DEFAULT_THEME_PRESETS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}
