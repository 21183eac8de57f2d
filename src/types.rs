// Data model shared by the board, print sheet, and editor.
// Schema matches the published roadmap JSON exactly (camelCase, "type", "" for no image).

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, RoadmapError};
use crate::layout::{default_board_layout, default_print_layout, LayoutParams, ResponsiveLayout};
use crate::scroll::ScrollSettings;

/// Board coordinate in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    pub fn offset(self, by: Point) -> Self {
        Point::new(self.x + by.x, self.y + by.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A single ordered unit of content. `id` is always its 1-based position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub step_type: String,
    #[serde(
        default,
        serialize_with = "none_as_empty",
        deserialize_with = "empty_as_none"
    )]
    pub image: Option<String>,
}

impl Step {
    pub(crate) fn placeholder(id: u32) -> Self {
        Step {
            id,
            title: "New Step".to_string(),
            content: String::new(),
            step_type: "task".to_string(),
            image: None,
        }
    }
}

/// A named collection of ordered steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub game_id: String,
    pub game_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Game {
    pub fn step(&self, step_id: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Re-derive every step id from its position.
    pub(crate) fn renumber(&mut self) {
        for (k, step) in self.steps.iter_mut().enumerate() {
            step.id = k as u32 + 1;
        }
    }

    fn is_numbered(&self) -> bool {
        self.steps
            .iter()
            .enumerate()
            .all(|(k, s)| s.id == k as u32 + 1)
    }
}

/// Editable game field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameField {
    GameId,
    GameName,
    Description,
}

/// Editable step field. The id is positional and never edited directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepField {
    Title,
    Content,
    Type,
    Image,
}

impl FromStr for GameField {
    type Err = RoadmapError;

    /// Accepts the schema key names.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gameId" => Ok(GameField::GameId),
            "gameName" => Ok(GameField::GameName),
            "description" => Ok(GameField::Description),
            other => Err(RoadmapError::UnknownField(other.to_string())),
        }
    }
}

impl FromStr for StepField {
    type Err = RoadmapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "title" => Ok(StepField::Title),
            "content" => Ok(StepField::Content),
            "type" => Ok(StepField::Type),
            "image" => Ok(StepField::Image),
            other => Err(RoadmapError::UnknownField(other.to_string())),
        }
    }
}

/// Check the collection invariants: unique game ids and positional step ids.
pub fn validate_games(games: &[Game]) -> Result<()> {
    let mut seen = HashSet::with_capacity(games.len());
    for game in games {
        if !seen.insert(game.game_id.as_str()) {
            return Err(RoadmapError::InvalidSnapshot(format!(
                "duplicate gameId {}",
                game.game_id
            )));
        }
        if !game.is_numbered() {
            return Err(RoadmapError::InvalidSnapshot(format!(
                "step ids of {} are not 1..={}",
                game.game_id,
                game.steps.len()
            )));
        }
    }
    Ok(())
}

/// Parse and validate a snapshot in the canonical schema.
pub fn parse_snapshot(json: &str) -> Result<Vec<Game>> {
    let games: Vec<Game> = serde_json::from_str(json)?;
    validate_games(&games)?;
    Ok(games)
}

fn none_as_empty<S: Serializer>(
    value: &Option<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

fn empty_as_none<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Core configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapConfig {
    #[serde(default = "default_board_layout")]
    pub board: ResponsiveLayout,
    #[serde(default = "default_print_layout")]
    pub print: LayoutParams,
    #[serde(default)]
    pub scroll: ScrollSettings,
    /// Local buffer key for staged edits.
    #[serde(default = "default_buffer_key")]
    pub buffer_key: String,
}

fn default_buffer_key() -> String {
    "roadmapData".to_string()
}

impl Default for RoadmapConfig {
    fn default() -> Self {
        RoadmapConfig {
            board: default_board_layout(),
            print: default_print_layout(),
            scroll: ScrollSettings::default(),
            buffer_key: default_buffer_key(),
        }
    }
}

impl RoadmapConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RoadmapConfig = serde_json::from_str(json)
            .map_err(|e| RoadmapError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.scroll.threshold > 0.0) {
            return Err(RoadmapError::InvalidConfig(
                "scroll.threshold must be positive".to_string(),
            ));
        }
        if !(self.scroll.max_speed >= 0.0) {
            return Err(RoadmapError::InvalidConfig(
                "scroll.max_speed must not be negative".to_string(),
            ));
        }
        if self.buffer_key.is_empty() {
            return Err(RoadmapError::InvalidConfig(
                "buffer_key must not be empty".to_string(),
            ));
        }
        for (name, params) in [
            ("board.wide", &self.board.wide),
            ("board.compact", &self.board.compact),
            ("print", &self.print),
        ] {
            if !params.is_finite() {
                return Err(RoadmapError::InvalidConfig(format!(
                    "{name} has non-finite spacing"
                )));
            }
        }
        Ok(())
    }
}
