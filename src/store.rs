// Staged working copy of all games and steps.
// Every committed mutation re-derives step ids, is mirrored into the local buffer, then
// notifies observers. The published snapshot is only replaced by a successful publish.

use tracing::{debug, info, warn};

use crate::buffer::KeyValueStore;
use crate::error::{Result, RoadmapError};
use crate::events::{ListenerId, Listeners};
use crate::types::{parse_snapshot, validate_games, Game, GameField, Step, StepField};

/// Privileged save path that overwrites the durable snapshot with an exported artifact.
pub trait SaveEndpoint {
    fn save(&mut self, artifact: &str) -> std::result::Result<(), String>;
}

impl<F> SaveEndpoint for F
where
    F: FnMut(&str) -> std::result::Result<(), String>,
{
    fn save(&mut self, artifact: &str) -> std::result::Result<(), String> {
        self(artifact)
    }
}

/// In-session working copy backed by a recoverable buffer.
pub struct StagedStore<B: KeyValueStore> {
    games: Vec<Game>,
    published: Vec<Game>,
    buffer: B,
    buffer_key: String,
    observers: Listeners<[Game]>,
}

impl<B: KeyValueStore> StagedStore<B> {
    /// Open a session over `published`, resuming staged edits from `buffer` if it holds any.
    pub fn open(published: Vec<Game>, buffer: B, buffer_key: impl Into<String>) -> Result<Self> {
        validate_games(&published)?;
        let buffer_key = buffer_key.into();
        let games = match buffer.load(&buffer_key) {
            Ok(Some(json)) => match parse_snapshot(&json) {
                Ok(games) => {
                    info!(key = %buffer_key, games = games.len(), "Resuming staged edits");
                    games
                }
                Err(e) => {
                    warn!(key = %buffer_key, error = %e, "Ignoring unreadable staged buffer");
                    published.clone()
                }
            },
            Ok(None) => published.clone(),
            Err(e) => {
                warn!(key = %buffer_key, error = %e, "Staged buffer unavailable");
                published.clone()
            }
        };

        Ok(StagedStore {
            games,
            published,
            buffer,
            buffer_key,
            observers: Listeners::new(),
        })
    }

    /// Open from a durable snapshot in the canonical JSON schema.
    pub fn from_json(
        published_json: &str,
        buffer: B,
        buffer_key: impl Into<String>,
    ) -> Result<Self> {
        let published = parse_snapshot(published_json)?;
        Self::open(published, buffer, buffer_key)
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn game(&self, game_id: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.game_id == game_id)
    }

    pub fn published(&self) -> &[Game] {
        &self.published
    }

    /// True when the working copy differs from the published snapshot.
    pub fn has_local_edits(&self) -> bool {
        self.games != self.published
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn buffer_key(&self) -> &str {
        &self.buffer_key
    }

    /// Register a callback run after every committed mutation.
    pub fn subscribe(&mut self, callback: impl FnMut(&[Game]) + 'static) -> ListenerId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Append a game with a fresh unique id and no steps.
    pub fn create_game(&mut self) -> Result<Game> {
        let game = Game {
            game_id: self.next_game_id(),
            game_name: "New Game".to_string(),
            description: String::new(),
            steps: Vec::new(),
        };
        self.games.push(game.clone());
        self.commit("create_game", &game.game_id)?;
        Ok(game)
    }

    pub fn update_game(&mut self, game_id: &str, field: GameField, value: &str) -> Result<()> {
        if field == GameField::GameId
            && value != game_id
            && self.games.iter().any(|g| g.game_id == value)
        {
            warn!(game_id, new_id = value, "Rejected duplicate game id");
            return Err(RoadmapError::DuplicateGameId(value.to_string()));
        }
        let game = self.game_mut(game_id)?;
        match field {
            GameField::GameId => game.game_id = value.to_string(),
            GameField::GameName => game.game_name = value.to_string(),
            GameField::Description => game.description = value.to_string(),
        }
        let id = game.game_id.clone();
        self.commit("update_game", &id)
    }

    /// Remove a game. The caller confirms intent first; there is no undo.
    pub fn delete_game(&mut self, game_id: &str) -> Result<()> {
        let index = self
            .games
            .iter()
            .position(|g| g.game_id == game_id)
            .ok_or_else(|| not_found(game_id))?;
        self.games.remove(index);
        self.commit("delete_game", game_id)
    }

    /// Append a placeholder step numbered `len + 1`.
    pub fn create_step(&mut self, game_id: &str) -> Result<Step> {
        let game = self.game_mut(game_id)?;
        let step = Step::placeholder(game.steps.len() as u32 + 1);
        game.steps.push(step.clone());
        self.commit("create_step", game_id)?;
        Ok(step)
    }

    pub fn update_step(
        &mut self,
        game_id: &str,
        step_id: u32,
        field: StepField,
        value: &str,
    ) -> Result<()> {
        let game = self.game_mut(game_id)?;
        let step = game
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| step_not_found(game_id, step_id))?;
        match field {
            StepField::Title => step.title = value.to_string(),
            StepField::Content => step.content = value.to_string(),
            StepField::Type => step.step_type = value.to_string(),
            StepField::Image => {
                step.image = (!value.is_empty()).then(|| value.to_string());
            }
        }
        self.commit("update_step", game_id)
    }

    /// Remove a step and renumber the rest.
    pub fn delete_step(&mut self, game_id: &str, step_id: u32) -> Result<()> {
        let game = self.game_mut(game_id)?;
        let index = game
            .steps
            .iter()
            .position(|s| s.id == step_id)
            .ok_or_else(|| step_not_found(game_id, step_id))?;
        game.steps.remove(index);
        game.renumber();
        self.commit("delete_step", game_id)
    }

    /// Move the step at `from` to `to` and renumber. Equal indices are a no-op.
    pub fn reorder_step(&mut self, game_id: &str, from: usize, to: usize) -> Result<()> {
        let game = self.game_mut(game_id)?;
        let len = game.steps.len();
        for index in [from, to] {
            if index >= len {
                warn!(game_id, index, len, "Reorder index out of range");
                return Err(RoadmapError::OutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }
        let step = game.steps.remove(from);
        game.steps.insert(to, step);
        game.renumber();
        debug!(game_id, from, to, "Reordered step");
        self.commit("reorder_step", game_id)
    }

    /// Serialize the working copy to the canonical schema, pretty-printed.
    pub fn export_snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.games)?)
    }

    /// Drop staged edits and reload the last published snapshot.
    pub fn reset_to_published(&mut self) -> Result<()> {
        self.games = self.published.clone();
        info!(key = %self.buffer_key, "Reset to published snapshot");
        let cleared = self.buffer.clear(&self.buffer_key);
        self.observers.emit(&self.games);
        cleared.map_err(|e| {
            warn!(error = %e, "Failed to clear staged buffer");
            persist_failure(e)
        })
    }

    /// Send the exported artifact to `endpoint`. On success it becomes the published
    /// baseline; on failure nothing changes. The working copy is never touched.
    pub fn publish<E: SaveEndpoint + ?Sized>(&mut self, endpoint: &mut E) -> Result<()> {
        let artifact = self.export_snapshot()?;
        match endpoint.save(&artifact) {
            Ok(()) => {
                self.published = self.games.clone();
                info!(games = self.games.len(), "Published snapshot");
                Ok(())
            }
            Err(message) => {
                warn!(error = %message, "Publish failed");
                Err(RoadmapError::PersistFailure(message))
            }
        }
    }

    fn game_mut(&mut self, game_id: &str) -> Result<&mut Game> {
        self.games
            .iter_mut()
            .find(|g| g.game_id == game_id)
            .ok_or_else(|| not_found(game_id))
    }

    fn next_game_id(&self) -> String {
        let mut n = self.games.len() + 1;
        loop {
            let candidate = format!("game-{n}");
            if self.game(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Mirror the working copy into the buffer, then notify observers.
    /// The in-memory mutation stands even if the buffer write fails.
    fn commit(&mut self, op: &'static str, game_id: &str) -> Result<()> {
        debug!(op, game_id, "Committed mutation");
        let persisted = serde_json::to_string(&self.games)
            .map_err(RoadmapError::from)
            .and_then(|json| self.buffer.save(&self.buffer_key, &json));
        self.observers.emit(&self.games);
        persisted.map_err(|e| {
            warn!(op, error = %e, "Failed to persist staged edits");
            persist_failure(e)
        })
    }
}

fn not_found(game_id: &str) -> RoadmapError {
    warn!(game_id, "Game not found");
    RoadmapError::GameNotFound {
        game_id: game_id.to_string(),
    }
}

fn step_not_found(game_id: &str, step_id: u32) -> RoadmapError {
    warn!(game_id, step_id, "Step not found");
    RoadmapError::StepNotFound {
        game_id: game_id.to_string(),
        step_id,
    }
}

fn persist_failure(err: RoadmapError) -> RoadmapError {
    match err {
        RoadmapError::PersistFailure(_) => err,
        other => RoadmapError::PersistFailure(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::buffer::{FailingBuffer, MemoryBuffer};
    use crate::layout::LayoutParams;
    use crate::types::Point;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    const KEY: &str = "roadmapData";

    pub(crate) fn game_with_steps(game_id: &str, count: usize) -> Game {
        let mut game = Game {
            game_id: game_id.to_string(),
            game_name: game_id.to_uppercase(),
            description: format!("{game_id} roadmap"),
            steps: (0..count)
                .map(|i| Step {
                    id: i as u32 + 1,
                    title: format!("step-{}", i + 1),
                    content: String::new(),
                    step_type: "task".to_string(),
                    image: None,
                })
                .collect(),
        };
        game.renumber();
        game
    }

    fn store(count: usize) -> StagedStore<MemoryBuffer> {
        StagedStore::open(
            vec![game_with_steps("mc", count), game_with_steps("rb", 2)],
            MemoryBuffer::new(),
            KEY,
        )
        .unwrap()
    }

    fn titles(store: &StagedStore<MemoryBuffer>, game_id: &str) -> Vec<String> {
        store
            .game(game_id)
            .unwrap()
            .steps
            .iter()
            .map(|s| s.title.clone())
            .collect()
    }

    fn assert_numbered(game: &Game) {
        for (k, step) in game.steps.iter().enumerate() {
            assert_eq!(step.id, k as u32 + 1);
        }
    }

    #[test]
    fn create_game_generates_unique_id() {
        let mut store = store(0);
        let a = store.create_game().unwrap();
        let b = store.create_game().unwrap();
        assert_ne!(a.game_id, b.game_id);
        assert!(a.steps.is_empty());
        assert_eq!(store.games().len(), 4);
    }

    #[test]
    fn create_game_skips_taken_ids() {
        let mut store = StagedStore::open(
            vec![game_with_steps("game-2", 0)],
            MemoryBuffer::new(),
            KEY,
        )
        .unwrap();
        assert_eq!(store.create_game().unwrap().game_id, "game-3");
    }

    #[test]
    fn update_game_fields() {
        let mut store = store(1);
        store
            .update_game("mc", GameField::GameName, "Minecraft")
            .unwrap();
        store
            .update_game("mc", GameField::GameId, "minecraft")
            .unwrap();
        assert_eq!(store.game("minecraft").unwrap().game_name, "Minecraft");
        assert!(store.game("mc").is_none());
    }

    #[test]
    fn update_game_rejects_duplicate_id() {
        let mut store = store(1);
        let err = store.update_game("mc", GameField::GameId, "rb").unwrap_err();
        assert_eq!(err, RoadmapError::DuplicateGameId("rb".to_string()));
        assert!(store.game("mc").is_some());
        // Renaming to itself is fine.
        store.update_game("mc", GameField::GameId, "mc").unwrap();
    }

    #[test]
    fn missing_game_is_not_found() {
        let mut store = store(1);
        assert!(store.update_game("nope", GameField::GameName, "x").unwrap_err().is_not_found());
        assert!(store.delete_game("nope").unwrap_err().is_not_found());
        assert!(store.create_step("nope").unwrap_err().is_not_found());
        assert!(store
            .update_step("mc", 9, StepField::Title, "x")
            .unwrap_err()
            .is_not_found());
        assert!(store.delete_step("mc", 9).unwrap_err().is_not_found());
    }

    #[test]
    fn create_step_appends_placeholder() {
        let mut store = store(2);
        let step = store.create_step("mc").unwrap();
        assert_eq!(step.id, 3);
        assert_eq!(step.title, "New Step");
        assert_numbered(store.game("mc").unwrap());
    }

    #[test]
    fn update_step_image_empty_clears() {
        let mut store = store(1);
        store
            .update_step("mc", 1, StepField::Image, "/img/pick.png")
            .unwrap();
        assert_eq!(
            store.game("mc").unwrap().steps[0].image.as_deref(),
            Some("/img/pick.png")
        );
        store.update_step("mc", 1, StepField::Image, "").unwrap();
        assert_eq!(store.game("mc").unwrap().steps[0].image, None);
    }

    #[test]
    fn delete_step_renumbers() {
        let mut store = store(5);
        store.delete_step("mc", 3).unwrap();
        let game = store.game("mc").unwrap();
        assert_eq!(game.steps.len(), 4);
        assert_numbered(game);
        assert_eq!(titles(&store, "mc"), ["step-1", "step-2", "step-4", "step-5"]);
    }

    #[test]
    fn delete_then_layout_uses_new_sequence() {
        let mut store = store(5);
        store.delete_step("mc", 3).unwrap();
        let params = LayoutParams {
            columns: 3,
            spacing: Point::new(220.0, 180.0),
            padding: Point::new(50.0, 50.0),
            ..LayoutParams::default()
        };
        let positions = params.positions(store.game("mc").unwrap().steps.len());
        assert_eq!(
            positions,
            vec![
                Point::new(50.0, 50.0),
                Point::new(270.0, 50.0),
                Point::new(490.0, 50.0),
                Point::new(490.0, 230.0),
            ]
        );
    }

    #[test]
    fn reorder_moves_and_renumbers() {
        let mut store = store(5);
        store.reorder_step("mc", 0, 3).unwrap();
        assert_eq!(
            titles(&store, "mc"),
            ["step-2", "step-3", "step-4", "step-1", "step-5"]
        );
        assert_numbered(store.game("mc").unwrap());
    }

    #[test]
    fn reorder_same_index_is_silent_noop() {
        let mut store = store(3);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        store.subscribe(move |_| seen.set(seen.get() + 1));
        store.reorder_step("mc", 1, 1).unwrap();
        assert_eq!(calls.get(), 0);
        assert!(!store.buffer().contains(KEY));
    }

    #[test]
    fn reorder_out_of_range() {
        let mut store = store(3);
        assert_eq!(
            store.reorder_step("mc", 0, 3).unwrap_err(),
            RoadmapError::OutOfRange { index: 3, len: 3 }
        );
        assert_eq!(
            store.reorder_step("mc", 5, 5).unwrap_err(),
            RoadmapError::OutOfRange { index: 5, len: 3 }
        );
    }

    #[test]
    fn every_mutation_persists_and_notifies() {
        let mut store = store(2);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let id = store.subscribe(move |_| seen.set(seen.get() + 1));

        store.create_step("mc").unwrap();
        store.reorder_step("mc", 0, 2).unwrap();
        store.delete_step("mc", 1).unwrap();
        assert_eq!(calls.get(), 3);

        let buffered = store.buffer().load(KEY).unwrap().unwrap();
        assert_eq!(parse_snapshot(&buffered).unwrap(), store.games());

        assert!(store.unsubscribe(id));
        store.create_step("mc").unwrap();
        assert_eq!(calls.get(), 3);
        assert_eq!(store.observer_count(), 0);
    }

    #[test]
    fn reopen_resumes_from_buffer() {
        let mut first = store(3);
        first.delete_step("mc", 1).unwrap();
        let buffer = first.buffer().clone();

        let resumed =
            StagedStore::open(first.published().to_vec(), buffer, KEY).unwrap();
        assert_eq!(resumed.games(), first.games());
        assert!(resumed.has_local_edits());
    }

    #[test]
    fn corrupt_buffer_falls_back_to_published() {
        let published = vec![game_with_steps("mc", 2)];
        let buffer = MemoryBuffer::with_entry(KEY, "{ not json");
        let store = StagedStore::open(published.clone(), buffer, KEY).unwrap();
        assert_eq!(store.games(), published.as_slice());
        assert!(!store.has_local_edits());
    }

    #[test]
    fn invalid_published_snapshot_is_rejected() {
        let mut game = game_with_steps("mc", 2);
        game.steps[1].id = 7;
        assert!(matches!(
            StagedStore::open(vec![game], MemoryBuffer::new(), KEY),
            Err(RoadmapError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn reset_discards_buffer() {
        let mut store = store(3);
        store.delete_game("rb").unwrap();
        assert!(store.buffer().contains(KEY));

        store.reset_to_published().unwrap();
        assert!(!store.buffer().contains(KEY));
        assert_eq!(store.games(), store.published());
        assert_eq!(store.games().len(), 2);
    }

    #[test]
    fn export_import_round_trip() {
        let mut store = store(4);
        store.reorder_step("mc", 3, 0).unwrap();
        store
            .update_step("mc", 2, StepField::Image, "/a.png")
            .unwrap();
        store.create_game().unwrap();

        let artifact = store.export_snapshot().unwrap();
        let reloaded = StagedStore::from_json(&artifact, MemoryBuffer::new(), KEY).unwrap();
        assert_eq!(reloaded.games(), store.games());
    }

    #[test]
    fn export_does_not_mutate() {
        let store = store(2);
        let before = store.games().to_vec();
        let artifact = store.export_snapshot().unwrap();
        assert!(artifact.contains("\n  {"));
        assert_eq!(store.games(), before.as_slice());
        assert!(!store.buffer().contains(KEY));
    }

    #[test]
    fn publish_success_moves_baseline() {
        let mut store = store(2);
        store.create_step("mc").unwrap();
        let mut saved = String::new();
        store
            .publish(&mut |artifact: &str| -> std::result::Result<(), String> {
                saved = artifact.to_string();
                Ok(())
            })
            .unwrap();
        assert!(!store.has_local_edits());
        assert_eq!(parse_snapshot(&saved).unwrap(), store.games());
    }

    #[test]
    fn publish_failure_changes_nothing() {
        let mut store = store(2);
        store.create_step("mc").unwrap();
        let games = store.games().to_vec();
        let published = store.published().to_vec();

        let err = store
            .publish(&mut |_: &str| -> std::result::Result<(), String> {
                Err("500 Internal Server Error".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, RoadmapError::PersistFailure(_)));
        assert_eq!(store.games(), games.as_slice());
        assert_eq!(store.published(), published.as_slice());
    }

    #[test]
    fn buffer_write_failure_keeps_mutation() {
        let mut store =
            StagedStore::open(vec![game_with_steps("mc", 2)], FailingBuffer, KEY).unwrap();
        let err = store.create_step("mc").unwrap_err();
        assert!(matches!(err, RoadmapError::PersistFailure(_)));
        assert_eq!(store.game("mc").unwrap().steps.len(), 3);
    }

    mod property_tests {
        use super::*;

        #[derive(Debug, Clone)]
        enum Op {
            Create,
            Delete(usize),
            Reorder(usize, usize),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                Just(Op::Create),
                (0usize..12).prop_map(Op::Delete),
                (0usize..12, 0usize..12).prop_map(|(a, b)| Op::Reorder(a, b)),
            ]
        }

        proptest! {
            /// Ids equal positions after any create/delete/reorder sequence.
            #[test]
            fn ids_track_positions(ops in prop::collection::vec(op_strategy(), 0..40)) {
                let mut store = store(3);
                for op in ops {
                    let len = store.game("mc").unwrap().steps.len();
                    match op {
                        Op::Create => {
                            store.create_step("mc").unwrap();
                        }
                        Op::Delete(i) if len > 0 => {
                            store.delete_step("mc", (i % len) as u32 + 1).unwrap();
                        }
                        Op::Reorder(a, b) if len > 0 => {
                            store.reorder_step("mc", a % len, b % len).unwrap();
                        }
                        _ => {}
                    }
                    let game = store.game("mc").unwrap();
                    for (k, step) in game.steps.iter().enumerate() {
                        prop_assert_eq!(step.id, k as u32 + 1);
                    }
                }
            }

            /// Moving i -> j and back j -> i restores order and ids.
            #[test]
            fn reorder_round_trip(i in 0usize..5, j in 0usize..5) {
                let mut store = store(5);
                let before = store.game("mc").unwrap().clone();
                store.reorder_step("mc", i, j).unwrap();
                store.reorder_step("mc", j, i).unwrap();
                prop_assert_eq!(store.game("mc").unwrap(), &before);
            }
        }
    }
}
