//! Simulation entry points
//!
//! `SimulationContext` carries everything a batch needs (local combatant,
//! gateway, rule tables, resolver, config, log sink) and is passed around
//! explicitly. Input assembly is async; the trials themselves run on a
//! blocking worker so they never stall the runtime.
//!
//! Snapshot pinning holds per combatant only. In an arena batch each side is
//! read at the tip observed when its own assembly started, so the two
//! digests may come from different blocks.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use ahash::AHashMap;

use crate::combat::{resolve_effects, CombatResolver, Opponent, TrialInput};
use crate::core::config::ForecastConfig;
use crate::core::error::{ForecastError, Result};
use crate::core::types::{Address, BattleType, ChainSnapshot, StageId};
use crate::digest::{build_digest, equipped_rune_states, fetch_combatant, fetch_game_config, CombatantDigest};
use crate::gateway::StateGateway;
use crate::sheets::TableSheets;
use crate::simulation::aggregate::OutcomeKind;
use crate::simulation::control::{BatchControl, ProgressCallback};
use crate::simulation::handle::BatchHandle;
use crate::simulation::orchestrator::{run_batch, BatchReport, SeedPolicy, TrialCount};
use crate::state::{
    AvatarState, CollectionState, Equipment, GameConfig, ItemSlotRecord, RuneSlotRecord, RuneState,
    StatModifier,
};

/// Receives one human-readable line per major step
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// The player's own avatar, already held in memory
#[derive(Debug, Clone)]
pub struct LocalCombatant {
    pub avatar: AvatarState,
    pub item_slots: AHashMap<BattleType, ItemSlotRecord>,
    pub rune_slots: AHashMap<BattleType, RuneSlotRecord>,
    /// Every rune state the avatar owns, slotted or not
    pub rune_states: Vec<RuneState>,
    pub collection: CollectionState,
    pub game_config: Option<GameConfig>,
}

impl LocalCombatant {
    pub fn new(avatar: AvatarState) -> Self {
        Self {
            avatar,
            item_slots: AHashMap::new(),
            rune_slots: AHashMap::new(),
            rune_states: Vec::new(),
            collection: CollectionState::default(),
            game_config: None,
        }
    }

    pub fn with_item_slots(mut self, record: ItemSlotRecord) -> Self {
        self.item_slots.insert(record.battle_type, record);
        self
    }

    pub fn with_rune_slots(mut self, record: RuneSlotRecord) -> Self {
        self.rune_slots.insert(record.battle_type, record);
        self
    }

    pub fn with_rune_states(mut self, rune_states: Vec<RuneState>) -> Self {
        self.rune_states = rune_states;
        self
    }

    pub fn with_collection(mut self, collection: CollectionState) -> Self {
        self.collection = collection;
        self
    }

    pub fn with_game_config(mut self, game_config: GameConfig) -> Self {
        self.game_config = Some(game_config);
        self
    }

    /// Digest for `battle_type`; a context with no recorded slots has
    /// nothing equipped
    pub fn digest(&self, battle_type: BattleType) -> CombatantDigest {
        let item_slots = self
            .item_slots
            .get(&battle_type)
            .cloned()
            .unwrap_or_else(|| ItemSlotRecord::empty(battle_type));
        let runes = self
            .rune_slots
            .get(&battle_type)
            .map(|slots| equipped_rune_states(slots, &self.rune_states))
            .unwrap_or_default();
        build_digest(&self.avatar, &item_slots, &runes)
    }
}

/// What the combatant fights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stage(StageId),
    Opponent(Address),
}

impl Target {
    pub fn battle_type(&self) -> BattleType {
        match self {
            Target::Stage(_) => BattleType::Adventure,
            Target::Opponent(_) => BattleType::Arena,
        }
    }
}

/// Batch for the in-memory local combatant
#[derive(Debug, Clone)]
pub struct LocalRequest {
    pub trial_count: i64,
    pub target: Target,
    /// Hypothetical loadout replacing the slotted equipment
    pub equipment_override: Option<Vec<Equipment>>,
    pub seeds: SeedPolicy,
}

impl LocalRequest {
    pub fn new(trial_count: i64, target: Target) -> Self {
        Self {
            trial_count,
            target,
            equipment_override: None,
            seeds: SeedPolicy::Entropy,
        }
    }
}

/// Batch for an avatar read entirely from the ledger
#[derive(Debug, Clone)]
pub struct RemoteRequest {
    pub trial_count: i64,
    pub avatar: Address,
    pub target: Target,
    pub seeds: SeedPolicy,
}

impl RemoteRequest {
    pub fn new(trial_count: i64, avatar: Address, target: Target) -> Self {
        Self {
            trial_count,
            avatar,
            target,
            seeds: SeedPolicy::Entropy,
        }
    }
}

pub struct SimulationContext<G, R> {
    local: Option<LocalCombatant>,
    gateway: Arc<G>,
    sheets: Arc<TableSheets>,
    resolver: Arc<R>,
    config: ForecastConfig,
    log_sink: Option<LogSink>,
}

impl<G, R> fmt::Debug for SimulationContext<G, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationContext")
            .field("local", &self.local.as_ref().map(|l| l.avatar.address))
            .field("config", &self.config)
            .field("log_sink", &self.log_sink.is_some())
            .finish_non_exhaustive()
    }
}

impl<G, R> SimulationContext<G, R>
where
    G: StateGateway + 'static,
    R: CombatResolver + 'static,
{
    pub fn new(gateway: G, sheets: TableSheets, resolver: R, config: ForecastConfig) -> Self {
        Self {
            local: None,
            gateway: Arc::new(gateway),
            sheets: Arc::new(sheets),
            resolver: Arc::new(resolver),
            config,
            log_sink: None,
        }
    }

    pub fn with_local(mut self, local: LocalCombatant) -> Self {
        self.local = Some(local);
        self
    }

    pub fn with_log_sink(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.log_sink = Some(Arc::new(sink));
        self
    }

    pub fn local(&self) -> Option<&LocalCombatant> {
        self.local.as_ref()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn sheets(&self) -> &TableSheets {
        &self.sheets
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    fn log(&self, message: &str) {
        tracing::info!("{}", message);
        if let Some(sink) = &self.log_sink {
            sink(message);
        }
    }

    fn effects_for(&self, collection: &CollectionState) -> Vec<StatModifier> {
        resolve_effects(collection, &self.sheets.collections)
    }

    /// Ledger game config at `at`, falling back to the configured constants
    async fn game_config_at(&self, at: ChainSnapshot) -> Result<GameConfig> {
        if let Some(game_config) = fetch_game_config(&*self.gateway, at).await? {
            return Ok(game_config);
        }
        tracing::warn!(%at, "game config state is absent from the ledger");
        self.log(&format!("Game config missing at block {}", at));
        self.config
            .fallback_game_config
            .ok_or(ForecastError::MissingGameConfig)
    }

    async fn remote_opponent(&self, address: Address) -> Result<Opponent> {
        let snapshot = fetch_combatant(&*self.gateway, address, BattleType::Arena).await?;
        self.log(&format!("Opponent {} digest ready at {}", address, snapshot.at));
        Ok(Opponent::Avatar {
            effects: self.effects_for(&snapshot.collection),
            digest: snapshot.digest,
        })
    }

    async fn execute(
        &self,
        trial_count: TrialCount,
        input: TrialInput,
        seeds: SeedPolicy,
        control: &BatchControl,
    ) -> Result<BatchReport> {
        self.log(&format!("Simulation start: {} trials", trial_count.get()));
        let resolver = Arc::clone(&self.resolver);
        let threshold = self.config.parallel_threshold;
        let worker_control = control.clone();
        let report = tokio::task::spawn_blocking(move || {
            run_batch(trial_count, &input, &*resolver, seeds, threshold, &worker_control)
        })
        .await
        .map_err(|e| ForecastError::WorkerFailed(e.to_string()))??;
        self.log(&format!(
            "Simulation done: {}/{} trials{}",
            report.completed(),
            report.requested,
            if report.cancelled { " (cancelled)" } else { "" }
        ));
        Ok(report)
    }

    /// Run a batch for the local combatant. Stage targets come from the rule
    /// tables; an opponent avatar is fetched from the ledger.
    pub async fn simulate_local_batch(
        &self,
        request: LocalRequest,
        control: &BatchControl,
    ) -> Result<BatchReport> {
        let result = match TrialCount::new(request.trial_count) {
            Ok(trial_count) => {
                let (target, seeds) = (request.target, request.seeds);
                self.assemble_and_execute(trial_count, target, seeds, self.local_input(request), control)
                    .await
            }
            Err(e) => Err(e),
        };
        control.finish(&result);
        result
    }

    async fn local_input(&self, request: LocalRequest) -> Result<TrialInput> {
        let local = self.local.as_ref().ok_or(ForecastError::MissingLocalAvatar)?;

        let mut me = local.digest(request.target.battle_type());
        if let Some(equipments) = request.equipment_override {
            me = me.with_equipments(equipments);
        }
        self.log(&format!("Avatar {} digest ready", me.address));

        let my_effects = self.effects_for(&local.collection);
        self.log(&format!("Collection ready: {} effects", my_effects.len()));

        let opponent = match request.target {
            Target::Stage(id) => Opponent::Stage(self.sheets.stage(id)?.clone()),
            Target::Opponent(address) => self.remote_opponent(address).await?,
        };

        let game_config = match local.game_config {
            Some(game_config) => game_config,
            None => {
                let at = self.gateway.tip().await?;
                self.game_config_at(at).await?
            }
        };

        Ok(TrialInput {
            me,
            my_effects,
            opponent,
            sheets: Arc::clone(&self.sheets),
            game_config,
        })
    }

    /// Run a batch for an avatar read from the ledger. Against another
    /// avatar, both digests are assembled concurrently.
    pub async fn simulate_remote_batch(
        &self,
        request: RemoteRequest,
        control: &BatchControl,
    ) -> Result<BatchReport> {
        let result = match TrialCount::new(request.trial_count) {
            Ok(trial_count) => {
                let (target, seeds) = (request.target, request.seeds);
                self.assemble_and_execute(trial_count, target, seeds, self.remote_input(request), control)
                    .await
            }
            Err(e) => Err(e),
        };
        control.finish(&result);
        result
    }

    async fn remote_input(&self, request: RemoteRequest) -> Result<TrialInput> {
        let battle_type = request.target.battle_type();

        let (me, opponent) = match request.target {
            Target::Stage(id) => {
                let stage = self.sheets.stage(id)?.clone();
                let me = fetch_combatant(&*self.gateway, request.avatar, battle_type).await?;
                (me, Opponent::Stage(stage))
            }
            Target::Opponent(address) => {
                let (me, opponent) = tokio::try_join!(
                    fetch_combatant(&*self.gateway, request.avatar, battle_type),
                    self.remote_opponent(address),
                )?;
                (me, opponent)
            }
        };
        self.log(&format!("Avatar {} digest ready at {}", request.avatar, me.at));

        let my_effects = self.effects_for(&me.collection);
        self.log(&format!("Collection ready: {} effects", my_effects.len()));

        let game_config = self.game_config_at(me.at).await?;

        Ok(TrialInput {
            me: me.digest,
            my_effects,
            opponent,
            sheets: Arc::clone(&self.sheets),
            game_config,
        })
    }

    /// The batch is in progress from the moment its trial count is accepted.
    /// A cancel that lands while the input is still being fetched ends the
    /// batch over zero trials without starting the worker.
    async fn assemble_and_execute(
        &self,
        trial_count: TrialCount,
        target: Target,
        seeds: SeedPolicy,
        assembly: impl Future<Output = Result<TrialInput>>,
        control: &BatchControl,
    ) -> Result<BatchReport> {
        control.mark_started(trial_count.get());

        let input = tokio::select! {
            biased;
            _ = control.cancelled() => None,
            input = assembly => Some(input?),
        };
        match input {
            Some(input) if !control.is_cancelled() => {
                self.execute(trial_count, input, seeds, control).await
            }
            _ => {
                self.log("Simulation cancelled before any trial ran");
                Ok(BatchReport::cancelled_before_start(
                    trial_count.get(),
                    self.outcome_kind(target),
                    seeds.base_seed(),
                ))
            }
        }
    }

    fn outcome_kind(&self, target: Target) -> OutcomeKind {
        match target {
            Target::Opponent(_) => OutcomeKind::Arena,
            Target::Stage(id) => OutcomeKind::Stage {
                max_tier: self
                    .sheets
                    .stage(id)
                    .map(|stage| u8::try_from(stage.waves.len()).unwrap_or(u8::MAX))
                    .unwrap_or(1),
            },
        }
    }

    /// Start a local batch on the runtime and return its handle
    pub fn spawn_local(self: &Arc<Self>, request: LocalRequest, on_progress: Option<ProgressCallback>) -> BatchHandle {
        let control = Self::fresh_control(on_progress);
        let context = Arc::clone(self);
        let task_control = control.clone();
        let task = tokio::spawn(async move { context.simulate_local_batch(request, &task_control).await });
        BatchHandle::new(control, task)
    }

    /// Start a remote batch on the runtime and return its handle
    pub fn spawn_remote(self: &Arc<Self>, request: RemoteRequest, on_progress: Option<ProgressCallback>) -> BatchHandle {
        let control = Self::fresh_control(on_progress);
        let context = Arc::clone(self);
        let task_control = control.clone();
        let task = tokio::spawn(async move { context.simulate_remote_batch(request, &task_control).await });
        BatchHandle::new(control, task)
    }

    fn fresh_control(on_progress: Option<ProgressCallback>) -> BatchControl {
        match on_progress {
            Some(callback) => BatchControl::new().with_progress_callback(callback),
            None => BatchControl::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ItemId;
    use crate::state::{Item, RuneSlot};

    fn avatar() -> AvatarState {
        AvatarState {
            address: Address::new([1; 20]),
            name: "local".into(),
            level: 10,
            character_id: 100010,
            inventory: vec![],
        }
    }

    #[test]
    fn test_target_battle_type() {
        assert_eq!(Target::Stage(1).battle_type(), BattleType::Adventure);
        assert_eq!(
            Target::Opponent(Address::new([2; 20])).battle_type(),
            BattleType::Arena
        );
    }

    #[test]
    fn test_local_digest_without_slots_is_bare() {
        let digest = LocalCombatant::new(avatar()).digest(BattleType::Arena);
        assert!(digest.equipments.is_empty());
        assert!(digest.costumes.is_empty());
        assert!(digest.runes.is_empty());
    }

    #[test]
    fn test_local_digest_uses_slots_of_battle_type() {
        let mut avatar = avatar();
        let costume_id = ItemId::new();
        avatar.inventory.push(Item::Costume(crate::state::Costume {
            id: costume_id,
            sheet_id: 40100000,
            stats: vec![],
        }));
        let mut arena_slots = ItemSlotRecord::empty(BattleType::Arena);
        arena_slots.costumes.push(costume_id);
        let rune_slots = RuneSlotRecord {
            battle_type: BattleType::Adventure,
            slots: vec![RuneSlot {
                index: 0,
                rune_id: Some(7),
                locked: false,
            }],
        };
        let local = LocalCombatant::new(avatar)
            .with_item_slots(arena_slots)
            .with_rune_slots(rune_slots)
            .with_rune_states(vec![RuneState::new(7, 3), RuneState::new(8, 1)]);

        let arena = local.digest(BattleType::Arena);
        assert_eq!(arena.costumes.len(), 1);
        assert!(arena.runes.is_empty());

        let adventure = local.digest(BattleType::Adventure);
        assert!(adventure.costumes.is_empty());
        assert_eq!(adventure.runes, vec![RuneState::new(7, 3)]);
    }
}
