//! Digest assembly from remote ledger state
//!
//! Every lookup of one assembly takes the same `ChainSnapshot`, so the digest
//! reflects a single point in time. Independent lookups are issued
//! concurrently; rune states wait on the rune slot record because they need
//! its id list.

use crate::core::error::Result;
use crate::core::types::{Address, BattleType, ChainSnapshot, RuneId};
use crate::digest::{build_digest, CombatantDigest};
use crate::gateway::{Account, StateGateway};
use crate::state::{
    item_slot_address, rune_slot_address, rune_state_address, AvatarState, CollectionState,
    GameConfig, ItemSlotRecord, RuneSlotRecord, RuneState, GAME_CONFIG_ADDRESS,
};

/// Digest plus collection state of one combatant, read at one snapshot
#[derive(Debug, Clone)]
pub struct CombatantSnapshot {
    pub digest: CombatantDigest,
    pub collection: CollectionState,
    pub at: ChainSnapshot,
}

/// Fetch the avatar base state; absence is fatal
pub async fn fetch_avatar<G: StateGateway>(
    gateway: &G,
    avatar: Address,
    at: ChainSnapshot,
) -> Result<AvatarState> {
    let state = gateway.fetch_one(Account::Avatar, avatar, at).await?;
    AvatarState::from_state(avatar, state)
}

pub async fn fetch_item_slots<G: StateGateway>(
    gateway: &G,
    avatar: Address,
    battle_type: BattleType,
    at: ChainSnapshot,
) -> Result<ItemSlotRecord> {
    let address = item_slot_address(&avatar, battle_type);
    let state = gateway.fetch_one(Account::Legacy, address, at).await?;
    ItemSlotRecord::from_state(battle_type, state)
}

pub async fn fetch_rune_slots<G: StateGateway>(
    gateway: &G,
    avatar: Address,
    battle_type: BattleType,
    at: ChainSnapshot,
) -> Result<RuneSlotRecord> {
    let address = rune_slot_address(&avatar, battle_type);
    let state = gateway.fetch_one(Account::Legacy, address, at).await?;
    RuneSlotRecord::from_state(battle_type, state)
}

/// Rune states for the runes slotted in `battle_type`, in slot order.
///
/// Only slotted runes are requested. A slotted rune whose state is absent is
/// dropped as if the slot were empty.
pub async fn fetch_equipped_rune_states<G: StateGateway>(
    gateway: &G,
    avatar: Address,
    battle_type: BattleType,
    at: ChainSnapshot,
) -> Result<Vec<RuneState>> {
    let slots = fetch_rune_slots(gateway, avatar, battle_type, at).await?;
    let equipped: Vec<(RuneId, Address)> = slots
        .equipped_rune_ids()
        .into_iter()
        .map(|id| (id, rune_state_address(&avatar, id)))
        .collect();
    if equipped.is_empty() {
        return Ok(Vec::new());
    }

    let addresses: Vec<Address> = equipped.iter().map(|(_, address)| *address).collect();
    let mut states = gateway.fetch_bulk(Account::Legacy, &addresses, at).await?;

    let mut runes = Vec::with_capacity(equipped.len());
    for (rune_id, address) in equipped {
        match states.remove(&address).flatten() {
            Some(state) => runes.push(state.decode::<RuneState>("rune state")?),
            None => tracing::debug!(%avatar, rune_id, "slotted rune has no state, skipping"),
        }
    }
    Ok(runes)
}

/// Collection state of an avatar; absent means no bonuses
pub async fn fetch_collection_state<G: StateGateway>(
    gateway: &G,
    avatar: Address,
    at: ChainSnapshot,
) -> Result<CollectionState> {
    let state = gateway.fetch_one(Account::Collection, avatar, at).await?;
    CollectionState::from_state(state)
}

/// Global game config; `None` when the ledger has none
pub async fn fetch_game_config<G: StateGateway>(
    gateway: &G,
    at: ChainSnapshot,
) -> Result<Option<GameConfig>> {
    let state = gateway.fetch_one(Account::Legacy, GAME_CONFIG_ADDRESS, at).await?;
    GameConfig::from_state(state)
}

/// Build the digest of an avatar from remote state at snapshot `at`
pub async fn build_remote_digest<G: StateGateway>(
    gateway: &G,
    avatar: Address,
    battle_type: BattleType,
    at: ChainSnapshot,
) -> Result<CombatantDigest> {
    let (avatar_state, item_slots, runes) = tokio::try_join!(
        fetch_avatar(gateway, avatar, at),
        fetch_item_slots(gateway, avatar, battle_type, at),
        fetch_equipped_rune_states(gateway, avatar, battle_type, at),
    )?;
    Ok(build_digest(&avatar_state, &item_slots, &runes))
}

/// Pin the current tip, then fetch digest and collection state against it
pub async fn fetch_combatant<G: StateGateway>(
    gateway: &G,
    avatar: Address,
    battle_type: BattleType,
) -> Result<CombatantSnapshot> {
    let at = gateway.tip().await?;
    let (digest, collection) = tokio::try_join!(
        build_remote_digest(gateway, avatar, battle_type, at),
        fetch_collection_state(gateway, avatar, at),
    )?;
    tracing::debug!(
        %avatar,
        %at,
        equipments = digest.equipments.len(),
        runes = digest.runes.len(),
        collections = collection.ids.len(),
        "combatant state ready"
    );
    Ok(CombatantSnapshot {
        digest,
        collection,
        at,
    })
}
