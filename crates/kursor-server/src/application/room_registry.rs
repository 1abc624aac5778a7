//! RoomRegistry: the authoritative in-memory store of pairing rooms.
//!
//! Every transport resolves rooms through this registry:
//!
//! - The **HTTP API** creates rooms and lets students join by room id and
//!   password.
//! - The **UDP relay** resolves rooms by session token and records the
//!   network endpoint each role sends from.
//! - The **coordination hub** binds WebSocket connections to room roles.
//!
//! # Indexes (for beginners)
//!
//! A room can be found three ways, so the registry keeps three maps:
//!
//! ```text
//! by_id      : RoomId        ─┐
//! by_token   : SessionToken  ─┼──►  Arc<Room>
//! bindings   : ConnectionId  ─┘     (plus the bound Role)
//! ```
//!
//! The maps are `DashMap`s: hash maps split into independently locked shards,
//! so lookups for different rooms rarely contend.  Mutable per-room fields live
//! behind the room's own `parking_lot::Mutex`, so a busy room never blocks a
//! quiet one.
//!
//! # Eviction without torn reads
//!
//! Removing a room touches up to five map entries, which cannot happen in one
//! atomic step.  Instead eviction first sets the room's `evicted` flag while
//! holding its lock, and only then removes the index entries.  Every lookup
//! filters out evicted rooms, so from the outside a room disappears from all
//! indexes at the same instant.
//!
//! # Eviction rules
//!
//! The periodic sweep ([`RoomRegistry::evict_expired`]) removes a room when
//! either holds:
//!
//! 1. it is older than the grace TTL and its teacher and student are not both
//!    bound (a role is bound when it has a UDP endpoint or a hub connection);
//! 2. it has seen no activity for longer than the idle TTL.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use kursor_core::{CredentialError, PasswordCredential, Role, RoomId, SessionToken};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::metrics::Metrics;
use crate::domain::ConnectionId;

/// Aspect hint used when the teacher does not supply one.
pub const DEFAULT_ASPECT: (u32, u32) = (16, 9);

/// How many fresh ids `create_room` tries before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No live room matches the id or token.
    #[error("room not found")]
    NotFound,

    /// The password does not match the room's credential.
    #[error("invalid room password")]
    InvalidPassword,

    /// Password hashing failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Every generated id collided with an existing room.
    #[error("could not allocate a unique room id")]
    IdExhausted,
}

/// Timer settings for eviction.
#[derive(Debug, Clone, Copy)]
pub struct RegistrySettings {
    pub grace_ttl: Duration,
    pub idle_ttl: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            grace_ttl: Duration::from_secs(300),
            idle_ttl: Duration::from_secs(600),
        }
    }
}

// ── Room ──────────────────────────────────────────────────────────────────────

/// Mutable per-room fields, guarded by the room's lock.
#[derive(Debug)]
struct RoomState {
    teacher_endpoint: Option<SocketAddr>,
    student_endpoint: Option<SocketAddr>,
    teacher_connection: Option<ConnectionId>,
    student_connection: Option<ConnectionId>,
    last_activity: Instant,
}

impl RoomState {
    fn touch(&mut self, now: Instant) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    fn role_bound(&self, role: Role) -> bool {
        match role {
            Role::Teacher => self.teacher_endpoint.is_some() || self.teacher_connection.is_some(),
            Role::Student => self.student_endpoint.is_some() || self.student_connection.is_some(),
        }
    }

    fn connection(&self, role: Role) -> Option<ConnectionId> {
        match role {
            Role::Teacher => self.teacher_connection,
            Role::Student => self.student_connection,
        }
    }

    fn connection_slot(&mut self, role: Role) -> &mut Option<ConnectionId> {
        match role {
            Role::Teacher => &mut self.teacher_connection,
            Role::Student => &mut self.student_connection,
        }
    }
}

/// A pairing session between one teacher and one student.
///
/// The id, both tokens, and the credential are fixed at creation.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    teacher_token: SessionToken,
    student_token: SessionToken,
    credential: PasswordCredential,
    aspect: (u32, u32),
    created_at: Instant,
    evicted: AtomicBool,
    state: Mutex<RoomState>,
}

impl Room {
    fn new(id: RoomId, credential: PasswordCredential, aspect: (u32, u32), now: Instant) -> Self {
        let teacher_token = SessionToken::generate();
        let mut student_token = SessionToken::generate();
        while student_token == teacher_token {
            student_token = SessionToken::generate();
        }
        Self {
            id,
            teacher_token,
            student_token,
            credential,
            aspect,
            created_at: now,
            evicted: AtomicBool::new(false),
            state: Mutex::new(RoomState {
                teacher_endpoint: None,
                student_endpoint: None,
                teacher_connection: None,
                student_connection: None,
                last_activity: now,
            }),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn teacher_token(&self) -> SessionToken {
        self.teacher_token
    }

    pub fn student_token(&self) -> SessionToken {
        self.student_token
    }

    /// Display aspect hint `(width, height)` for the student renderer.
    pub fn aspect(&self) -> (u32, u32) {
        self.aspect
    }

    pub fn token_for(&self, role: Role) -> SessionToken {
        match role {
            Role::Teacher => self.teacher_token,
            Role::Student => self.student_token,
        }
    }

    /// The role `token` belongs to in this room, if any.
    pub fn role_of(&self, token: &SessionToken) -> Option<Role> {
        if *token == self.teacher_token {
            Some(Role::Teacher)
        } else if *token == self.student_token {
            Some(Role::Student)
        } else {
            None
        }
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::Acquire)
    }

    pub fn endpoint(&self, role: Role) -> Option<SocketAddr> {
        let state = self.state.lock();
        match role {
            Role::Teacher => state.teacher_endpoint,
            Role::Student => state.student_endpoint,
        }
    }

    pub fn connection(&self, role: Role) -> Option<ConnectionId> {
        self.state.lock().connection(role)
    }

    /// The role `conn` is currently bound as, if any.
    pub fn role_of_connection(&self, conn: ConnectionId) -> Option<Role> {
        let state = self.state.lock();
        if state.teacher_connection == Some(conn) {
            Some(Role::Teacher)
        } else if state.student_connection == Some(conn) {
            Some(Role::Student)
        } else {
            None
        }
    }

    pub fn last_activity(&self) -> Instant {
        self.state.lock().last_activity
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Records the endpoint `role` was last seen at and refreshes activity.
    ///
    /// Returns the student's endpoint after the update, which is where the
    /// relay forwards cursor packets.
    fn record_endpoint(&self, role: Role, addr: SocketAddr, now: Instant) -> Option<SocketAddr> {
        let mut state = self.state.lock();
        match role {
            Role::Teacher => state.teacher_endpoint = Some(addr),
            Role::Student => state.student_endpoint = Some(addr),
        }
        state.touch(now);
        state.student_endpoint
    }

    fn touch_at(&self, now: Instant) {
        self.state.lock().touch(now);
    }

    /// Marks the room evicted.  Returns `false` if it already was.
    fn mark_evicted(&self) -> bool {
        let _guard = self.state.lock();
        !self.evicted.swap(true, Ordering::AcqRel)
    }

    fn expired(&self, now: Instant, settings: &RegistrySettings) -> Option<&'static str> {
        let state = self.state.lock();
        let fully_bound = state.role_bound(Role::Teacher) && state.role_bound(Role::Student);
        if now.saturating_duration_since(self.created_at) > settings.grace_ttl && !fully_bound {
            return Some("not paired within grace period");
        }
        if now.saturating_duration_since(state.last_activity) > settings.idle_ttl {
            return Some("idle");
        }
        None
    }
}

// ── Binding results ───────────────────────────────────────────────────────────

/// A hub connection's binding to a room role.
#[derive(Debug, Clone)]
pub struct ConnectionBinding {
    pub room: Arc<Room>,
    pub role: Role,
}

/// Outcome of a successful [`RoomRegistry::bind_connection`].
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub room: Arc<Room>,
    /// The other role's connection at the time of the join.
    pub peer: Option<ConnectionId>,
    /// A different connection that held this role before and was displaced.
    pub displaced: Option<ConnectionId>,
}

/// Outcome of [`RoomRegistry::unbind_connection`].
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub room: Arc<Room>,
    pub role: Role,
    pub peer: Option<ConnectionId>,
}

/// Debug view of one room, served by `GET /rooms`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub age_secs: u64,
    pub idle_secs: u64,
    pub teacher_token: SessionToken,
    pub student_token: SessionToken,
    pub teacher_endpoint: Option<SocketAddr>,
    pub student_endpoint: Option<SocketAddr>,
    pub teacher_connection: Option<ConnectionId>,
    pub student_connection: Option<ConnectionId>,
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Concurrent store of all live rooms.
pub struct RoomRegistry {
    settings: RegistrySettings,
    by_id: DashMap<RoomId, Arc<Room>>,
    by_token: DashMap<SessionToken, Arc<Room>>,
    bindings: DashMap<ConnectionId, ConnectionBinding>,
}

impl RoomRegistry {
    pub fn new(settings: RegistrySettings) -> Self {
        Self {
            settings,
            by_id: DashMap::new(),
            by_token: DashMap::new(),
            bindings: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Creates a room protected by `password`.
    ///
    /// Hashes the password, so call this from a blocking thread in async code.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Credential`] if hashing fails, or
    /// [`RegistryError::IdExhausted`] if no unique id could be drawn.
    pub fn create_room(
        &self,
        password: &str,
        aspect: Option<(u32, u32)>,
    ) -> Result<Arc<Room>, RegistryError> {
        let credential = PasswordCredential::derive(password)?;
        let aspect = aspect.unwrap_or(DEFAULT_ASPECT);

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = RoomId::generate();
            match self.by_id.entry(id.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    debug!("room id collision on {id}, retrying");
                    continue;
                }
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    let room = Arc::new(Room::new(id, credential, aspect, Instant::now()));
                    self.by_token.insert(room.teacher_token, Arc::clone(&room));
                    self.by_token.insert(room.student_token, Arc::clone(&room));
                    slot.insert(Arc::clone(&room));
                    info!(room = %room.id, "room created");
                    return Ok(room);
                }
            }
        }
        Err(RegistryError::IdExhausted)
    }

    pub fn resolve_by_id(&self, id: &RoomId) -> Option<Arc<Room>> {
        live(self.by_id.get(id).map(|r| Arc::clone(r.value())))
    }

    pub fn resolve_by_token(&self, token: &SessionToken) -> Option<Arc<Room>> {
        live(self.by_token.get(token).map(|r| Arc::clone(r.value())))
    }

    pub fn resolve_by_connection(&self, conn: ConnectionId) -> Option<ConnectionBinding> {
        let binding = self.bindings.get(&conn).map(|b| b.value().clone())?;
        if binding.room.is_evicted() {
            None
        } else {
            Some(binding)
        }
    }

    /// Verifies `password` against room `id` and returns its student token.
    ///
    /// Hashes the password, so call this from a blocking thread in async code.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] or [`RegistryError::InvalidPassword`].
    pub fn join_as_student(&self, id: &RoomId, password: &str) -> Result<SessionToken, RegistryError> {
        let room = self.resolve_by_id(id).ok_or(RegistryError::NotFound)?;
        if !room.credential.verify(password) {
            return Err(RegistryError::InvalidPassword);
        }
        room.touch_at(Instant::now());
        info!(room = %room.id, "student joined over HTTP");
        Ok(room.student_token)
    }

    /// Refreshes the activity of the room `token` belongs to.
    pub fn touch(&self, token: &SessionToken) -> bool {
        self.touch_at(token, Instant::now())
    }

    /// [`touch`](Self::touch) with an explicit clock reading.
    pub fn touch_at(&self, token: &SessionToken, now: Instant) -> bool {
        match self.resolve_by_token(token) {
            Some(room) => {
                room.touch_at(now);
                true
            }
            None => false,
        }
    }

    /// Refreshes room `id`, but only if `token` belongs to it.
    pub fn touch_in_room(&self, id: &RoomId, token: &SessionToken) -> bool {
        match self.resolve_by_id(id) {
            Some(room) if room.role_of(token).is_some() => {
                room.touch_at(Instant::now());
                true
            }
            _ => false,
        }
    }

    /// Refreshes the room bound to hub connection `conn`.
    pub fn touch_connection(&self, conn: ConnectionId) -> bool {
        match self.resolve_by_connection(conn) {
            Some(binding) => {
                binding.room.touch_at(Instant::now());
                true
            }
            None => false,
        }
    }

    /// Records that `token` was seen sending from `addr`.
    ///
    /// The role is derived from the token.  Returns the role and the
    /// student's endpoint after the update, or `None` for an unknown token.
    pub fn update_endpoint(
        &self,
        token: &SessionToken,
        addr: SocketAddr,
    ) -> Option<(Role, Option<SocketAddr>)> {
        let room = self.resolve_by_token(token)?;
        let role = room.role_of(token)?;
        let student = room.record_endpoint(role, addr, Instant::now());
        Some((role, student))
    }

    /// Binds hub connection `conn` to `role` in the room `token` names.
    ///
    /// The token must be that room's token for `role`.  A connection holds at
    /// most one binding, so any earlier binding of `conn` is released first.
    /// If another connection held the role it is displaced (last joiner wins)
    /// and its binding removed.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] for an unknown token or a token of the
    /// other role.
    pub fn bind_connection(
        &self,
        conn: ConnectionId,
        token: &SessionToken,
        role: Role,
    ) -> Result<JoinOutcome, RegistryError> {
        let room = self.resolve_by_token(token).ok_or(RegistryError::NotFound)?;
        if room.token_for(role) != *token {
            return Err(RegistryError::NotFound);
        }

        self.unbind_connection(conn);

        // The binding is written under the room lock so an eviction cannot
        // slip in between the role pointer and the index.
        let (peer, displaced) = {
            let mut state = room.state.lock();
            if room.is_evicted() {
                return Err(RegistryError::NotFound);
            }
            let previous = state.connection_slot(role).replace(conn);
            state.touch(Instant::now());
            let displaced = previous.filter(|p| *p != conn);
            if let Some(old) = displaced {
                self.bindings.remove(&old);
            }
            self.bindings.insert(
                conn,
                ConnectionBinding {
                    room: Arc::clone(&room),
                    role,
                },
            );
            (state.connection(role.peer()), displaced)
        };

        info!(room = %room.id, %conn, %role, "hub connection joined");
        Ok(JoinOutcome {
            room,
            peer,
            displaced,
        })
    }

    /// Removes the binding of `conn`, clearing the room's role pointer if it
    /// still points at `conn`.
    pub fn unbind_connection(&self, conn: ConnectionId) -> Option<LeaveOutcome> {
        let (_, binding) = self.bindings.remove(&conn)?;
        let peer = {
            let mut state = binding.room.state.lock();
            let slot = state.connection_slot(binding.role);
            if *slot == Some(conn) {
                *slot = None;
            }
            state.connection(binding.role.peer())
        };
        info!(room = %binding.room.id, %conn, role = %binding.role, "hub connection left");
        Some(LeaveOutcome {
            room: binding.room,
            role: binding.role,
            peer,
        })
    }

    /// Evicts the room `token` belongs to.  Returns `false` if there is none.
    pub fn remove_by_token(&self, token: &SessionToken) -> bool {
        match self.resolve_by_token(token) {
            Some(room) => self.evict(&room, "removed by teacher"),
            None => false,
        }
    }

    /// Runs one eviction sweep as of `now`.  Returns the evicted ids.
    pub fn evict_expired(&self, now: Instant) -> Vec<RoomId> {
        // Collect first: evicting mutates `by_id` and must not run while an
        // iterator holds one of its shard locks.
        let candidates: Vec<(Arc<Room>, &'static str)> = self
            .by_id
            .iter()
            .filter_map(|entry| {
                let room = entry.value();
                room.expired(now, &self.settings)
                    .map(|reason| (Arc::clone(room), reason))
            })
            .collect();

        candidates
            .into_iter()
            .filter(|(room, reason)| self.evict(room, reason))
            .map(|(room, _)| room.id.clone())
            .collect()
    }

    /// Debug listing of every live room.
    pub fn snapshot(&self) -> Vec<RoomSnapshot> {
        let now = Instant::now();
        self.by_id
            .iter()
            .filter(|entry| !entry.value().is_evicted())
            .map(|entry| {
                let room = entry.value();
                let state = room.state.lock();
                RoomSnapshot {
                    id: room.id.clone(),
                    age_secs: now.saturating_duration_since(room.created_at).as_secs(),
                    idle_secs: now.saturating_duration_since(state.last_activity).as_secs(),
                    teacher_token: room.teacher_token,
                    student_token: room.student_token,
                    teacher_endpoint: state.teacher_endpoint,
                    student_endpoint: state.student_endpoint,
                    teacher_connection: state.teacher_connection,
                    student_connection: state.student_connection,
                }
            })
            .collect()
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn evict(&self, room: &Arc<Room>, reason: &str) -> bool {
        if !room.mark_evicted() {
            return false;
        }
        // From here on `bind_connection` refuses the room, so the connection
        // pointers read below are final.
        self.by_id.remove(&room.id);
        self.by_token.remove(&room.teacher_token);
        self.by_token.remove(&room.student_token);
        let connections = {
            let state = room.state.lock();
            [state.teacher_connection, state.student_connection]
        };
        for conn in connections.into_iter().flatten() {
            self.bindings.remove(&conn);
        }
        info!(room = %room.id, reason, "room evicted");
        true
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RegistrySettings::default())
    }
}

fn live(room: Option<Arc<Room>>) -> Option<Arc<Room>> {
    room.filter(|r| !r.is_evicted())
}

/// Runs [`RoomRegistry::evict_expired`] every `interval` until `cancel` fires,
/// reporting the live room count after each sweep.
pub async fn run_sweeper(
    registry: Arc<RoomRegistry>,
    metrics: Arc<dyn Metrics>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(interval_secs = interval.as_secs(), "room sweeper started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = registry.evict_expired(Instant::now());
                if !evicted.is_empty() {
                    debug!(count = evicted.len(), "sweep evicted rooms");
                }
                metrics.set_rooms(registry.len());
            }
        }
    }
    info!("room sweeper stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
