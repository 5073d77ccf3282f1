// world.rs - ECS World: entity lifecycle, component access and iteration

use crate::ecs::query::QueryPlan;
use crate::ecs::storage::{SparseSet, StoreError};
use crate::ecs::{
    Command, CommandBuffer, Component, ComponentBundle, ComponentId, ComponentInfo,
    ComponentRegistry, EcsError, Entity, EntityIndex, EntityRegistry, Query, Result, WorldConfig,
};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Partitions per worker thread handed to rayon by parallel queries.
const PARTITIONS_PER_THREAD: usize = 4;

/// The ECS world: entity registry, component stores and the query engine.
///
/// Everything structural (create, destroy, insert, remove) needs `&mut
/// World`, so no query can be running while it happens. Structural changes
/// requested from inside a query go through a [`CommandBuffer`].
pub struct World {
    config: WorldConfig,
    entities: EntityRegistry,
    components: ComponentRegistry,
    pool: OnceCell<ThreadPool>,
}

impl World {
    /// Create a new empty world with the default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: WorldConfig) -> Self {
        tracing::info!(
            max_entities = config.max_entities,
            worker_threads = config.worker_threads,
            strict_handles = config.strict_handles,
            "creating world"
        );
        Self {
            entities: EntityRegistry::with_capacity(config.max_entities, config.initial_capacity),
            components: ComponentRegistry::with_initial_capacity(config.initial_capacity),
            config,
            pool: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register `T`. Must happen before any insert or query naming `T`.
    pub fn register_component<T: Component>(&mut self) -> Result<ComponentId> {
        self.components.register::<T>()
    }

    /// Register every type of a tuple, or none if any registration fails.
    pub fn register_components<B: ComponentBundle>(&mut self) -> Result<()> {
        B::register_all(&mut self.components)
    }

    pub fn component_info<T: Component>(&self) -> Result<&ComponentInfo> {
        let id = self.components.id_of::<T>()?;
        self.components
            .info(id)
            .ok_or(EcsError::UnregisteredComponent { name: T::name() })
    }

    // ------------------------------------------------------------------
    // Entity lifecycle
    // ------------------------------------------------------------------

    pub fn create(&mut self) -> Result<Entity> {
        self.entities.create()
    }

    /// Create an entity carrying every component of `bundle`.
    ///
    /// All types are checked before the entity exists; if attaching still
    /// fails the entity is destroyed again.
    pub fn spawn<B: ComponentBundle>(&mut self, bundle: B) -> Result<Entity> {
        B::check(&self.components)?;
        let entity = self.entities.create()?;
        if let Err(err) = bundle.insert_into(self, entity) {
            self.destroy(entity)?;
            return Err(err);
        }
        Ok(entity)
    }

    /// Destroy `entity`, dropping every component it owns.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        if !self.entities.is_valid(entity) {
            return Err(EcsError::StaleHandle { entity });
        }
        let removed = self.components.remove_all(entity.index());
        self.entities.destroy(entity)?;
        tracing::trace!(%entity, removed, "destroyed entity");
        Ok(())
    }

    #[inline]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.entities.is_valid(entity)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Destroy every entity. Registrations survive.
    pub fn clear(&mut self) {
        self.components.clear_stores();
        self.entities.clear();
    }

    // ------------------------------------------------------------------
    // Component access
    // ------------------------------------------------------------------

    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
        self.check_handle(entity)?;
        let capacity = self.entities.max_entities();
        self.components
            .store_mut::<T>()?
            .insert(entity.index(), value)
            .map_err(|err| store_error::<T>(err, entity, capacity))
    }

    pub fn add_default<T: Component + Default>(&mut self, entity: Entity) -> Result<()> {
        self.add_component(entity, T::default())
    }

    /// Detach `T` from `entity`, returning the value.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T> {
        self.check_handle(entity)?;
        let capacity = self.entities.max_entities();
        self.components
            .store_mut::<T>()?
            .remove(entity.index())
            .map_err(|err| store_error::<T>(err, entity, capacity))
    }

    /// `None` if `T` is unregistered, the handle is stale or the component
    /// is absent.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.check_handle(entity).ok()?;
        self.components.store::<T>().ok()?.get(entity.index())
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.check_handle(entity).ok()?;
        self.components.store_mut::<T>().ok()?.get_mut(entity.index())
    }

    /// Like [`World::get_component`] but reports why nothing was found.
    pub fn component<T: Component>(&self, entity: Entity) -> Result<&T> {
        self.check_handle(entity)?;
        self.components
            .store::<T>()?
            .get(entity.index())
            .ok_or(EcsError::MissingComponent {
                entity,
                component: T::name(),
            })
    }

    pub fn component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        self.check_handle(entity)?;
        self.components
            .store_mut::<T>()?
            .get_mut(entity.index())
            .ok_or(EcsError::MissingComponent {
                entity,
                component: T::name(),
            })
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.check_handle(entity).is_ok()
            && self
                .components
                .store::<T>()
                .is_ok_and(|store| store.contains(entity.index()))
    }

    /// Typed read access to a whole store.
    pub fn store<T: Component>(&self) -> Result<&SparseSet<T>> {
        self.components.store::<T>()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Number of entities a query over `Q` would visit right now.
    pub fn count<Q: Query>(&self) -> Result<usize> {
        QueryPlan::build::<Q>(&self.components).map(|plan| plan.len())
    }

    /// Call `f` once per entity holding every component of `Q`.
    ///
    /// Tag components in `Q` are removed from each entity right after `f`
    /// has seen it.
    ///
    /// ```ignore
    /// world.for_each::<(Position, Velocity), _>(|_entity, (pos, vel)| {
    ///     pos.x += vel.x;
    /// })?;
    /// ```
    pub fn for_each<Q, F>(&mut self, mut f: F) -> Result<()>
    where
        Q: Query,
        F: FnMut(Entity, Q::Item<'_>),
    {
        self.for_each_with_commands::<Q, _>(|entity, items, _| f(entity, items))
    }

    /// [`World::for_each`] with a command buffer that is played back after
    /// the last entity has been visited.
    pub fn for_each_with_commands<Q, F>(&mut self, f: F) -> Result<()>
    where
        Q: Query,
        F: FnMut(Entity, Q::Item<'_>, &mut CommandBuffer),
    {
        let (_plan, mut commands) = self.run_sequential::<Q, F>(f)?;
        self.play_commands(&mut commands)
    }

    /// Visit like [`World::for_each`], then attach a default `G` to every
    /// visited entity that is still alive and lacks one.
    pub fn for_each_tagging<Q, G, F>(&mut self, mut f: F) -> Result<()>
    where
        Q: Query,
        G: Component + Default,
        F: FnMut(Entity, Q::Item<'_>),
    {
        self.components.id_of::<G>()?;
        let (plan, mut commands) =
            self.run_sequential::<Q, _>(|entity, items, _| f(entity, items))?;
        let visited = self.visited_handles(&plan);
        self.play_commands(&mut commands)?;
        self.attach_to_visited::<G>(&visited)
    }

    /// Parallel [`World::for_each_with_commands`].
    ///
    /// The matching entities are split into partitions processed on the
    /// world's worker pool; every partition records into its own command
    /// buffer. After the parallel phase joins, tag components in `Q` are
    /// removed from every visited entity and the buffers are played back in
    /// partition order.
    ///
    /// `f` may freely mutate the components it is handed: each entity
    /// belongs to exactly one partition.
    pub fn par_for_each<Q, F>(&mut self, f: F) -> Result<()>
    where
        Q: Query,
        F: Fn(Entity, Q::Item<'_>, &mut CommandBuffer) + Send + Sync,
    {
        let (plan, mut commands) = self.run_parallel::<Q, F>(f)?;
        self.consume_tags(&plan);
        self.play_commands(&mut commands)
    }

    /// Parallel [`World::for_each_tagging`].
    pub fn par_for_each_tagging<Q, G, F>(&mut self, f: F) -> Result<()>
    where
        Q: Query,
        G: Component + Default,
        F: Fn(Entity, Q::Item<'_>, &mut CommandBuffer) + Send + Sync,
    {
        self.components.id_of::<G>()?;
        let (plan, mut commands) = self.run_parallel::<Q, F>(f)?;
        self.consume_tags(&plan);
        let visited = self.visited_handles(&plan);
        self.play_commands(&mut commands)?;
        self.attach_to_visited::<G>(&visited)
    }

    /// Replay and empty a command buffer.
    pub fn play_commands(&mut self, commands: &mut CommandBuffer) -> Result<()> {
        for command in commands.take() {
            match command {
                Command::Destroy(entity) => {
                    if !self.entities.is_valid(entity) {
                        tracing::debug!(%entity, "skipping destroy of stale entity");
                        continue;
                    }
                    self.destroy(entity)?;
                }
                Command::Deferred(f) => f(self)?,
            }
        }
        Ok(())
    }

    fn run_sequential<Q, F>(&mut self, mut f: F) -> Result<(QueryPlan, CommandBuffer)>
    where
        Q: Query,
        F: FnMut(Entity, Q::Item<'_>, &mut CommandBuffer),
    {
        let plan = QueryPlan::build::<Q>(&self.components)?;
        let mut commands = CommandBuffer::new();
        let mut fetch = Q::fetch(&mut self.components)?;

        for &index in plan.matches() {
            let entity = Entity::new(index, self.entities.generations()[index as usize]);
            // SAFETY: `index` came from the plan, so it is present in every
            // store of `Q`; stores only change below, after the items are
            // gone, and the fetch is refreshed when they do.
            let items = unsafe { Q::item(&fetch, index) };
            f(entity, items, &mut commands);

            if !plan.tags().is_empty() {
                self.remove_tags(&plan, index);
                fetch = Q::fetch(&mut self.components)?;
            }
        }

        Ok((plan, commands))
    }

    fn run_parallel<Q, F>(&mut self, f: F) -> Result<(QueryPlan, CommandBuffer)>
    where
        Q: Query,
        F: Fn(Entity, Q::Item<'_>, &mut CommandBuffer) + Send + Sync,
    {
        let plan = QueryPlan::build::<Q>(&self.components)?;
        let fetch = Q::fetch(&mut self.components)?;
        let pool = self.thread_pool()?;
        let chunk = partition_len(
            plan.len(),
            pool.current_num_threads(),
            self.config.par_min_chunk,
        );
        let generations = self.entities.generations();

        tracing::trace!(
            matched = plan.len(),
            driving = plan.driving(),
            chunk,
            threads = pool.current_num_threads(),
            "parallel query"
        );

        let commands: CommandBuffer = pool.install(|| {
            plan.matches()
                .par_chunks(chunk)
                .map(|partition| {
                    let mut commands = CommandBuffer::new();
                    for &index in partition {
                        let entity = Entity::new(index, generations[index as usize]);
                        // SAFETY: partitions are disjoint, so no two workers
                        // ever see the same index; nothing structural
                        // happens until the parallel phase has joined.
                        let items = unsafe { Q::item(&fetch, index) };
                        f(entity, items, &mut commands);
                    }
                    commands
                })
                .collect::<Vec<_>>()
                .into_iter()
                .collect()
        });

        Ok((plan, commands))
    }

    fn consume_tags(&mut self, plan: &QueryPlan) {
        if plan.tags().is_empty() {
            return;
        }
        for &index in plan.matches() {
            self.remove_tags(plan, index);
        }
    }

    fn remove_tags(&mut self, plan: &QueryPlan, index: EntityIndex) {
        for &tag in plan.tags() {
            if let Some(store) = self.components.erased_mut(tag) {
                store.remove_if_present(index);
            }
        }
    }

    /// Handles of every matched entity as they were when the query ran.
    fn visited_handles(&self, plan: &QueryPlan) -> Vec<Entity> {
        let generations = self.entities.generations();
        plan.matches()
            .iter()
            .map(|&index| Entity::new(index, generations[index as usize]))
            .collect()
    }

    /// Attach `G` to every handle that is still valid and lacks it. A slot
    /// recycled during playback belongs to a different entity and is skipped.
    fn attach_to_visited<G: Component + Default>(&mut self, visited: &[Entity]) -> Result<()> {
        let capacity = self.entities.max_entities();
        let store = self.components.store_mut::<G>()?;
        for &entity in visited {
            if !self.entities.is_valid(entity) || store.contains(entity.index()) {
                continue;
            }
            store
                .insert(entity.index(), G::default())
                .map_err(|err| store_error::<G>(err, entity, capacity))?;
        }
        Ok(())
    }

    fn thread_pool(&self) -> Result<&ThreadPool> {
        let threads = self.config.worker_threads;
        let pool = self.pool.get_or_try_init(|| {
            ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("quarry-worker-{i}"))
                .build()
        })?;
        Ok(pool)
    }

    /// Per-entity handle check. Handles whose slot is out of range or not
    /// live are always rejected; generations are compared only when
    /// `strict_handles` is on.
    #[inline]
    fn check_handle(&self, entity: Entity) -> Result<()> {
        let usable = if self.config.strict_handles {
            self.entities.is_valid(entity)
        } else {
            self.entities.entity_at(entity.index()).is_some()
        };
        if !usable {
            return Err(EcsError::StaleHandle { entity });
        }
        Ok(())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn store_error<T: Component>(err: StoreError, entity: Entity, capacity: usize) -> EcsError {
    match err {
        StoreError::Occupied { .. } => EcsError::DuplicateComponent {
            entity,
            component: T::name(),
        },
        StoreError::Vacant { .. } => EcsError::MissingComponent {
            entity,
            component: T::name(),
        },
        StoreError::CapacityExceeded { index } => EcsError::CapacityExceeded {
            requested: index as usize + 1,
            capacity,
        },
    }
}

/// Entities per parallel partition: enough partitions to balance load
/// across `threads`, but never fewer entities than `min_chunk`.
fn partition_len(matched: usize, threads: usize, min_chunk: usize) -> usize {
    let partitions = threads.max(1) * PARTITIONS_PER_THREAD;
    matched.div_ceil(partitions).max(min_chunk).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{define_component, define_tag, spawn};
    use std::collections::HashSet;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Position {
        x: i32,
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Velocity {
        x: i32,
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Health {
        value: i32,
    }
    define_component!(Position, Velocity, Health);

    #[derive(Default, Debug)]
    struct Dirty;
    #[derive(Default, Debug)]
    struct NeedsRemesh;
    define_tag!(Dirty, NeedsRemesh);

    fn world() -> World {
        let mut world = World::new();
        world
            .register_components::<(Position, Velocity, Health, Dirty, NeedsRemesh)>()
            .unwrap();
        world
    }

    fn strict_world() -> World {
        let mut world = World::with_config(WorldConfig {
            strict_handles: true,
            par_min_chunk: 2,
            worker_threads: 2,
            ..WorldConfig::default()
        })
        .unwrap();
        world
            .register_components::<(Position, Velocity, Health, Dirty, NeedsRemesh)>()
            .unwrap();
        world
    }

    #[test]
    fn test_register_twice_fails() {
        let mut world = world();
        assert!(matches!(
            world.register_component::<Position>(),
            Err(EcsError::DuplicateRegistration { .. })
        ));
        assert!(world.component_info::<Dirty>().unwrap().tag);
    }

    #[test]
    fn test_add_get_remove() {
        let mut world = world();
        let e = world.create().unwrap();
        world.add_component(e, Position { x: 3 }).unwrap();

        assert!(world.has_component::<Position>(e));
        assert!(!world.has_component::<Velocity>(e));
        assert_eq!(world.get_component::<Position>(e), Some(&Position { x: 3 }));
        world.get_component_mut::<Position>(e).unwrap().x = 4;
        assert_eq!(world.component::<Position>(e).unwrap().x, 4);

        assert!(matches!(
            world.add_component(e, Position { x: 9 }),
            Err(EcsError::DuplicateComponent { .. })
        ));
        assert_eq!(world.remove_component::<Position>(e).unwrap(), Position { x: 4 });
        assert!(matches!(
            world.remove_component::<Position>(e),
            Err(EcsError::MissingComponent { .. })
        ));
        assert!(matches!(
            world.component::<Velocity>(e),
            Err(EcsError::MissingComponent { .. })
        ));
    }

    #[test]
    fn test_unregistered_component() {
        struct Unknown;
        define_component!(Unknown);

        let mut world = world();
        let e = world.create().unwrap();
        assert!(matches!(
            world.add_component(e, Unknown),
            Err(EcsError::UnregisteredComponent { .. })
        ));
        assert!(matches!(
            world.for_each::<(Unknown,), _>(|_, _| {}),
            Err(EcsError::UnregisteredComponent { .. })
        ));
        assert!(world.get_component::<Unknown>(e).is_none());
    }

    #[test]
    fn test_destroy_removes_components_everywhere() {
        let mut world = world();
        let e = spawn!(world, Position { x: 1 }, Velocity { x: 2 }, Dirty).unwrap();
        let other = spawn!(world, Position { x: 5 }).unwrap();

        world.destroy(e).unwrap();
        assert!(!world.is_valid(e));
        assert_eq!(world.store::<Position>().unwrap().len(), 1);
        assert!(world.store::<Velocity>().unwrap().is_empty());
        assert!(world.store::<Dirty>().unwrap().is_empty());
        assert_eq!(world.get_component::<Position>(other), Some(&Position { x: 5 }));

        assert!(matches!(world.destroy(e), Err(EcsError::StaleHandle { .. })));
    }

    #[test]
    fn test_stale_handles_are_rejected_when_strict() {
        let mut world = strict_world();
        let old = world.create().unwrap();
        world.destroy(old).unwrap();
        let new = world.create().unwrap();
        assert_eq!(new.index(), old.index());

        assert!(matches!(
            world.add_component(old, Health { value: 1 }),
            Err(EcsError::StaleHandle { .. })
        ));
        world.add_component(new, Health { value: 1 }).unwrap();
        assert!(world.get_component::<Health>(old).is_none());
        assert!(!world.has_component::<Health>(old));
    }

    #[test]
    fn test_out_of_range_handles_are_always_rejected() {
        let mut world = World::with_config(WorldConfig {
            strict_handles: false,
            ..WorldConfig::default()
        })
        .unwrap();
        world.register_component::<Health>().unwrap();
        assert!(matches!(
            world.add_component(Entity::NULL, Health { value: 1 }),
            Err(EcsError::StaleHandle { .. })
        ));
    }

    #[test]
    fn test_spawn_checks_before_creating() {
        struct Unknown;
        define_component!(Unknown);

        let mut world = world();
        assert!(world.spawn((Position { x: 0 }, Unknown)).is_err());
        assert!(matches!(
            world.spawn((Position { x: 0 }, Position { x: 1 })),
            Err(EcsError::ConflictingAccess { .. })
        ));
        assert!(world.is_empty());
    }

    #[test]
    fn test_for_each_visits_exactly_the_intersection() {
        let mut world = world();
        let a = spawn!(world, Position { x: 1 }, Velocity { x: 10 }).unwrap();
        let _b = spawn!(world, Position { x: 2 }).unwrap();
        let c = spawn!(world, Position { x: 3 }, Velocity { x: 30 }, Health { value: 1 }).unwrap();
        let _d = spawn!(world, Velocity { x: 40 }).unwrap();

        let mut seen = HashSet::new();
        world
            .for_each::<(Position, Velocity), _>(|entity, (pos, vel)| {
                pos.x += vel.x;
                seen.insert(entity);
            })
            .unwrap();

        assert_eq!(seen, HashSet::from([a, c]));
        assert_eq!(world.get_component::<Position>(a), Some(&Position { x: 11 }));
        assert_eq!(world.get_component::<Position>(c), Some(&Position { x: 33 }));
        assert_eq!(world.count::<(Position, Velocity)>().unwrap(), 2);
        assert_eq!(world.count::<(Position, Velocity, Health)>().unwrap(), 1);
    }

    #[test]
    fn test_repeated_type_in_query_is_rejected() {
        let mut world = world();
        spawn!(world, Position { x: 1 }).unwrap();
        assert!(matches!(
            world.for_each::<(Position, Position), _>(|_, _| {}),
            Err(EcsError::ConflictingAccess { .. })
        ));
    }

    #[test]
    fn test_tag_is_present_during_callback_and_gone_after() {
        let mut world = world();
        let e = spawn!(world, Position { x: 0 }, Dirty).unwrap();
        let untagged = spawn!(world, Position { x: 0 }).unwrap();

        let mut visits = 0;
        world
            .for_each::<(Position, Dirty), _>(|entity, (pos, _dirty)| {
                assert_eq!(entity, e);
                pos.x = 7;
                visits += 1;
            })
            .unwrap();

        assert_eq!(visits, 1);
        assert!(!world.has_component::<Dirty>(e));
        assert_eq!(world.get_component::<Position>(e), Some(&Position { x: 7 }));
        assert_eq!(world.get_component::<Position>(untagged), Some(&Position { x: 0 }));

        world
            .for_each::<(Dirty,), _>(|_, _| panic!("tag should be consumed"))
            .unwrap();
    }

    #[test]
    fn test_tag_consumption_over_many_entities() {
        let mut world = world();
        let tagged: Vec<_> = (0..50)
            .map(|i| spawn!(world, Health { value: i }, Dirty).unwrap())
            .collect();

        let mut seen = HashSet::new();
        world
            .for_each::<(Health, Dirty), _>(|entity, (health, _)| {
                health.value *= 2;
                seen.insert(entity);
            })
            .unwrap();

        assert_eq!(seen.len(), tagged.len());
        assert!(world.store::<Dirty>().unwrap().is_empty());
        for (i, entity) in tagged.iter().enumerate() {
            assert_eq!(world.component::<Health>(*entity).unwrap().value, 2 * i as i32);
        }
    }

    #[test]
    fn test_commands_destroy_after_iteration() {
        let mut world = world();
        let entities: Vec<_> = (0..6)
            .map(|i| spawn!(world, Health { value: i }).unwrap())
            .collect();

        let mut visited = 0;
        world
            .for_each_with_commands::<(Health,), _>(|entity, (health,), commands| {
                visited += 1;
                if health.value % 2 == 0 {
                    commands.destroy(entity);
                }
            })
            .unwrap();

        assert_eq!(visited, 6);
        assert_eq!(world.len(), 3);
        for (i, entity) in entities.iter().enumerate() {
            assert_eq!(world.is_valid(*entity), i % 2 == 1);
        }
        assert_eq!(world.store::<Health>().unwrap().len(), 3);
    }

    #[test]
    fn test_deferred_insert_and_remove() {
        let mut world = world();
        let e = spawn!(world, Position { x: 1 }, Health { value: 5 }).unwrap();

        world
            .for_each_with_commands::<(Position,), _>(|entity, _, commands| {
                commands.insert(entity, Velocity { x: 2 });
                commands.remove::<Health>(entity);
            })
            .unwrap();

        assert_eq!(world.get_component::<Velocity>(e), Some(&Velocity { x: 2 }));
        assert!(!world.has_component::<Health>(e));
    }

    #[test]
    fn test_duplicate_destroy_requests_are_skipped() {
        let mut world = world();
        let e = world.create().unwrap();
        let mut commands = CommandBuffer::new();
        commands.destroy(e);
        commands.destroy(e);
        commands.insert(e, Health { value: 1 });
        world.play_commands(&mut commands).unwrap();
        assert!(!world.is_valid(e));
        assert!(commands.is_empty());
    }

    #[test]
    fn test_playback_error_is_returned() {
        let mut world = world();
        let e = spawn!(world, Health { value: 1 }).unwrap();
        let mut commands = CommandBuffer::new();
        commands.insert(e, Health { value: 2 });
        assert!(matches!(
            world.play_commands(&mut commands),
            Err(EcsError::DuplicateComponent { .. })
        ));
    }

    #[test]
    fn test_par_for_each_matches_sequential() {
        let mut sequential = strict_world();
        let mut parallel = strict_world();
        for i in 0..500 {
            for world in [&mut sequential, &mut parallel] {
                let e = spawn!(world, Position { x: i }).unwrap();
                if i % 3 == 0 {
                    world.add_component(e, Velocity { x: i % 7 }).unwrap();
                }
            }
        }

        sequential
            .for_each::<(Position, Velocity), _>(|_, (pos, vel)| pos.x = pos.x * 3 + vel.x)
            .unwrap();
        parallel
            .par_for_each::<(Position, Velocity), _>(|_, (pos, vel), _| pos.x = pos.x * 3 + vel.x)
            .unwrap();

        let xs = |world: &World| -> Vec<i32> {
            let store = world.store::<Position>().unwrap();
            store.values().iter().map(|position| position.x).collect()
        };
        let mut a = xs(&sequential);
        let mut b = xs(&parallel);
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn test_par_for_each_defers_destroy_and_tag_removal() {
        let mut world = strict_world();
        let entities: Vec<_> = (0..100)
            .map(|i| spawn!(world, Health { value: i }, Dirty).unwrap())
            .collect();

        world
            .par_for_each::<(Health, Dirty), _>(|entity, (health, _), commands| {
                health.value += 1000;
                if health.value % 10 == 0 {
                    commands.destroy(entity);
                }
            })
            .unwrap();

        assert!(world.store::<Dirty>().unwrap().is_empty());
        assert_eq!(world.len(), 90);
        for (i, entity) in entities.iter().enumerate() {
            if i % 10 == 0 {
                assert!(!world.is_valid(*entity));
            } else {
                assert_eq!(world.component::<Health>(*entity).unwrap().value, 1000 + i as i32);
            }
        }
    }

    #[test]
    fn test_tagging_variants_attach_after_visit() {
        let mut world = world();
        let moving = spawn!(world, Position { x: 0 }, Velocity { x: 1 }).unwrap();
        let still = spawn!(world, Position { x: 0 }).unwrap();

        world
            .for_each_tagging::<(Position, Velocity), NeedsRemesh, _>(|_, (pos, vel)| {
                pos.x += vel.x;
            })
            .unwrap();
        assert!(world.has_component::<NeedsRemesh>(moving));
        assert!(!world.has_component::<NeedsRemesh>(still));

        // Already tagged entities are left alone.
        world
            .par_for_each_tagging::<(Position, Velocity), NeedsRemesh, _>(|_, (pos, vel), _| {
                pos.x += vel.x;
            })
            .unwrap();
        assert_eq!(world.store::<NeedsRemesh>().unwrap().len(), 1);
        assert_eq!(world.get_component::<Position>(moving), Some(&Position { x: 2 }));

        let mut remeshed = Vec::new();
        world
            .for_each::<(NeedsRemesh,), _>(|entity, _| remeshed.push(entity))
            .unwrap();
        assert_eq!(remeshed, vec![moving]);
        assert!(!world.has_component::<NeedsRemesh>(moving));
    }

    #[test]
    fn test_tagging_skips_destroyed_entities() {
        let mut world = world();
        let doomed = spawn!(world, Health { value: 0 }).unwrap();
        let kept = spawn!(world, Health { value: 1 }).unwrap();

        world
            .par_for_each_tagging::<(Health,), NeedsRemesh, _>(|entity, (health,), commands| {
                if health.value == 0 {
                    commands.destroy(entity);
                }
            })
            .unwrap();

        assert!(!world.is_valid(doomed));
        assert!(world.has_component::<NeedsRemesh>(kept));
        assert_eq!(world.store::<NeedsRemesh>().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_keeps_registrations() {
        let mut world = world();
        let e = spawn!(world, Position { x: 1 }).unwrap();
        world.clear();
        assert!(world.is_empty());
        assert!(!world.is_valid(e));
        assert!(world.store::<Position>().unwrap().is_empty());
        let again = spawn!(world, Position { x: 2 }).unwrap();
        assert_eq!(world.get_component::<Position>(again), Some(&Position { x: 2 }));
    }

    fn lenient_world() -> World {
        let mut world = World::with_config(WorldConfig {
            strict_handles: false,
            ..WorldConfig::default()
        })
        .unwrap();
        world
            .register_components::<(Position, Velocity, Health, Dirty, NeedsRemesh)>()
            .unwrap();
        world
    }

    #[test]
    fn test_dead_slots_are_rejected_without_strict_handles() {
        let mut world = lenient_world();
        let dead = world.create().unwrap();
        world.destroy(dead).unwrap();

        assert!(matches!(
            world.add_component(dead, Health { value: 7 }),
            Err(EcsError::StaleHandle { .. })
        ));
        assert!(world.get_component::<Health>(dead).is_none());
        assert!(world.store::<Health>().unwrap().is_empty());

        let fresh = world.create().unwrap();
        assert_eq!(fresh.index(), dead.index());
        assert!(!world.has_component::<Health>(fresh));
        assert_eq!(world.count::<(Health,)>().unwrap(), 0);
    }

    #[test]
    fn test_lenient_handles_still_destroy_cleanly_through_commands() {
        let mut world = lenient_world();
        let dead = world.create().unwrap();
        world.destroy(dead).unwrap();
        let _ = world.add_component(dead, Health { value: 7 });
        let kept = spawn!(world, Health { value: 1 }).unwrap();

        world
            .for_each_with_commands::<(Health,), _>(|entity, _, commands| {
                commands.destroy(entity);
            })
            .unwrap();

        assert!(!world.is_valid(kept));
        assert!(world.is_empty());
        assert!(world.store::<Health>().unwrap().is_empty());
    }

    #[test]
    fn test_tagging_skips_slots_recycled_during_playback() {
        let mut world = world();
        let doomed = spawn!(world, Health { value: 0 }).unwrap();
        let kept = spawn!(world, Health { value: 1 }).unwrap();

        world
            .par_for_each_tagging::<(Health,), NeedsRemesh, _>(|entity, (health,), commands| {
                if health.value == 0 {
                    commands.destroy(entity);
                    commands.run(|world| world.create().map(drop));
                }
            })
            .unwrap();

        let recycled = world.entities().entity_at(doomed.index()).unwrap();
        assert_ne!(recycled, doomed);
        assert!(!world.has_component::<NeedsRemesh>(recycled));
        assert!(world.has_component::<NeedsRemesh>(kept));
        assert_eq!(world.store::<NeedsRemesh>().unwrap().len(), 1);
    }

    #[test]
    fn test_store_capacity_error_reports_world_limit() {
        let entity = Entity::new(7, 1);
        assert!(matches!(
            store_error::<Health>(StoreError::CapacityExceeded { index: 7 }, entity, 100),
            EcsError::CapacityExceeded {
                requested: 8,
                capacity: 100
            }
        ));
    }

    #[test]
    fn test_new_matches_default_config() {
        assert_eq!(World::new().config(), &WorldConfig::default());
        let world = World::with_config(WorldConfig::default()).unwrap();
        assert_eq!(world.config(), World::new().config());
    }

    #[test]
    fn test_partition_len() {
        assert_eq!(partition_len(0, 8, 16), 16);
        assert_eq!(partition_len(10_000, 4, 16), 625);
        assert_eq!(partition_len(100, 4, 64), 64);
        // Zero threads counts as one: four partitions of at most two.
        assert_eq!(partition_len(5, 0, 1), 2);
    }
}
