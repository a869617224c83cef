//! Self-tuning container materialization.
//!
//! A [`Feedback`] factory creates the fully-populated container for each new
//! holder instance of one holder type, then feeds the result's shape back
//! into a shared [`Model`] so the next materialization allocates better. It
//! learns shape, not content: which strategy to use and how much to pre-size.
//! A pathological workload only costs performance; the produced containers
//! are correct regardless of how well the model converges.

use std::sync::{Arc, Mutex};

use crate::component::RawId;
use crate::container::{Adaptive, Container, Strategy};
use crate::layout::Layout;

/// Universe width at which a container is considered sparse, as a multiple of
/// its occupancy. Tunable via [`Feedback::with_sparse_factor`].
const DEFAULT_SPARSE_FACTOR: u32 = 4;

/// The learned shape of containers produced for one holder type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Model {
    /// Strategy recommendation for the next instantiation.
    pub strategy: Strategy,
    /// Union of every observed raw id range. Never shrinks: future instances
    /// can only reveal more of the true universe, never less. A sizing hint
    /// only; ids outside it stay valid.
    pub universe: Option<(RawId, RawId)>,
    /// Occupancy of the most recent instance, used to pre-size hashed
    /// containers.
    pub expected: usize,
}

impl Model {
    fn new() -> Self {
        Self {
            strategy: Strategy::Indexed,
            universe: None,
            expected: 0,
        }
    }
}

/// Container factory for holder type `H` that tunes itself from feedback.
///
/// Holds the ordered population callbacks registered for the holder type,
/// optionally the compiled [`Layout`] when one was frozen, and the shared
/// [`Model`]. The model is mutex-guarded because holder instances may be
/// constructed concurrently; a stale read only degrades the heuristic.
pub struct Feedback<H> {
    layout: Option<Arc<Layout<H>>>,
    callbacks: Vec<Box<dyn Fn(&H, &mut dyn Container) + Send + Sync>>,
    model: Mutex<Model>,
    sparse_factor: u32,
}

impl<H: 'static> Default for Feedback<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: 'static> Feedback<H> {
    /// Create a factory with no compiled layout; every container goes through
    /// the adaptive path.
    pub fn new() -> Self {
        Self {
            layout: None,
            callbacks: Vec::new(),
            model: Mutex::new(Model::new()),
            sparse_factor: DEFAULT_SPARSE_FACTOR,
        }
    }

    /// Create a factory that instantiates the given compiled layout.
    pub fn with_layout(layout: Arc<Layout<H>>) -> Self {
        Self {
            layout: Some(layout),
            ..Self::new()
        }
    }

    /// Override the sparseness threshold.
    pub fn with_sparse_factor(mut self, factor: u32) -> Self {
        self.sparse_factor = factor;
        self
    }

    /// Register a population callback. Callbacks run in registration order on
    /// every [`create`](Self::create) and may insert zero or more components.
    pub fn on_create(
        &mut self,
        callback: impl Fn(&H, &mut dyn Container) + Send + Sync + 'static,
    ) -> &mut Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// Materialize the container for a newly constructed holder instance.
    ///
    /// Invoked exactly once per holder instance, at construction time.
    /// Allocates per the current model, runs every callback in registration
    /// order, then records the observed shape back into the model.
    pub fn create(&self, holder: &H) -> Box<dyn Container> {
        let mut container: Box<dyn Container> = match &self.layout {
            Some(layout) => Box::new(layout.instantiate(holder)),
            None => {
                let model = *self.model.lock().unwrap();
                match model.strategy {
                    Strategy::Indexed => Box::new(Adaptive::indexed(model.universe)),
                    Strategy::Hashed => Box::new(Adaptive::hashed(model.expected)),
                }
            }
        };

        for callback in &self.callbacks {
            callback(holder, container.as_mut());
        }

        self.observe(container.as_ref());
        container
    }

    /// A copy of the current model, for diagnostics.
    pub fn model(&self) -> Model {
        *self.model.lock().unwrap()
    }

    /// Fold one materialized container's shape into the model.
    fn observe(&self, container: &dyn Container) {
        let observed = container.raw_range();
        let occupancy = container.len();

        let mut model = self.model.lock().unwrap();
        if let Some((min, max)) = observed {
            let (low, high) = match model.universe {
                None => (min, max),
                Some((low, high)) => (low.min(min), high.max(max)),
            };
            model.universe = Some((low, high));

            // Indexed allocation is pre-sized to the model universe, so that
            // width against this instance's occupancy is the memory question.
            // Re-evaluated every time: the recommendation flips back to
            // indexed if occupancy catches up with the universe.
            let width = (high.value() - low.value() + 1) as usize;
            let strategy = if width > self.sparse_factor as usize * occupancy {
                Strategy::Hashed
            } else {
                Strategy::Indexed
            };
            if strategy != model.strategy {
                log::debug!(
                    "container model for {} flipped to {strategy} \
                     (universe width {width}, occupancy {occupancy})",
                    std::any::type_name::<H>(),
                );
                model.strategy = strategy;
            }
        }
        model.expected = occupancy;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::component::{Component, Identifier, Kind, Registry};
    use crate::layout::{Plan, Producer};
    use crate::tag::Tag;

    struct Zombie {
        /// Drives the optional component's predicate in the convergence
        /// scenarios.
        infected: bool,
    }

    struct Health(i32);

    impl Component for Health {
        fn save(&self) -> Tag {
            Tag::Int(self.0)
        }

        fn load(&mut self, tag: &Tag) {
            if let Some(value) = tag.as_int() {
                self.0 = value;
            }
        }
    }

    fn register(registry: &Registry, id: &str) -> Arc<Kind> {
        registry
            .register_if_absent::<Health>(Identifier::new(id).unwrap())
            .unwrap()
    }

    /// Factory whose callbacks always insert `always` and insert `sometimes`
    /// only for infected holders.
    fn zombie_factory(always: Arc<Kind>, sometimes: Arc<Kind>) -> Feedback<Zombie> {
        let mut factory = Feedback::new();
        factory.on_create(move |_zombie: &Zombie, container: &mut dyn Container| {
            container.put(Arc::clone(&always), Box::new(Health(20)));
        });
        factory.on_create(move |zombie: &Zombie, container: &mut dyn Container| {
            if zombie.infected {
                container.put(Arc::clone(&sometimes), Box::new(Health(5)));
            }
        });
        factory
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        // Given
        let registry = Registry::new();
        let kind = register(&registry, "mod:health");
        let order = Arc::new(AtomicU32::new(0));

        let mut factory = Feedback::<Zombie>::new();
        {
            let order = Arc::clone(&order);
            factory.on_create(move |_, _| {
                assert_eq!(order.fetch_add(1, Ordering::SeqCst), 0);
            });
        }
        {
            let order = Arc::clone(&order);
            let kind = Arc::clone(&kind);
            factory.on_create(move |_, container| {
                assert_eq!(order.fetch_add(1, Ordering::SeqCst), 1);
                container.put(Arc::clone(&kind), Box::new(Health(1)));
            });
        }

        // When
        let container = factory.create(&Zombie { infected: false });

        // Then
        assert_eq!(order.load(Ordering::SeqCst), 2);
        assert_eq!(container.len(), 1);
        assert!(container.contains(&kind));
    }

    #[test]
    fn universe_grows_monotonically_across_materializations() {
        // Given: kinds far enough apart to widen the universe stepwise.
        let registry = Registry::new();
        let kinds: Vec<_> = (0..12).map(|i| register(&registry, &format!("mod:k{i}"))).collect();

        let mut factory = Feedback::<u32>::new();
        {
            let kinds = kinds.clone();
            factory.on_create(move |&step, container: &mut dyn Container| {
                container.put(Arc::clone(&kinds[step as usize]), Box::new(Health(0)));
                // Keep raw 0 present so the range is anchored at the bottom.
                container.put(Arc::clone(&kinds[0]), Box::new(Health(0)));
            });
        }

        // When / Then: the recorded universe is the union of all observations.
        let mut widest = 0;
        for step in [3u32, 1, 7, 2, 11, 4] {
            factory.create(&step);
            widest = widest.max(step);
            let model = factory.model();
            assert_eq!(
                model.universe,
                Some((RawId::new(0), kinds[widest as usize].raw()))
            );
        }
    }

    #[test]
    fn sparse_instances_converge_the_model_to_hashed() {
        // Given: occupancy of 1-2 kinds against a universe 12 wide.
        let registry = Registry::new();
        let low = register(&registry, "mod:low");
        for i in 0..10 {
            register(&registry, &format!("mod:pad{i}"));
        }
        let high = register(&registry, "mod:high");

        let mut factory = zombie_factory(low, high);
        assert_eq!(factory.model().strategy, Strategy::Indexed);

        // When: 10% of instances carry the wide-ranged component.
        for i in 0..100 {
            factory.create(&Zombie { infected: i % 10 == 0 });
        }

        // Then: width 12 over occupancy 2 is beyond the 4x threshold.
        assert_eq!(factory.model().strategy, Strategy::Hashed);
        assert_eq!(factory.model().expected, 1);
    }

    #[test]
    fn dense_instances_keep_the_model_indexed() {
        // Given: adjacent raw ids, occupancy 1-2 over a universe of 2.
        let registry = Registry::new();
        let a = register(&registry, "mod:a");
        let b = register(&registry, "mod:b");

        let mut factory = zombie_factory(a, b);

        // When
        for i in 0..100 {
            factory.create(&Zombie { infected: i % 10 == 0 });
        }

        // Then
        assert_eq!(factory.model().strategy, Strategy::Indexed);
    }

    #[test]
    fn sparse_factor_is_tunable() {
        // Given: universe width 5 over occupancy 2. Sparse for a factor of 2
        // (5 > 2 * 2) but dense for the default 4 (5 < 4 * 2).
        let registry = Registry::new();
        let a = register(&registry, "mod:a");
        for i in 0..3 {
            register(&registry, &format!("mod:pad{i}"));
        }
        let c = register(&registry, "mod:c");

        let populate = move |container: &mut dyn Container| {
            container.put(Arc::clone(&a), Box::new(Health(0)));
            container.put(Arc::clone(&c), Box::new(Health(0)));
        };
        let mut relaxed = Feedback::<Zombie>::new();
        let mut strict = Feedback::<Zombie>::new().with_sparse_factor(2);
        {
            let populate = populate.clone();
            relaxed.on_create(move |_, container| populate(container));
        }
        strict.on_create(move |_, container| populate(container));

        // When
        relaxed.create(&Zombie { infected: false });
        strict.create(&Zombie { infected: false });

        // Then
        assert_eq!(relaxed.model().strategy, Strategy::Indexed);
        assert_eq!(strict.model().strategy, Strategy::Hashed);
    }

    #[test]
    fn recommendation_flips_back_when_occupancy_catches_up() {
        // Given: kinds spanning a universe of 12.
        let registry = Registry::new();
        let kinds: Vec<_> = (0..12).map(|i| register(&registry, &format!("mod:k{i}"))).collect();

        let mut factory = Feedback::<usize>::new();
        {
            let kinds = kinds.clone();
            factory.on_create(move |&occupancy, container: &mut dyn Container| {
                // Always touch both ends, fill evenly in between.
                container.put(Arc::clone(&kinds[0]), Box::new(Health(0)));
                container.put(Arc::clone(&kinds[11]), Box::new(Health(0)));
                for kind in kinds.iter().skip(1).step_by(3).take(occupancy.saturating_sub(2)) {
                    container.put(Arc::clone(kind), Box::new(Health(0)));
                }
            });
        }

        // When: occupancy 2 over width 12 is beyond the 4x threshold.
        factory.create(&2);
        assert_eq!(factory.model().strategy, Strategy::Hashed);

        // Then: occupancy 5 over the same width is back under it.
        factory.create(&5);
        assert_eq!(factory.model().strategy, Strategy::Indexed);
        // The universe never shrank along the way.
        assert_eq!(factory.model().universe, Some((RawId::new(0), RawId::new(11))));
    }

    #[test]
    fn pre_allocation_follows_the_model() {
        // Given: a model that has converged to hashed.
        let registry = Registry::new();
        let low = register(&registry, "mod:low");
        for i in 0..10 {
            register(&registry, &format!("mod:pad{i}"));
        }
        let high = register(&registry, "mod:high");
        let mut factory = zombie_factory(low, high);
        factory.create(&Zombie { infected: true });
        assert_eq!(factory.model().strategy, Strategy::Hashed);

        // Then: the next container is allocated hashed. Observable through
        // keys/len only, which is the point: both strategies behave alike.
        let container = factory.create(&Zombie { infected: false });
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn compiled_layouts_take_the_instantiation_path() {
        // Given
        let registry = Registry::new();
        let health = register(&registry, "mod:health");
        let mut plan = Plan::<Zombie>::new();
        plan.declare("mod_one", "mod:health", Producer::Unit(|| Box::new(Health(20))))
            .unwrap();
        let layout = plan.freeze(&registry).unwrap();

        let extra = register(&registry, "ext:extra");
        let mut factory = Feedback::with_layout(layout);
        {
            let extra = Arc::clone(&extra);
            factory.on_create(move |zombie: &Zombie, container: &mut dyn Container| {
                if zombie.infected {
                    container.put(Arc::clone(&extra), Box::new(Health(1)));
                }
            });
        }

        // When
        let container = factory.create(&Zombie { infected: true });

        // Then: compiled slot filled by its producer, callback overflow kept.
        assert_eq!(container.len(), 2);
        assert!(container.contains(&health));
        assert!(container.contains(&extra));
        assert_eq!(factory.model().expected, 2);
    }

    #[test]
    fn concurrent_creates_keep_the_model_consistent() {
        use std::thread;

        // Given
        let registry = Registry::new();
        let a = register(&registry, "mod:a");
        let b = register(&registry, "mod:b");
        let factory = Arc::new(zombie_factory(a, b));

        // When
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let factory = Arc::clone(&factory);
                thread::spawn(move || {
                    for i in 0..50 {
                        let container = factory.create(&Zombie { infected: (t + i) % 2 == 0 });
                        assert!(!container.is_empty());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Then: the union of everything observed, regardless of interleaving.
        let model = factory.model();
        assert_eq!(model.universe, Some((RawId::new(0), RawId::new(1))));
        assert!(model.expected == 1 || model.expected == 2);
    }
}
