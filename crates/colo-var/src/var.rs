/// Observable value cells with synchronous change propagation.
///
/// A [`Var`] holds a current value and a registry of observers. Updating
/// the value notifies every observer on the calling thread. Derived vars
/// (`map`, `join`, `collect`, `flat_map`) subscribe to their sources and
/// hold them alive; sources only keep a weak back-reference, so a derived
/// graph is released as soon as its last handle is dropped.
///
/// Each cell stores and notifies under its own gate, so concurrent updates
/// of one var reach observers in the order they were stored. Derived vars
/// compute and publish under their own gate. An observer must not update
/// or observe the var that is notifying it.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Cell<T> {
    value: T,
    version: u64,
    next_id: u64,
    observers: Vec<(u64, Observer<T>)>,
}

struct Shared<T> {
    /// Held from store through notification.
    gate: Mutex<()>,
    cell: Mutex<Cell<T>>,
    /// Subscriptions this var holds on its sources.
    upstream: Mutex<Vec<Observation>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Observers run outside the lock, so a poisoned cell still holds a
    // consistent value.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<T: Send + 'static> Detach for Shared<T> {
    fn detach(&self, id: u64) {
        // Dropped outside the lock: an observer may own the last handle of
        // a var whose teardown detaches from this cell again.
        let removed = {
            let mut cell = lock(&self.cell);
            let position = cell.observers.iter().position(|(oid, _)| *oid == id);
            position.map(|pos| cell.observers.remove(pos))
        };
        drop(removed);
    }
}

/// Handle to a registered observer. Dropping it unsubscribes.
///
/// An observation also keeps its source var alive.
#[must_use = "dropping an Observation unsubscribes immediately"]
pub struct Observation {
    source: Arc<dyn Detach>,
    id: u64,
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.source.detach(self.id);
    }
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation").field("id", &self.id).finish()
    }
}

/// A dynamically-updating value.
///
/// Cloning a `Var` yields another handle to the same cell.
pub struct Var<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Weak handle used by derived vars' observers.
struct WeakVar<T> {
    shared: Weak<Shared<T>>,
}

impl<T> Clone for WeakVar<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T> WeakVar<T> {
    fn upgrade(&self) -> Option<Var<T>> {
        self.shared.upgrade().map(|shared| Var { shared })
    }
}

impl<T> Var<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Create a var holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                gate: Mutex::new(()),
                cell: Mutex::new(Cell {
                    value,
                    version: 0,
                    next_id: 0,
                    observers: Vec::new(),
                }),
                upstream: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Current value.
    pub fn sample(&self) -> T {
        lock(&self.shared.cell).value.clone()
    }

    /// Number of distinct changes applied since creation.
    pub fn version(&self) -> u64 {
        lock(&self.shared.cell).version
    }

    /// Number of live observers (derived vars included).
    pub fn observer_count(&self) -> usize {
        lock(&self.shared.cell).observers.len()
    }

    /// Whether two handles point at the same cell.
    pub fn ptr_eq(&self, other: &Var<T>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Replace the value and notify observers.
    ///
    /// Returns `false` and notifies nobody when `value` equals the current
    /// value.
    pub fn update(&self, value: T) -> bool {
        self.publish(|| Some(value))
    }

    /// Store and notify the value produced by `compute`, if any, with the
    /// gate held. Computing under the gate lets derived vars read their
    /// inputs without racing another publish.
    fn publish(&self, compute: impl FnOnce() -> Option<T>) -> bool {
        let _gate = lock(&self.shared.gate);
        let Some(value) = compute() else {
            return false;
        };
        let observers: Vec<Observer<T>> = {
            let mut cell = lock(&self.shared.cell);
            if cell.value == value {
                return false;
            }
            cell.value = value.clone();
            cell.version += 1;
            cell.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
        };
        for observer in observers {
            observer(&value);
        }
        true
    }

    /// Register `f`, calling it with the current value right away and then
    /// with every subsequent change.
    pub fn observe<F>(&self, f: F) -> Observation
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let f: Observer<T> = Arc::new(f);
        let _gate = lock(&self.shared.gate);
        let (observation, current) = self.register(Arc::clone(&f));
        f(&current);
        observation
    }

    /// Derive a var recomputing `f` once per change of `self`.
    pub fn map<U, F>(&self, f: F) -> Var<U>
    where
        U: Clone + PartialEq + Send + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let _gate = lock(&self.shared.gate);
        let derived = Var::new(f(&self.sample()));
        let target = derived.downgrade();
        let (observation, _) = self.register(Arc::new(move |value: &T| {
            if let Some(target) = target.upgrade() {
                target.publish(|| Some(f(value)));
            }
        }));
        derived.hold(observation);
        derived
    }

    /// Derive a var from whichever var `f` returns for the current value,
    /// switching over whenever `self` changes.
    pub fn flat_map<U, F>(&self, f: F) -> Var<U>
    where
        U: Clone + PartialEq + Send + 'static,
        F: Fn(&T) -> Var<U> + Send + Sync + 'static,
    {
        let _gate = lock(&self.shared.gate);
        let inner = f(&self.sample());
        let derived = Var::new(inner.sample());
        let target = derived.downgrade();
        // Only the forwarder of the latest generation may publish.
        let generation = Arc::new(AtomicU64::new(0));
        let active = Mutex::new(forward(&inner, target.clone(), Arc::clone(&generation), 0));

        let (observation, _) = self.register(Arc::new(move |value: &T| {
            if target.upgrade().is_none() {
                return;
            }
            let inner = f(value);
            let current = generation.fetch_add(1, Ordering::SeqCst) + 1;
            let next = forward(&inner, target.clone(), Arc::clone(&generation), current);
            let previous = std::mem::replace(&mut *lock(&active), next);
            drop(previous);
        }));
        derived.hold(observation);
        derived
    }

    /// Combine two vars into a var of pairs.
    pub fn join<U>(&self, other: &Var<U>) -> Var<(T, U)>
    where
        U: Clone + PartialEq + Send + 'static,
    {
        let slots = Arc::new(Mutex::new((self.sample(), other.sample())));
        let derived = Var::new(lock(&slots).clone());

        let (left_obs, _) = self.register({
            let slots = Arc::clone(&slots);
            let target = derived.downgrade();
            Arc::new(move |value: &T| {
                if let Some(target) = target.upgrade() {
                    target.publish(|| {
                        let mut pair = lock(&slots);
                        pair.0 = value.clone();
                        Some(pair.clone())
                    });
                }
            })
        });
        let (right_obs, _) = other.register({
            let slots = Arc::clone(&slots);
            let target = derived.downgrade();
            Arc::new(move |value: &U| {
                if let Some(target) = target.upgrade() {
                    target.publish(|| {
                        let mut pair = lock(&slots);
                        pair.1 = value.clone();
                        Some(pair.clone())
                    });
                }
            })
        });
        // Catch up on changes made while registering. A cell only moves
        // forward, so a fresh sample is never older than a delivered value.
        derived.publish(|| {
            let mut pair = lock(&slots);
            *pair = (self.sample(), other.sample());
            Some(pair.clone())
        });
        derived.hold(left_obs);
        derived.hold(right_obs);
        derived
    }

    /// Combine an ordered sequence of vars into a var of their current
    /// values, in the same order.
    ///
    /// Propagation is depth-first and synchronous: when several sources
    /// change because of one upstream update, observers may see an
    /// intermediate combination before the final one.
    pub fn collect(vars: &[Var<T>]) -> Var<Vec<T>> {
        let slots = Arc::new(Mutex::new(vars.iter().map(Var::sample).collect::<Vec<T>>()));
        let derived = Var::new(lock(&slots).clone());

        let mut observations = Vec::with_capacity(vars.len());
        for (index, var) in vars.iter().enumerate() {
            let slots = Arc::clone(&slots);
            let target = derived.downgrade();
            let (observation, _) = var.register(Arc::new(move |value: &T| {
                if let Some(target) = target.upgrade() {
                    target.publish(|| {
                        let mut values = lock(&slots);
                        values[index] = value.clone();
                        Some(values.clone())
                    });
                }
            }));
            observations.push(observation);
        }

        derived.publish(|| {
            let mut values = lock(&slots);
            *values = vars.iter().map(Var::sample).collect();
            Some(values.clone())
        });
        for observation in observations {
            derived.hold(observation);
        }
        derived
    }

    /// Register an observer without delivering the current value.
    /// Returns the value current at registration time.
    fn register(&self, observer: Observer<T>) -> (Observation, T) {
        let mut cell = lock(&self.shared.cell);
        let id = cell.next_id;
        cell.next_id += 1;
        cell.observers.push((id, observer));
        let source: Arc<dyn Detach> = self.shared.clone();
        (Observation { source, id }, cell.value.clone())
    }

    fn hold(&self, observation: Observation) {
        lock(&self.shared.upstream).push(observation);
    }

    fn downgrade(&self) -> WeakVar<T> {
        WeakVar {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

/// Push every value of `inner` into `target` while `generation` still
/// equals `current`.
fn forward<U>(
    inner: &Var<U>,
    target: WeakVar<U>,
    generation: Arc<AtomicU64>,
    current: u64,
) -> Observation
where
    U: Clone + PartialEq + Send + 'static,
{
    inner.observe(move |value: &U| {
        if let Some(target) = target.upgrade() {
            target.publish(|| {
                (generation.load(Ordering::SeqCst) == current).then(|| value.clone())
            });
        }
    })
}

impl<T> fmt::Debug for Var<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = lock(&self.shared.cell);
        f.debug_struct("Var")
            .field("value", &cell.value)
            .field("version", &cell.version)
            .finish()
    }
}

impl<T> Default for Var<T>
where
    T: Clone + PartialEq + Send + Default + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}
