//! The dependency-injection container.
//!
//! This is the DI container contract from the design: typed `provide`/`decorate`/`invoke`
//! registration, private scoping, deferred cycle detection, a dry-run mode for validate-only
//! apps, and DOT-language graph rendering. It is a secondary collaborator to the lifecycle
//! controller in `app`, `module`, and `lifecycle` — those own the hard state machines; this
//! module just needs to resolve a typed graph correctly.
//!
//! Storage follows the teacher crate's `di::Container`: a `TypeId`-keyed map of
//! `Arc<dyn Any + Send + Sync>`, downcast on resolve. Registration is generalized from "you
//! hand me a finished instance" to "you hand me a constructor and I resolve its arguments
//! for you", the same tuple-impl trick `axum::Handler` and Bevy systems use to accept
//! functions of varying arity without a macro-generated trait per crate consumer.

use crate::error::{Error, Result};
use crate::module::ModuleId;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::marker::PhantomData;
use std::panic::Location;
use std::sync::{Arc, Mutex};

type AnyArc = Arc<dyn Any + Send + Sync>;
type DepList = Vec<(TypeId, &'static str)>;

/// Whether a `provide` call introduced a brand new type or replaced an existing registration.
///
/// Mirrors the `Provided`/`Replaced` events the module tree emits once it knows which one
/// happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvideOutcome {
    Provided,
    Replaced,
}

/// Marker types used purely to disambiguate the tuple-impls below at the type level; they
/// never appear in a signature a user writes.
pub struct Infallible;
pub struct Fallible;

/// A constructor function usable with [`Container::provide`].
///
/// Implemented for plain functions/closures of up to four `Arc<Dep>` arguments, returning
/// either the produced value directly or a `Result` of it. Users never implement this
/// manually — it's blanket-implemented for ordinary function shapes.
pub trait ProvideFn<Marker>: Send + Sync + 'static {
    type Output: Send + Sync + 'static;
    fn dependency_ids() -> DepList;
    fn call(&self, container: &Container, requester: ModuleId) -> Result<Self::Output>;
}

/// A function usable with [`Container::invoke`] — runs once after the graph is wired, for
/// effect rather than for the value it returns.
pub trait InvokeFn<Marker>: Send + Sync + 'static {
    fn dependency_ids() -> DepList;
    fn call(&self, container: &Container, requester: ModuleId) -> Result<()>;
}

/// A function usable with [`Container::decorate`] — wraps the already-resolved value of its
/// target type with zero or one extra dependency.
pub trait DecorateFn<Marker>: Send + Sync + 'static {
    type Target: Send + Sync + 'static;
    fn dependency_ids() -> DepList;
    fn call(&self, container: &Container, requester: ModuleId, base: Arc<Self::Target>) -> Result<Self::Target>;
}

macro_rules! impl_provide_arity {
    ($($dep:ident),*) => {
        impl<F, Out, $($dep,)*> ProvideFn<(Infallible, $($dep,)*)> for F
        where
            F: Fn($(Arc<$dep>),*) -> Out + Send + Sync + 'static,
            Out: Send + Sync + 'static,
            $($dep: Send + Sync + 'static,)*
        {
            type Output = Out;
            fn dependency_ids() -> DepList {
                vec![$((TypeId::of::<$dep>(), std::any::type_name::<$dep>())),*]
            }
            #[allow(non_snake_case)]
            fn call(&self, container: &Container, requester: ModuleId) -> Result<Out> {
                $(let $dep = container.resolve::<$dep>(requester)?;)*
                Ok((self)($($dep),*))
            }
        }

        impl<F, Out, Err, $($dep,)*> ProvideFn<(Fallible, $($dep,)*)> for F
        where
            F: Fn($(Arc<$dep>),*) -> std::result::Result<Out, Err> + Send + Sync + 'static,
            Out: Send + Sync + 'static,
            Err: Into<Error>,
            $($dep: Send + Sync + 'static,)*
        {
            type Output = Out;
            fn dependency_ids() -> DepList {
                vec![$((TypeId::of::<$dep>(), std::any::type_name::<$dep>())),*]
            }
            #[allow(non_snake_case)]
            fn call(&self, container: &Container, requester: ModuleId) -> Result<Out> {
                $(let $dep = container.resolve::<$dep>(requester)?;)*
                (self)($($dep),*).map_err(Into::into)
            }
        }

        impl<F, $($dep,)*> InvokeFn<(Infallible, $($dep,)*)> for F
        where
            F: Fn($(Arc<$dep>),*) + Send + Sync + 'static,
            $($dep: Send + Sync + 'static,)*
        {
            fn dependency_ids() -> DepList {
                vec![$((TypeId::of::<$dep>(), std::any::type_name::<$dep>())),*]
            }
            #[allow(non_snake_case)]
            fn call(&self, container: &Container, requester: ModuleId) -> Result<()> {
                $(let $dep = container.resolve::<$dep>(requester)?;)*
                (self)($($dep),*);
                Ok(())
            }
        }

        impl<F, Err, $($dep,)*> InvokeFn<(Fallible, $($dep,)*)> for F
        where
            F: Fn($(Arc<$dep>),*) -> std::result::Result<(), Err> + Send + Sync + 'static,
            Err: Into<Error>,
            $($dep: Send + Sync + 'static,)*
        {
            fn dependency_ids() -> DepList {
                vec![$((TypeId::of::<$dep>(), std::any::type_name::<$dep>())),*]
            }
            #[allow(non_snake_case)]
            fn call(&self, container: &Container, requester: ModuleId) -> Result<()> {
                $(let $dep = container.resolve::<$dep>(requester)?;)*
                (self)($($dep),*).map_err(Into::into)
            }
        }
    };
}

impl_provide_arity!();
impl_provide_arity!(D1);
impl_provide_arity!(D1, D2);
impl_provide_arity!(D1, D2, D3);
impl_provide_arity!(D1, D2, D3, D4);

impl<F, T> DecorateFn<(Infallible, T)> for F
where
    F: Fn(Arc<T>) -> T + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    type Target = T;
    fn dependency_ids() -> DepList {
        Vec::new()
    }
    fn call(&self, _container: &Container, _requester: ModuleId, base: Arc<T>) -> Result<T> {
        Ok((self)(base))
    }
}

impl<F, T, Err> DecorateFn<(Fallible, T)> for F
where
    F: Fn(Arc<T>) -> std::result::Result<T, Err> + Send + Sync + 'static,
    T: Send + Sync + 'static,
    Err: Into<Error>,
{
    type Target = T;
    fn dependency_ids() -> DepList {
        Vec::new()
    }
    fn call(&self, _container: &Container, _requester: ModuleId, base: Arc<T>) -> Result<T> {
        (self)(base).map_err(Into::into)
    }
}

impl<F, T, D1> DecorateFn<(Infallible, T, D1)> for F
where
    F: Fn(Arc<T>, Arc<D1>) -> T + Send + Sync + 'static,
    T: Send + Sync + 'static,
    D1: Send + Sync + 'static,
{
    type Target = T;
    fn dependency_ids() -> DepList {
        vec![(TypeId::of::<D1>(), std::any::type_name::<D1>())]
    }
    fn call(&self, container: &Container, requester: ModuleId, base: Arc<T>) -> Result<T> {
        let d1 = container.resolve::<D1>(requester)?;
        Ok((self)(base, d1))
    }
}

impl<F, T, D1, Err> DecorateFn<(Fallible, T, D1)> for F
where
    F: Fn(Arc<T>, Arc<D1>) -> std::result::Result<T, Err> + Send + Sync + 'static,
    T: Send + Sync + 'static,
    D1: Send + Sync + 'static,
    Err: Into<Error>,
{
    type Target = T;
    fn dependency_ids() -> DepList {
        vec![(TypeId::of::<D1>(), std::any::type_name::<D1>())]
    }
    fn call(&self, container: &Container, requester: ModuleId, base: Arc<T>) -> Result<T> {
        let d1 = container.resolve::<D1>(requester)?;
        (self)(base, d1).map_err(Into::into)
    }
}

/// Type-erased form of [`ProvideFn`], so a constructor can be stored in a module's option
/// list and re-applied (the same `Provide` value can be used more than once — "applying the
/// same option twice is equivalent to providing it twice") without requiring the user's
/// closure to be `Clone`.
pub(crate) trait ErasedProvide: Send + Sync {
    fn produces(&self) -> (TypeId, &'static str);
    fn dependency_ids(&self) -> DepList;
    fn construct(&self, container: &Container, requester: ModuleId) -> Result<AnyArc>;
}

struct ProvideImpl<F, Marker>(F, PhantomData<fn() -> Marker>);

impl<F, Marker> ErasedProvide for ProvideImpl<F, Marker>
where
    F: ProvideFn<Marker> + Send + Sync + 'static,
    Marker: Send + Sync + 'static,
{
    fn produces(&self) -> (TypeId, &'static str) {
        (TypeId::of::<F::Output>(), std::any::type_name::<F::Output>())
    }
    fn dependency_ids(&self) -> DepList {
        F::dependency_ids()
    }
    fn construct(&self, container: &Container, requester: ModuleId) -> Result<AnyArc> {
        self.0.call(container, requester).map(|out| Arc::new(out) as AnyArc)
    }
}

pub(crate) fn erase_provide<Marker, F>(ctor: F) -> Arc<dyn ErasedProvide>
where
    F: ProvideFn<Marker> + Send + Sync + 'static,
    Marker: Send + Sync + 'static,
{
    Arc::new(ProvideImpl(ctor, PhantomData))
}

pub(crate) trait ErasedInvoke: Send + Sync {
    fn dependency_ids(&self) -> DepList;
    fn call(&self, container: &Container, requester: ModuleId) -> Result<()>;
}

struct InvokeImpl<F, Marker>(F, PhantomData<fn() -> Marker>);

impl<F, Marker> ErasedInvoke for InvokeImpl<F, Marker>
where
    F: InvokeFn<Marker> + Send + Sync + 'static,
    Marker: Send + Sync + 'static,
{
    fn dependency_ids(&self) -> DepList {
        F::dependency_ids()
    }
    fn call(&self, container: &Container, requester: ModuleId) -> Result<()> {
        self.0.call(container, requester)
    }
}

pub(crate) fn erase_invoke<Marker, F>(f: F) -> Arc<dyn ErasedInvoke>
where
    F: InvokeFn<Marker> + Send + Sync + 'static,
    Marker: Send + Sync + 'static,
{
    Arc::new(InvokeImpl(f, PhantomData))
}

pub(crate) trait ErasedDecorate: Send + Sync {
    fn target(&self) -> (TypeId, &'static str);
    fn dependency_ids(&self) -> DepList;
    fn construct(&self, container: &Container, requester: ModuleId, base: AnyArc) -> Result<AnyArc>;
}

struct DecorateImpl<F, Marker>(F, PhantomData<fn() -> Marker>);

impl<F, Marker> ErasedDecorate for DecorateImpl<F, Marker>
where
    F: DecorateFn<Marker> + Send + Sync + 'static,
    Marker: Send + Sync + 'static,
{
    fn target(&self) -> (TypeId, &'static str) {
        (TypeId::of::<F::Target>(), std::any::type_name::<F::Target>())
    }
    fn dependency_ids(&self) -> DepList {
        F::dependency_ids()
    }
    fn construct(&self, container: &Container, requester: ModuleId, base: AnyArc) -> Result<AnyArc> {
        let (_, name) = self.target();
        let typed = base
            .downcast::<F::Target>()
            .map_err(|_| Error::downcast_failed(name))?;
        self.0
            .call(container, requester, typed)
            .map(|out| Arc::new(out) as AnyArc)
    }
}

pub(crate) fn erase_decorate<Marker, F>(f: F) -> Arc<dyn ErasedDecorate>
where
    F: DecorateFn<Marker> + Send + Sync + 'static,
    Marker: Send + Sync + 'static,
{
    Arc::new(DecorateImpl(f, PhantomData))
}

struct Registration {
    inner: Arc<dyn ErasedProvide>,
    owner: ModuleId,
    private: bool,
    trace: &'static Location<'static>,
}

struct DecoratorEntry {
    inner: Arc<dyn ErasedDecorate>,
}

#[derive(Default)]
struct ContainerState {
    providers: HashMap<TypeId, Registration>,
    decorators: HashMap<TypeId, Vec<DecoratorEntry>>,
    instances: HashMap<TypeId, AnyArc>,
    resolving: HashSet<TypeId>,
    modules: HashMap<ModuleId, Option<ModuleId>>,
    frozen: bool,
}

/// The DI container. Thread-safe, resolved values memoized after first construction.
///
/// Construction happens on a single thread during an App's commit phase (§5: "Initialization
/// ... run on the caller's task"), so the internal `Mutex` exists for `Send + Sync`
/// correctness and for safe interleaving with later `resolve` calls from hook callbacks, not
/// for throughput under contention.
pub struct Container {
    state: Mutex<ContainerState>,
    dry_run: bool,
    recover_panics: bool,
}

impl Container {
    pub fn new(dry_run: bool, recover_panics: bool) -> Self {
        Self {
            state: Mutex::new(ContainerState::default()),
            dry_run,
            recover_panics,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub(crate) fn register_module(&self, id: ModuleId, parent: Option<ModuleId>) {
        self.state.lock().unwrap().modules.insert(id, parent);
    }

    pub(crate) fn freeze(&self) {
        self.state.lock().unwrap().frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.state.lock().unwrap().frozen
    }

    /// Register an already-built instance directly (used for the built-in `Lifecycle` and
    /// `Shutdowner` handles, and for `Supply` options).
    pub fn register_value<T: Send + Sync + 'static>(&self, value: T) {
        let tid = TypeId::of::<T>();
        self.state.lock().unwrap().instances.insert(tid, Arc::new(value));
    }

    #[track_caller]
    pub(crate) fn provide_erased(
        &self,
        requester: ModuleId,
        private: bool,
        inner: Arc<dyn ErasedProvide>,
    ) -> Result<ProvideOutcome> {
        let (tid, _name) = inner.produces();
        let trace = Location::caller();
        let mut state = self.state.lock().unwrap();
        if state.frozen {
            return Err(Error::option_misuse("container is frozen: Start has already completed"));
        }
        let outcome = if state.providers.contains_key(&tid) {
            ProvideOutcome::Replaced
        } else {
            ProvideOutcome::Provided
        };
        state.instances.remove(&tid);
        state.providers.insert(
            tid,
            Registration {
                inner,
                owner: requester,
                private,
                trace,
            },
        );
        Ok(outcome)
    }

    pub(crate) fn decorate_erased(&self, inner: Arc<dyn ErasedDecorate>) -> Result<()> {
        let (tid, _) = inner.target();
        let mut state = self.state.lock().unwrap();
        if state.frozen {
            return Err(Error::option_misuse("container is frozen: Start has already completed"));
        }
        state.decorators.entry(tid).or_default().push(DecoratorEntry { inner });
        Ok(())
    }

    pub(crate) fn invoke_erased(&self, requester: ModuleId, inner: &Arc<dyn ErasedInvoke>) -> Result<()> {
        if self.dry_run {
            for (tid, name) in inner.dependency_ids() {
                let mut visiting = HashSet::new();
                self.check_reachable_inner(tid, name, &mut visiting)?;
            }
            return Ok(());
        }
        inner.call(self, requester)
    }

    /// Resolve a dependency by type, constructing and caching it on first use.
    pub fn resolve<T: 'static + Send + Sync>(&self, requester: ModuleId) -> Result<Arc<T>> {
        let tid = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        if let Some(inst) = self.state.lock().unwrap().instances.get(&tid).cloned() {
            return downcast::<T>(inst, type_name);
        }

        let (reg_inner, trace) = {
            let mut state = self.state.lock().unwrap();
            if state.resolving.contains(&tid) {
                return Err(Error::circular(type_name));
            }
            let reg = state
                .providers
                .get(&tid)
                .ok_or_else(|| Error::dependency_not_found(type_name))?;
            if reg.private && !is_visible(&state.modules, requester, reg.owner) {
                return Err(Error::scope_mismatch(format!(
                    "{type_name} is private to the module subtree that registered it"
                )));
            }
            state.resolving.insert(tid);
            (Arc::clone(&reg.inner), reg.trace)
        };

        let constructed = if self.recover_panics {
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| reg_inner.construct(self, requester)))
                .unwrap_or_else(|payload| Err(Error::constructor_panic(format!("{trace}"), panic_message(payload))))
        } else {
            reg_inner.construct(self, requester)
        };

        {
            let mut state = self.state.lock().unwrap();
            state.resolving.remove(&tid);
        }

        let raw = constructed?;
        let decorated = self.apply_decorators(tid, requester, raw)?;

        self.state.lock().unwrap().instances.insert(tid, Arc::clone(&decorated));
        downcast::<T>(decorated, type_name)
    }

    fn apply_decorators(&self, tid: TypeId, requester: ModuleId, value: AnyArc) -> Result<AnyArc> {
        let decorators: Vec<Arc<dyn ErasedDecorate>> = {
            let state = self.state.lock().unwrap();
            state
                .decorators
                .get(&tid)
                .map(|entries| entries.iter().map(|e| Arc::clone(&e.inner)).collect())
                .unwrap_or_default()
        };
        let mut current = value;
        for decorator in decorators {
            current = decorator.construct(self, requester, current)?;
        }
        Ok(current)
    }

    /// Validate, without constructing anything, that `T` and everything it transitively
    /// depends on has a registered provider (or a pre-registered instance). The dry-run
    /// counterpart to [`Container::resolve`], used by [`crate::app::App::resolve`] when the
    /// App was built under `Validate`.
    pub(crate) fn check_reachable<T: 'static>(&self) -> Result<()> {
        let tid = TypeId::of::<T>();
        let name = std::any::type_name::<T>();
        self.check_reachable_inner(tid, name, &mut HashSet::new())
    }

    fn check_reachable_inner(&self, tid: TypeId, name: &'static str, visiting: &mut HashSet<TypeId>) -> Result<()> {
        if self.state.lock().unwrap().instances.contains_key(&tid) {
            return Ok(());
        }
        if !visiting.insert(tid) {
            return Err(Error::circular(name));
        }
        let deps = {
            let state = self.state.lock().unwrap();
            match state.providers.get(&tid) {
                Some(reg) => reg.inner.dependency_ids(),
                None => return Err(Error::dependency_not_found(name)),
            }
        };
        for (dep_tid, dep_name) in deps {
            self.check_reachable_inner(dep_tid, dep_name, visiting)?;
        }
        visiting.remove(&tid);
        Ok(())
    }

    /// Render the dependency graph (registered providers and their declared dependencies) as
    /// a DOT digraph, for attachment to graph-capable errors and for the built-in
    /// `DotGraph` provide.
    pub fn visualize(&self) -> String {
        let state = self.state.lock().unwrap();
        let mut out = String::from("digraph {\n");
        for reg in state.providers.values() {
            let (_, produced_name) = reg.inner.produces();
            for (_, dep_name) in reg.inner.dependency_ids() {
                let _ = writeln!(out, "  \"{dep_name}\" -> \"{produced_name}\";");
            }
            if reg.inner.dependency_ids().is_empty() {
                let _ = writeln!(out, "  \"{produced_name}\";");
            }
        }
        out.push('}');
        out
    }

    pub fn can_visualize_error(&self, err: &Error) -> bool {
        matches!(err, Error::Invoke { .. })
    }
}

fn is_visible(modules: &HashMap<ModuleId, Option<ModuleId>>, requester: ModuleId, owner: ModuleId) -> bool {
    let mut current = Some(requester);
    while let Some(id) = current {
        if id == owner {
            return true;
        }
        current = modules.get(&id).copied().flatten();
    }
    false
}

fn downcast<T: 'static + Send + Sync>(value: AnyArc, type_name: &str) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| Error::downcast_failed(type_name))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "constructor panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleId;

    fn root() -> ModuleId {
        ModuleId::for_test(0)
    }

    struct Greeting(String);
    struct Shout(String);

    #[test]
    fn resolves_zero_arg_constructor() {
        let container = Container::new(false, false);
        container.register_module(root(), None);
        container
            .provide_erased(root(), false, erase_provide(|| Greeting("hi".into())))
            .unwrap();
        let value = container.resolve::<Greeting>(root()).unwrap();
        assert_eq!(value.0, "hi");
    }

    #[test]
    fn resolves_constructor_with_dependency() {
        let container = Container::new(false, false);
        container.register_module(root(), None);
        container
            .provide_erased(root(), false, erase_provide(|| Greeting("hi".into())))
            .unwrap();
        container
            .provide_erased(
                root(),
                false,
                erase_provide(|g: Arc<Greeting>| Shout(g.0.to_uppercase())),
            )
            .unwrap();
        let value = container.resolve::<Shout>(root()).unwrap();
        assert_eq!(value.0, "HI");
    }

    #[test]
    fn missing_dependency_errors() {
        let container = Container::new(false, false);
        container.register_module(root(), None);
        let err = container.resolve::<Greeting>(root()).unwrap_err();
        assert!(matches!(err, Error::DependencyNotFound { .. }));
    }

    #[test]
    fn replacing_a_provider_reports_replaced() {
        let container = Container::new(false, false);
        container.register_module(root(), None);
        let first = container
            .provide_erased(root(), false, erase_provide(|| Greeting("a".into())))
            .unwrap();
        let second = container
            .provide_erased(root(), false, erase_provide(|| Greeting("b".into())))
            .unwrap();
        assert_eq!(first, ProvideOutcome::Provided);
        assert_eq!(second, ProvideOutcome::Replaced);
        assert_eq!(container.resolve::<Greeting>(root()).unwrap().0, "b");
    }

    #[test]
    fn private_provide_invisible_outside_subtree() {
        let container = Container::new(false, false);
        let owner = ModuleId::for_test(1);
        let outsider = ModuleId::for_test(2);
        container.register_module(root(), None);
        container.register_module(owner, Some(root()));
        container.register_module(outsider, Some(root()));
        container
            .provide_erased(owner, true, erase_provide(|| Greeting("secret".into())))
            .unwrap();
        assert!(container.resolve::<Greeting>(outsider).is_err());
        assert!(container.resolve::<Greeting>(owner).is_ok());
    }

    #[test]
    fn decorate_wraps_resolved_value() {
        let container = Container::new(false, false);
        container.register_module(root(), None);
        container
            .provide_erased(root(), false, erase_provide(|| Greeting("hi".into())))
            .unwrap();
        container
            .decorate_erased(erase_decorate(|g: Arc<Greeting>| Greeting(format!("{}!", g.0))))
            .unwrap();
        assert_eq!(container.resolve::<Greeting>(root()).unwrap().0, "hi!");
    }

    #[test]
    fn frozen_container_rejects_new_provides() {
        let container = Container::new(false, false);
        container.register_module(root(), None);
        container.freeze();
        let err = container
            .provide_erased(root(), false, erase_provide(|| Greeting("late".into())))
            .unwrap_err();
        assert!(matches!(err, Error::OptionMisuse { .. }));
    }

    #[test]
    fn dry_run_validates_without_constructing() {
        let container = Container::new(true, false);
        container.register_module(root(), None);
        container
            .provide_erased(
                root(),
                false,
                erase_provide(|| {
                    panic!("constructors must not run in dry-run mode");
                    #[allow(unreachable_code)]
                    Greeting(String::new())
                }),
            )
            .unwrap();
        let invoke = erase_invoke(|_g: Arc<Greeting>| {});
        container.invoke_erased(root(), &invoke).unwrap();
    }

    #[test]
    fn recover_panics_converts_panic_to_constructor_panic_error() {
        let container = Container::new(false, true);
        container.register_module(root(), None);
        container
            .provide_erased(root(), false, erase_provide(|| -> Greeting { panic!("boom") }))
            .unwrap();
        let err = container.resolve::<Greeting>(root()).unwrap_err();
        assert!(matches!(err, Error::ConstructorPanic { .. }));
    }

    #[test]
    fn dry_run_reports_missing_dependency_by_name() {
        let container = Container::new(true, false);
        container.register_module(root(), None);
        let invoke = erase_invoke(|_g: Arc<Greeting>| {});
        let err = container.invoke_erased(root(), &invoke).unwrap_err();
        match err {
            Error::DependencyNotFound { type_name } => assert!(type_name.contains("Greeting")),
            other => panic!("expected DependencyNotFound, got {other:?}"),
        }
    }
}
