use std::path::{Path, PathBuf};

use rand::{SeedableRng as _, rngs::StdRng};
use tracing::{Instrument, debug, info, info_span, trace, warn};
use wasmtime::{
    Config, Engine, Instance, Linker, Module, Store, TypedFunc, WasmParams, WasmResults,
};

use crate::{
    capability,
    error::{Error, Result},
    event::{EventSource, HostEvent},
    host::{Host, Viewport},
    input::{KeyCode, PhysicalKey},
    internal::{
        module::{compile::load_or_compile_module, configure::configure_engine},
        resource::MemoryLimiter,
    },
    surface::{Color, Surface},
};

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Surface size used until the first resize; the guest never sees it.
    pub initial_size: Viewport,
    pub background: Color,
    pub max_memory: usize,
    /// Fixed seed for `random()`. `None` seeds from the OS.
    pub random_seed: Option<u64>,
    /// Directory to store `.cwasm` artifacts. `None` disables caching.
    pub cache: Option<PathBuf>,
}

impl BridgeConfig {
    pub const DEFAULT_MAX_MEMORY: usize = 64 * 1024 * 1024;
    pub const DEFAULT_INITIAL_SIZE: Viewport = Viewport::new(640, 480);
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            initial_size: Self::DEFAULT_INITIAL_SIZE,
            background: Color::BLACK,
            max_memory: Self::DEFAULT_MAX_MEMORY,
            random_seed: None,
            cache: None,
        }
    }
}

#[derive(Default)]
pub struct BridgeBuilder {
    config: BridgeConfig,
    engine_config: Option<Config>,
}

impl BridgeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, cfg: BridgeConfig) -> Self {
        self.config = cfg;
        self
    }

    #[must_use]
    pub const fn initial_size(mut self, width: u32, height: u32) -> Self {
        self.config.initial_size = Viewport::new(width, height);
        self
    }

    #[must_use]
    pub const fn background(mut self, color: Color) -> Self {
        self.config.background = color;
        self
    }

    #[must_use]
    pub const fn max_memory(mut self, bytes: usize) -> Self {
        self.config.max_memory = bytes;
        self
    }

    #[must_use]
    pub const fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache = Some(dir.into());
        self
    }

    #[must_use]
    pub fn engine_config(mut self, cfg: Config) -> Self {
        self.engine_config = Some(cfg);
        self
    }

    /// Read a guest from disk and bootstrap it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or bootstrap fails.
    pub async fn build_from_file<H: Host>(self, wasm: impl AsRef<Path>, host: H) -> Result<Bridge<H>> {
        let bytes = tokio::fs::read(wasm.as_ref()).await?;
        self.build(bytes, host).await
    }

    /// Compile, link and instantiate `wasm`, then run its init entry point.
    ///
    /// On success the guest has seen one resize to the host viewport and its
    /// init entry point has returned; the bridge is ready for [`Bridge::run`].
    ///
    /// # Errors
    /// Returns an error if the module does not compile, imports anything
    /// outside the capability table, lacks a required export, or fails while
    /// instantiating or initializing.
    pub async fn build<H: Host>(self, wasm: impl Into<Vec<u8>>, host: H) -> Result<Bridge<H>> {
        let cfg = self.config;

        let custom_engine_config = self.engine_config.is_some();
        let mut engine_cfg = self.engine_config.unwrap_or_default();
        if custom_engine_config {
            warn!("custom wasmtime::Config provided; easel will override code generation settings");
        }
        configure_engine(&mut engine_cfg);
        let engine = Engine::new(&engine_cfg).map_err(Error::Compile)?;

        let span = info_span!("bridge.bootstrap");
        let wasm = wasm.into();
        async move {
            let module = load_or_compile_module(&engine, wasm, cfg.cache.as_deref()).await?;
            check_imports(&module)?;

            let mut linker = Linker::new(&engine);
            capability::add_to_linker(&mut linker).map_err(Error::Instantiate)?;

            let state = BridgeState {
                surface: Surface::new(
                    cfg.initial_size.width,
                    cfg.initial_size.height,
                    cfg.background,
                ),
                host,
                rng: cfg
                    .random_seed
                    .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64),
                limiter: MemoryLimiter::new(cfg.max_memory),
                ready: false,
            };
            let mut store = Store::new(&engine, state);
            store.limiter(|s| &mut s.limiter);

            let instance = linker
                .instantiate(&mut store, &module)
                .map_err(Error::Instantiate)?;
            let exports = GuestExports::resolve(&instance, &mut store)?;
            store.data_mut().ready = true;

            let mut bridge = Bridge {
                store,
                exports,
                halted: None,
                ticks: 0,
            };
            let viewport = bridge.host().viewport();
            bridge.resize(viewport);
            bridge.init()?;
            info!(
                width = viewport.width,
                height = viewport.height,
                "guest initialized"
            );
            Ok(bridge)
        }
        .instrument(span)
        .await
    }
}

fn check_imports(module: &Module) -> Result<()> {
    for import in module.imports() {
        if !capability::is_capability(import.module(), import.name()) {
            return Err(Error::UnknownImport {
                module: import.module().to_string(),
                name: import.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Everything a capability call may touch, owned by the wasmtime store.
pub struct BridgeState<H: Host> {
    pub(crate) surface: Surface,
    pub(crate) host: H,
    pub(crate) rng: StdRng,
    pub(crate) limiter: MemoryLimiter,
    /// Set once instantiation finished; capabilities refuse to run before.
    pub(crate) ready: bool,
}

/// Guest exports the bridge calls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    Main,
    Init,
    Tick,
    KeyDown,
    KeyUp,
}

impl EntryPoint {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Init => "init",
            Self::Tick => "tick",
            Self::KeyDown => "key_down",
            Self::KeyUp => "key_up",
        }
    }
}

enum InitFunc {
    Plain(EntryPoint, TypedFunc<(), ()>),
    /// C-style `main(argc, argv)`; called with `(0, 0)` and the result ignored.
    WithArgs(TypedFunc<(i32, i32), i32>),
}

struct GuestExports {
    init: InitFunc,
    tick: TypedFunc<(), ()>,
    key_down: TypedFunc<i32, ()>,
    key_up: TypedFunc<i32, ()>,
}

impl GuestExports {
    fn resolve<T: 'static>(instance: &Instance, store: &mut Store<T>) -> Result<Self> {
        let init = if let Some(main) = instance.get_func(&mut *store, "main") {
            match main.typed::<(), ()>(&*store) {
                Ok(func) => InitFunc::Plain(EntryPoint::Main, func),
                Err(_) => InitFunc::WithArgs(main.typed::<(i32, i32), i32>(&*store).map_err(
                    |source| Error::ExportSignature {
                        name: EntryPoint::Main.name(),
                        source,
                    },
                )?),
            }
        } else if instance.get_func(&mut *store, "init").is_some() {
            InitFunc::Plain(EntryPoint::Init, typed(instance, store, EntryPoint::Init)?)
        } else {
            return Err(Error::MissingExport(EntryPoint::Main.name()));
        };

        Ok(Self {
            init,
            tick: typed(instance, store, EntryPoint::Tick)?,
            key_down: typed(instance, store, EntryPoint::KeyDown)?,
            key_up: typed(instance, store, EntryPoint::KeyUp)?,
        })
    }
}

fn typed<T, P, R>(
    instance: &Instance,
    store: &mut Store<T>,
    entry: EntryPoint,
) -> Result<TypedFunc<P, R>>
where
    T: 'static,
    P: WasmParams,
    R: WasmResults,
{
    let name = entry.name();
    let func = instance
        .get_func(&mut *store, name)
        .ok_or(Error::MissingExport(name))?;
    func.typed::<P, R>(&*store)
        .map_err(|source| Error::ExportSignature { name, source })
}

/// A bootstrapped guest together with the surface it draws on.
///
/// Events are handled one at a time, each running to completion. After any
/// guest call fails the bridge is halted and refuses further calls.
pub struct Bridge<H: Host> {
    store: Store<BridgeState<H>>,
    exports: GuestExports,
    halted: Option<EntryPoint>,
    ticks: u64,
}

impl<H: Host> Bridge<H> {
    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.store.data().surface
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.store.data().host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.store.data_mut().host
    }

    /// Number of ticks delivered so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The entry point whose failure halted the bridge, if any.
    #[must_use]
    pub const fn halted(&self) -> Option<EntryPoint> {
        self.halted
    }

    fn ensure_running(&self) -> Result<()> {
        match self.halted {
            Some(entry) => Err(Error::Halted(entry.name())),
            None => Ok(()),
        }
    }

    fn guest_failed(&mut self, entry: EntryPoint, source: anyhow::Error) -> Error {
        self.halted = Some(entry);
        Error::Guest {
            entry: entry.name(),
            source,
        }
    }

    fn init(&mut self) -> Result<()> {
        let (entry, result) = match &self.exports.init {
            InitFunc::Plain(entry, func) => (*entry, func.call(&mut self.store, ())),
            InitFunc::WithArgs(func) => (
                EntryPoint::Main,
                func.call(&mut self.store, (0, 0)).map(drop),
            ),
        };
        result.map_err(|source| self.guest_failed(entry, source))
    }

    /// Run one frame: call the guest's `tick` and present the surface.
    ///
    /// # Errors
    /// Returns an error if the guest fails, the host cannot present, or the
    /// bridge already halted.
    pub fn tick(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.ticks += 1;
        trace!(tick = self.ticks, "tick");
        if let Err(source) = self.exports.tick.call(&mut self.store, ()) {
            return Err(self.guest_failed(EntryPoint::Tick, source));
        }
        let state = self.store.data_mut();
        state.host.present(&state.surface).map_err(Error::Host)
    }

    /// # Errors
    /// Returns an error if the guest fails or the bridge already halted.
    pub fn key_down(&mut self, key: &PhysicalKey) -> Result<()> {
        self.ensure_running()?;
        let code = KeyCode::translate(key).code();
        debug!(key = %key, code, "key down");
        self.exports
            .key_down
            .call(&mut self.store, code)
            .map_err(|source| self.guest_failed(EntryPoint::KeyDown, source))
    }

    /// # Errors
    /// Returns an error if the guest fails or the bridge already halted.
    pub fn key_up(&mut self, key: &PhysicalKey) -> Result<()> {
        self.ensure_running()?;
        let code = KeyCode::translate(key).code();
        debug!(key = %key, code, "key up");
        self.exports
            .key_up
            .call(&mut self.store, code)
            .map_err(|source| self.guest_failed(EntryPoint::KeyUp, source))
    }

    /// Match the surface to a new viewport. Contents and drawing state reset;
    /// the guest sees the new size on its next call.
    pub fn resize(&mut self, viewport: Viewport) {
        debug!(
            width = viewport.width,
            height = viewport.height,
            "resize surface"
        );
        self.store
            .data_mut()
            .surface
            .resize(viewport.width, viewport.height);
    }

    /// Handle a single host event to completion.
    ///
    /// # Errors
    /// Returns an error if the guest call the event triggers fails.
    pub fn dispatch(&mut self, event: HostEvent) -> Result<()> {
        match event {
            HostEvent::KeyDown(key) => self.key_down(&key),
            HostEvent::KeyUp(key) => self.key_up(&key),
            HostEvent::Resize(viewport) => {
                self.ensure_running()?;
                self.resize(viewport);
                Ok(())
            }
            HostEvent::Refresh => self.tick(),
        }
    }

    /// Drain `events` until the source closes or a guest call fails.
    ///
    /// A closed source is a normal shutdown and returns `Ok`.
    ///
    /// # Errors
    /// Returns the first guest, host or event source failure.
    pub async fn run<E: EventSource + ?Sized>(&mut self, events: &mut E) -> Result<()> {
        self.ensure_running()?;
        info!("frame driver started");
        while let Some(event) = events.next_event().await.map_err(Error::Host)? {
            self.dispatch(event)?;
        }
        info!(ticks = self.ticks, "event source closed; frame driver stopped");
        Ok(())
    }
}
