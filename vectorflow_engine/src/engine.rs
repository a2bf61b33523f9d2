/// Vectorflow Engine - Global owner of the render context and the logger
///
/// The engine holds the single live `RenderContext` behind a mutex and tracks
/// the renderer-ready lifecycle. Work that needs a renderer (image decoding,
/// texture uploads) registers a continuation with
/// [`Engine::call_or_register_on_initialized`]; continuations registered before
/// the context exists run exactly once when it is created.

use std::sync::{OnceLock, RwLock, Arc, Mutex};
use std::time::SystemTime;
use crate::render_context::RenderContext;
use crate::error::{Result, Error};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Continuation waiting for the renderer to become ready
pub type ReadyCallback = Box<dyn FnOnce() + Send + 'static>;

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Renderer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No render context yet; continuations are queued
    Uninitialized,
    /// Render context live; continuations run immediately
    Ready,
}

/// Lifecycle flag and the continuations queued while uninitialized.
/// Both live under one lock so a registration cannot slip between the
/// Ready transition and the queue drain.
struct ReadyState {
    lifecycle: Lifecycle,
    pending: Vec<ReadyCallback>,
}

struct EngineState {
    render_context: RwLock<Option<Arc<Mutex<RenderContext>>>>,
    ready: Mutex<ReadyState>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            render_context: RwLock::new(None),
            ready: Mutex::new(ReadyState {
                lifecycle: Lifecycle::Uninitialized,
                pending: Vec::new(),
            }),
        }
    }
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```no_run
/// use vectorflow_engine::vectorflow::Engine;
///
/// Engine::initialize()?;
/// Engine::call_or_register_on_initialized(|| {
///     // runs once a render context exists
/// })?;
/// // ... Engine::create_render_context(context)? flushes the queue
/// Engine::shutdown();
/// # Ok::<(), vectorflow_engine::vectorflow::Error>(())
/// ```
pub struct Engine;

impl Engine {
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("vectorflow::Engine", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!("vectorflow::Engine", "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!("vectorflow::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    fn state() -> Result<&'static EngineState> {
        ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))
    }

    /// Initialize the engine (idempotent)
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Destroy the render context, drop queued continuations and return to
    /// `Lifecycle::Uninitialized`
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut ready) = state.ready.lock() {
                ready.lifecycle = Lifecycle::Uninitialized;
                ready.pending.clear();
            }
            if let Ok(mut context) = state.render_context.write() {
                *context = None;
            }
        }
    }

    /// Register the render context and transition to `Lifecycle::Ready`
    ///
    /// Every continuation queued while uninitialized runs once, in
    /// registration order, after the context is reachable through
    /// [`Engine::render_context`]. Continuations run without any engine lock
    /// held, so they may call back into the engine.
    ///
    /// # Errors
    ///
    /// - The engine is not initialized
    /// - A render context already exists
    pub fn create_render_context(context: RenderContext) -> Result<Arc<Mutex<RenderContext>>> {
        let state = Self::state()?;
        let shared = Arc::new(Mutex::new(context));

        {
            let mut lock = state.render_context.write()
                .map_err(|_| Self::log_and_return_error(
                    Error::BackendError("RenderContext lock poisoned".to_string())
                ))?;

            if lock.is_some() {
                return Err(Self::log_and_return_error(
                    Error::InitializationFailed("RenderContext already exists. Call Engine::destroy_render_context() first.".to_string())
                ));
            }
            *lock = Some(shared.clone());
        }

        let pending = {
            let mut ready = state.ready.lock()
                .map_err(|_| Self::log_and_return_error(
                    Error::BackendError("Lifecycle lock poisoned".to_string())
                ))?;
            ready.lifecycle = Lifecycle::Ready;
            std::mem::take(&mut ready.pending)
        };

        crate::engine_info!(
            "vectorflow::Engine",
            "RenderContext created, running {} pending continuation(s)",
            pending.len()
        );

        for callback in pending {
            callback();
        }

        Ok(shared)
    }

    /// Run `callback` now if the renderer is ready, otherwise queue it for
    /// the next Uninitialized -> Ready transition
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized.
    pub fn call_or_register_on_initialized<F>(callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let state = Self::state()?;

        let run_now = {
            let mut ready = state.ready.lock()
                .map_err(|_| Self::log_and_return_error(
                    Error::BackendError("Lifecycle lock poisoned".to_string())
                ))?;
            match ready.lifecycle {
                Lifecycle::Ready => Some(callback),
                Lifecycle::Uninitialized => {
                    ready.pending.push(Box::new(callback));
                    None
                }
            }
        };

        if let Some(callback) = run_now {
            callback();
        }
        Ok(())
    }

    /// Current lifecycle state (`Uninitialized` when the engine itself is not initialized)
    pub fn lifecycle() -> Lifecycle {
        ENGINE_STATE.get()
            .and_then(|state| state.ready.lock().ok().map(|ready| ready.lifecycle))
            .unwrap_or(Lifecycle::Uninitialized)
    }

    /// True once a render context has been created
    pub fn is_initialized() -> bool {
        Self::lifecycle() == Lifecycle::Ready
    }

    /// Number of continuations waiting for the renderer
    pub fn pending_callback_count() -> usize {
        ENGINE_STATE.get()
            .and_then(|state| state.ready.lock().ok().map(|ready| ready.pending.len()))
            .unwrap_or(0)
    }

    /// Get the live render context
    ///
    /// Callers lock the returned mutex for the duration of their GPU work,
    /// which keeps teardown from racing asynchronous asset loads.
    ///
    /// # Errors
    ///
    /// - The engine is not initialized
    /// - No render context exists
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vectorflow_engine::vectorflow::Engine;
    ///
    /// let context = Engine::render_context()?;
    /// let guard = context.lock().unwrap();
    /// let _features = guard.platform_features();
    /// # Ok::<(), vectorflow_engine::vectorflow::Error>(())
    /// ```
    pub fn render_context() -> Result<Arc<Mutex<RenderContext>>> {
        let state = Self::state()?;

        let lock = state.render_context.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("RenderContext lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("RenderContext not created. Call Engine::create_render_context() first.".to_string())
            ))
    }

    /// Destroy the render context and return to `Lifecycle::Uninitialized`
    ///
    /// Outstanding `Arc` handles stay valid until dropped. Continuations
    /// registered afterwards are queued for the next context.
    pub fn destroy_render_context() -> Result<()> {
        let state = Self::state()?;

        if let Ok(mut ready) = state.ready.lock() {
            ready.lifecycle = Lifecycle::Uninitialized;
        }

        let mut lock = state.render_context.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("RenderContext lock poisoned".to_string())
            ))?;
        *lock = None;

        crate::engine_info!("vectorflow::Engine", "RenderContext destroyed");

        Ok(())
    }

    /// Reset all singletons for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        Self::shutdown();
    }

    // ===== LOGGING API =====

    /// Replace the default logger with a custom implementation
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vectorflow_engine::vectorflow::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Log without file:line (used by `engine_info!`, `engine_warn!`, ...)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Log with file:line (used by `engine_error!`)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
