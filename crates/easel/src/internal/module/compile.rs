use std::path::Path;

use tracing::debug;
use wasmtime::{Engine, Module};

use crate::{
    error::{Error, Result},
    internal::module::cache::{cache_key, write_cache_file_atomic},
};

/// Compile `wasm_bytes` (binary or text format), going through the `.cwasm`
/// cache in `cache_dir` when one is configured.
pub async fn load_or_compile_module(
    engine: &Engine,
    wasm_bytes: Vec<u8>,
    cache_dir: Option<&Path>,
) -> Result<Module> {
    let Some(cache_dir) = cache_dir else {
        return compile_module(engine, wasm_bytes).await;
    };

    tokio::fs::create_dir_all(cache_dir).await?;
    let key = cache_key(engine, &wasm_bytes);
    let cache_path = cache_dir.join(format!("{key}.cwasm"));

    // SAFETY: cache files are only ever written by `precompile_module` below,
    // and the key includes the engine's compatibility hash; a stale or foreign
    // file fails to deserialize and is recompiled.
    if let Ok(module) = unsafe { Module::deserialize_file(engine, &cache_path) } {
        debug!(path = %cache_path.display(), "loaded precompiled guest module");
        return Ok(module);
    }

    let bytes = precompile(engine, wasm_bytes).await?;
    write_cache_file_atomic(&cache_path, &bytes).await?;
    debug!(path = %cache_path.display(), "stored precompiled guest module");

    // SAFETY: bytes were produced by this engine just above.
    unsafe { Module::deserialize(engine, &bytes) }.map_err(Error::Compile)
}

async fn compile_module(engine: &Engine, wasm_bytes: Vec<u8>) -> Result<Module> {
    let engine = engine.clone();
    tokio::task::spawn_blocking(move || Module::new(&engine, &wasm_bytes))
        .await
        .map_err(|e| Error::Compile(e.into()))?
        .map_err(Error::Compile)
}

async fn precompile(engine: &Engine, wasm_bytes: Vec<u8>) -> Result<Vec<u8>> {
    let engine = engine.clone();
    tokio::task::spawn_blocking(move || engine.precompile_module(&wasm_bytes))
        .await
        .map_err(|e| Error::Compile(e.into()))?
        .map_err(Error::Compile)
}
