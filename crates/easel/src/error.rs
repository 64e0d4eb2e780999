use crate::host::BoxError;
use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// The guest binary is not a valid module.
    #[error("failed to compile guest module: {0}")]
    Compile(#[source] anyhow::Error),

    /// The guest asks for an import outside the capability table.
    #[error("guest imports `{module}::{name}`, which is not a provided capability")]
    UnknownImport { module: String, name: String },

    /// Wasmtime refused to instantiate the guest (signature mismatch, start trap).
    #[error("failed to instantiate guest module: {0}")]
    Instantiate(#[source] anyhow::Error),

    #[error("guest module does not export `{0}`")]
    MissingExport(&'static str),

    #[error("guest export `{name}` has an unexpected signature: {source}")]
    ExportSignature {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A capability read a `(pointer, length)` span outside guest memory.
    #[error("guest memory access out of bounds: {ptr}+{len} exceeds {size} bytes")]
    MemoryBounds { ptr: u32, len: u32, size: usize },

    /// A capability was invoked while the guest was still being instantiated.
    #[error("capability `{0}` called before the guest was instantiated")]
    NotReady(&'static str),

    /// A guest entry point trapped or a capability it called failed.
    #[error("guest entry point `{entry}` failed: {source}")]
    Guest {
        entry: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// An earlier guest failure halted the bridge; it will not call into the
    /// guest again.
    #[error("bridge halted after guest entry point `{0}` failed")]
    Halted(&'static str),

    /// Embedder-supplied host or event source returned an error (type-erased).
    #[error("host error: {0}")]
    Host(#[source] BoxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The bridge error raised inside a capability call, if that is what made
    /// the guest fail.
    #[must_use]
    pub fn capability_cause(&self) -> Option<&Self> {
        match self {
            Self::Guest { source, .. } | Self::Instantiate(source) => source.downcast_ref::<Self>(),
            _ => None,
        }
    }
}
