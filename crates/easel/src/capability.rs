//! The fixed set of host functions a guest may import.
//!
//! Every function lives in the `env` import module. Each one checks that the
//! guest finished instantiating, then works on the bridge state owned by the
//! store. Guest memory is only touched through a view fetched for the current
//! call.

use rand::Rng as _;
use wasmtime::{Caller, Extern, Linker};

use crate::{
    bridge::BridgeState,
    error::{Error, Result},
    host::Host,
    surface::{Color, Surface},
};

pub const IMPORT_MODULE: &str = "env";

pub const CAPABILITIES: &[&str] = &[
    "log",
    "set_stroke_color",
    "stroke",
    "begin_path",
    "move_to",
    "line_to",
    "clear",
    "surface_width",
    "surface_height",
    "sin",
    "cos",
    "fmod",
    "random",
];

#[must_use]
pub fn is_capability(module: &str, name: &str) -> bool {
    module == IMPORT_MODULE && CAPABILITIES.contains(&name)
}

/// Remainder of `num / div` carrying the sign of `num` (C `fmod`).
#[must_use]
pub fn fmod(num: f64, div: f64) -> f64 {
    num % div
}

/// Bytes `ptr..ptr + len` of guest memory, or a bounds error.
pub fn guest_span(memory: &[u8], ptr: u32, len: u32) -> Result<&[u8]> {
    let start = ptr as usize;
    start
        .checked_add(len as usize)
        .and_then(|end| memory.get(start..end))
        .ok_or(Error::MemoryBounds {
            ptr,
            len,
            size: memory.len(),
        })
}

type Ctx<'a, H> = Caller<'a, BridgeState<H>>;

fn ready<H: Host>(caller: &Ctx<'_, H>, name: &'static str) -> Result<()> {
    if caller.data().ready {
        Ok(())
    } else {
        Err(Error::NotReady(name))
    }
}

fn surface<'a, H: Host>(caller: &'a mut Ctx<'_, H>, name: &'static str) -> Result<&'a mut Surface> {
    ready(caller, name)?;
    Ok(&mut caller.data_mut().surface)
}

fn read_guest_str<H: Host>(caller: &mut Ctx<'_, H>, ptr: u32, len: u32) -> Result<String> {
    let Some(Extern::Memory(memory)) = caller.get_export("memory") else {
        return Err(Error::MissingExport("memory"));
    };
    let bytes = guest_span(memory.data(&*caller), ptr, len)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

pub(crate) fn add_to_linker<H: Host>(linker: &mut Linker<BridgeState<H>>) -> wasmtime::Result<()> {
    linker.func_wrap(
        IMPORT_MODULE,
        "log",
        |mut caller: Ctx<'_, H>, ptr: u32, len: u32| -> wasmtime::Result<()> {
            ready(&caller, "log")?;
            let message = read_guest_str(&mut caller, ptr, len)?;
            caller.data_mut().host.log(&message);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "set_stroke_color",
        |mut caller: Ctx<'_, H>, r: i32, g: i32, b: i32| -> wasmtime::Result<()> {
            surface(&mut caller, "set_stroke_color")?.set_stroke_color(Color::from_channels(r, g, b));
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "stroke",
        |mut caller: Ctx<'_, H>| -> wasmtime::Result<()> {
            surface(&mut caller, "stroke")?.stroke();
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "begin_path",
        |mut caller: Ctx<'_, H>| -> wasmtime::Result<()> {
            surface(&mut caller, "begin_path")?.begin_path();
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "move_to",
        |mut caller: Ctx<'_, H>, x: f64, y: f64| -> wasmtime::Result<()> {
            surface(&mut caller, "move_to")?.move_to(x, y);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "line_to",
        |mut caller: Ctx<'_, H>, x: f64, y: f64| -> wasmtime::Result<()> {
            surface(&mut caller, "line_to")?.line_to(x, y);
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "clear",
        |mut caller: Ctx<'_, H>| -> wasmtime::Result<()> {
            surface(&mut caller, "clear")?.clear();
            Ok(())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "surface_width",
        |caller: Ctx<'_, H>| -> wasmtime::Result<u32> {
            ready(&caller, "surface_width")?;
            Ok(caller.data().surface.width())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "surface_height",
        |caller: Ctx<'_, H>| -> wasmtime::Result<u32> {
            ready(&caller, "surface_height")?;
            Ok(caller.data().surface.height())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "sin",
        |caller: Ctx<'_, H>, x: f64| -> wasmtime::Result<f64> {
            ready(&caller, "sin")?;
            Ok(x.sin())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "cos",
        |caller: Ctx<'_, H>, x: f64| -> wasmtime::Result<f64> {
            ready(&caller, "cos")?;
            Ok(x.cos())
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "fmod",
        |caller: Ctx<'_, H>, num: f64, div: f64| -> wasmtime::Result<f64> {
            ready(&caller, "fmod")?;
            Ok(fmod(num, div))
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "random",
        |mut caller: Ctx<'_, H>| -> wasmtime::Result<f64> {
            ready(&caller, "random")?;
            Ok(caller.data_mut().rng.random::<f64>())
        },
    )?;

    Ok(())
}
